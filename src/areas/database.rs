//! Object database
//!
//! The single entry point for reading and writing objects and refs. Loads try
//! the loose store first and fall back to packs; saves always write loose
//! objects. Every object handed out has had its SHA-1 checked against the id
//! it was requested by.

use crate::areas::loose::LooseObjects;
use crate::areas::pack_cache::PackIndexCache;
use crate::areas::packs::Packs;
use crate::areas::refs::Refs;
use crate::areas::storage::{FsStorage, Storage};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable, deframe};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::config::StoreConfig;
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

pub struct Database {
    loose: LooseObjects,
    packs: Packs,
    refs: Refs,
    pack_cache: Arc<PackIndexCache>,
}

impl Database {
    /// Build a database over any storage, sharing `pack_cache` with whoever
    /// else holds it
    pub fn new(
        storage: Arc<dyn Storage>,
        pack_cache: Arc<PackIndexCache>,
        config: &StoreConfig,
    ) -> Self {
        Database {
            loose: LooseObjects::new(storage.clone(), config.compression_level()),
            packs: Packs::new(storage.clone(), pack_cache.clone()),
            refs: Refs::new(storage),
            pack_cache,
        }
    }

    /// Database over the git directory named by `config`, on the local filesystem
    pub fn open(config: &StoreConfig) -> Self {
        let storage = FsStorage::new(config.git_dir(), config.fsync());
        Self::new(Arc::new(storage), Arc::new(PackIndexCache::new()), config)
    }

    /// Framed bytes of `oid`, checked against their hash
    pub async fn load_raw(&self, oid: &ObjectId) -> OdbResult<Bytes> {
        let raw = match self.loose.load(oid).await? {
            Some(raw) => raw,
            None => {
                debug!(%oid, "no loose object, trying packs");
                self.packs
                    .load(oid, &self.loose)
                    .await?
                    .ok_or(OdbError::ObjectNotFound(*oid))?
            }
        };

        let actual = ObjectId::hash(&raw);
        if actual != *oid {
            return Err(OdbError::HashMismatch {
                expected: *oid,
                actual,
            });
        }

        Ok(raw)
    }

    /// Store framed bytes under `oid` as a loose object
    ///
    /// The bytes must be a well-formed framed object hashing to `oid`.
    pub async fn save_raw(&self, oid: &ObjectId, framed: &Bytes) -> OdbResult<()> {
        deframe(framed)?;

        let actual = ObjectId::hash(framed);
        if actual != *oid {
            return Err(OdbError::HashMismatch {
                expected: *oid,
                actual,
            });
        }

        self.loose.save(oid, framed).await
    }

    /// Type and body of `oid`, checking the type against `expected` when given
    async fn load_body(
        &self,
        oid: &ObjectId,
        expected: Option<ObjectType>,
    ) -> OdbResult<(ObjectType, Bytes)> {
        let raw = self.load_raw(oid).await?;
        let (object_type, body) = deframe(&raw)?;

        match expected {
            Some(expected) if expected != object_type => Err(OdbError::TypeMismatch {
                oid: *oid,
                expected,
                actual: object_type,
            }),
            _ => Ok((object_type, body)),
        }
    }

    /// Decode `oid`, which must be of type `object_type`
    pub async fn load_as(&self, object_type: ObjectType, oid: &ObjectId) -> OdbResult<ObjectBox> {
        let (object_type, body) = self.load_body(oid, Some(object_type)).await?;
        ObjectBox::decode(object_type, &body)
    }

    /// Decode `oid` whatever its type
    pub async fn load_object(&self, oid: &ObjectId) -> OdbResult<ObjectBox> {
        let (object_type, body) = self.load_body(oid, None).await?;
        ObjectBox::decode(object_type, &body)
    }

    async fn load_typed<T: Unpackable>(
        &self,
        object_type: ObjectType,
        oid: &ObjectId,
    ) -> OdbResult<T> {
        let (_, body) = self.load_body(oid, Some(object_type)).await?;
        T::deserialize(Cursor::new(body.as_ref()))
    }

    pub async fn load_blob(&self, oid: &ObjectId) -> OdbResult<Blob> {
        self.load_typed(ObjectType::Blob, oid).await
    }

    pub async fn load_tree(&self, oid: &ObjectId) -> OdbResult<Tree> {
        self.load_typed(ObjectType::Tree, oid).await
    }

    pub async fn load_commit(&self, oid: &ObjectId) -> OdbResult<Commit> {
        self.load_typed(ObjectType::Commit, oid).await
    }

    pub async fn load_tag(&self, oid: &ObjectId) -> OdbResult<Tag> {
        self.load_typed(ObjectType::Tag, oid).await
    }

    /// Type and body length of `oid` without decoding the body
    pub async fn read_header(&self, oid: &ObjectId) -> OdbResult<(ObjectType, usize)> {
        let (object_type, body) = self.load_body(oid, None).await?;
        Ok((object_type, body.len()))
    }

    /// Whether `oid` can be loaded; only an exhausted search counts as absent
    pub async fn contains(&self, oid: &ObjectId) -> OdbResult<bool> {
        match self.load_raw(oid).await {
            Ok(_) => Ok(true),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Encode, frame and store `object`, returning its id
    pub async fn save_as(&self, object: &impl Object) -> OdbResult<ObjectId> {
        let framed = object.framed()?;
        let oid = ObjectId::hash(&framed);

        self.loose.save(&oid, &framed).await?;
        debug!(%oid, object_type = %object.object_type(), "saved object");

        Ok(oid)
    }

    pub async fn read_ref(&self, name: &str) -> OdbResult<Option<ObjectId>> {
        self.refs.read_ref(name).await
    }

    pub async fn update_ref(&self, name: &str, oid: &ObjectId) -> OdbResult<()> {
        self.refs.update_ref(name, oid).await
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn packs(&self) -> &Packs {
        &self.packs
    }

    pub fn pack_cache(&self) -> &Arc<PackIndexCache> {
        &self.pack_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::storage::MemoryStorage;
    use crate::artifacts::objects::object::frame;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn storage() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::new())
    }

    fn database(storage: Arc<MemoryStorage>) -> Database {
        Database::new(
            storage,
            Arc::new(PackIndexCache::new()),
            &StoreConfig::default(),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn blob_round_trips(storage: Arc<MemoryStorage>) {
        let database = database(storage);
        let blob = Blob::new(Bytes::from_static(b"hello\n"));

        let oid = database.save_as(&blob).await.unwrap();

        assert_eq!(oid.to_string(), "ce013625030ba8dba906f756967f9e9ca394464a");
        assert_eq!(database.load_blob(&oid).await.unwrap(), blob);
        assert_eq!(
            database.load_as(ObjectType::Blob, &oid).await.unwrap(),
            ObjectBox::Blob(Box::new(blob))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_type_is_a_type_mismatch(storage: Arc<MemoryStorage>) {
        let database = database(storage);
        let oid = database
            .save_as(&Blob::new(Bytes::from_static(b"x")))
            .await
            .unwrap();

        assert!(matches!(
            database.load_as(ObjectType::Tree, &oid).await,
            Err(OdbError::TypeMismatch {
                expected: ObjectType::Tree,
                actual: ObjectType::Blob,
                ..
            })
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn save_raw_refuses_mislabelled_bytes(storage: Arc<MemoryStorage>) {
        let database = database(storage);
        let framed = frame(ObjectType::Blob, b"content");
        let wrong = ObjectId::hash(b"something else");

        assert!(matches!(
            database.save_raw(&wrong, &framed).await,
            Err(OdbError::HashMismatch { .. })
        ));
        assert!(matches!(
            database
                .save_raw(&ObjectId::hash(b"blob 3\0ab"), &Bytes::from_static(b"blob 3\0ab"))
                .await,
            Err(OdbError::Format(_))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_object_is_not_found(storage: Arc<MemoryStorage>) {
        let database = database(storage);
        let oid = ObjectId::hash(b"absent");

        let error = database.load_raw(&oid).await.unwrap_err();

        assert!(error.is_not_found());
        assert!(!database.contains(&oid).await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn header_reports_type_and_size(storage: Arc<MemoryStorage>) {
        let database = database(storage);
        let oid = database
            .save_as(&Blob::new(Bytes::from_static(b"twelve bytes")))
            .await
            .unwrap();

        assert_eq!(
            database.read_header(&oid).await.unwrap(),
            (ObjectType::Blob, 12)
        );
    }
}
