use crate::areas::repository::Repository;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::revision::{Revision, ref_candidates};
use crate::errors::OdbError;
use anyhow::Context;

impl Repository {
    pub async fn rev_parse(&mut self, revision: &str) -> anyhow::Result<()> {
        let oid = self.resolve_revision(revision).await?;

        writeln!(self.writer(), "{oid}")?;

        Ok(())
    }

    /// Object id a revision expression names
    pub async fn resolve_revision(&self, revision: &str) -> anyhow::Result<ObjectId> {
        let revision = Revision::try_parse(revision)?;

        self.resolve(&revision).await
    }

    async fn resolve(&self, revision: &Revision) -> anyhow::Result<ObjectId> {
        match revision {
            Revision::Name(name) => self.resolve_name(name).await,
            Revision::Parent(base) => {
                let oid = Box::pin(self.resolve(base)).await?;
                self.first_parent(&oid).await
            }
            Revision::Ancestor(base, generations) => {
                let mut oid = Box::pin(self.resolve(base)).await?;
                for _ in 0..*generations {
                    oid = self.first_parent(&oid).await?;
                }

                Ok(oid)
            }
        }
    }

    async fn resolve_name(&self, name: &str) -> anyhow::Result<ObjectId> {
        for candidate in ref_candidates(name) {
            match self.database().read_ref(&candidate).await {
                Ok(Some(oid)) => return Ok(oid),
                Ok(None) | Err(OdbError::InvalidRefName(_)) => continue,
                Err(error) => return Err(error.into()),
            }
        }

        if name.len() == OBJECT_ID_LENGTH && name.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(ObjectId::try_parse(name)?);
        }

        anyhow::bail!("ambiguous argument '{name}': unknown revision or path not in the working tree")
    }

    async fn first_parent(&self, oid: &ObjectId) -> anyhow::Result<ObjectId> {
        let commit = self
            .database()
            .load_commit(oid)
            .await
            .with_context(|| format!("object {} is not a readable commit", oid.to_short_oid()))?;

        commit
            .parent()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("commit {} has no parent", oid.to_short_oid()))
    }
}
