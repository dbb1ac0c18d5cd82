use crate::areas::repository::Repository;
use crate::artifacts::objects::object::{Object, ObjectBox, Packable};

/// What `cat-file` reports about an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatFileMode {
    /// Pretty-print the content
    Pretty,
    /// Print the type
    Type,
    /// Print the body size in bytes
    Size,
    /// Print nothing, only report whether the object exists
    Exists,
}

impl Repository {
    /// Returns `false` only when an existence check finds nothing
    pub async fn cat_file(&mut self, revision: &str, mode: CatFileMode) -> anyhow::Result<bool> {
        let oid = match (self.resolve_revision(revision).await, mode) {
            (Ok(oid), _) => oid,
            (Err(_), CatFileMode::Exists) => return Ok(false),
            (Err(error), _) => return Err(error),
        };

        match mode {
            CatFileMode::Exists => return Ok(self.database().contains(&oid).await?),
            CatFileMode::Type => {
                let (object_type, _) = self.database().read_header(&oid).await?;
                writeln!(self.writer(), "{object_type}")?;
            }
            CatFileMode::Size => {
                let (_, size) = self.database().read_header(&oid).await?;
                writeln!(self.writer(), "{size}")?;
            }
            CatFileMode::Pretty => match self.database().load_object(&oid).await? {
                // blobs go out byte for byte, they need not be text
                ObjectBox::Blob(blob) => self.writer().write_all(blob.content())?,
                ObjectBox::Tree(tree) => write!(self.writer(), "{}", tree.display())?,
                // commit and tag bodies may be in a legacy charset
                object => self.writer().write_all(&object.serialize()?)?,
            },
        }

        Ok(true)
    }
}
