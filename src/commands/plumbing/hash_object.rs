use crate::areas::repository::Repository;
use crate::artifacts::objects::object::{ObjectBox, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;

impl Repository {
    pub async fn hash_object(
        &mut self,
        object_path: &str,
        object_type: ObjectType,
        write: bool,
    ) -> anyhow::Result<()> {
        let content = tokio::fs::read(object_path)
            .await
            .with_context(|| format!("could not open '{object_path}' for reading"))?;

        // only well-formed objects may enter the database
        ObjectBox::decode(object_type, &content)
            .with_context(|| format!("{object_path} is not a valid '{object_type}' object"))?;

        let framed = frame(object_type, &content);
        let object_id = ObjectId::hash(&framed);

        if write {
            self.database().save_raw(&object_id, &framed).await?;
        }

        writeln!(self.writer(), "{object_id}")?;

        Ok(())
    }
}
