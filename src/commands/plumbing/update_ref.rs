use crate::areas::repository::Repository;

impl Repository {
    pub async fn update_ref(&mut self, ref_name: &str, new_value: &str) -> anyhow::Result<()> {
        let oid = self.resolve_revision(new_value).await?;

        self.database().update_ref(ref_name, &oid).await?;

        Ok(())
    }
}
