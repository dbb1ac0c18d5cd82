use crate::areas::repository::Repository;

impl Repository {
    /// List every ref under `refs/`, optionally with HEAD in front
    pub async fn show_ref(&mut self, head: bool) -> anyhow::Result<()> {
        let mut lines = Vec::new();

        if head && let Some(oid) = self.database().read_ref("HEAD").await? {
            lines.push(format!("{oid} HEAD"));
        }

        for (name, oid) in self.database().refs().list_refs().await? {
            lines.push(format!("{oid} {name}"));
        }

        if lines.is_empty() {
            anyhow::bail!("no refs found");
        }

        let mut writer = self.writer();
        for line in lines {
            writeln!(writer, "{line}")?;
        }

        Ok(())
    }
}
