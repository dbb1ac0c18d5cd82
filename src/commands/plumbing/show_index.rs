use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;

impl Repository {
    /// Print `<offset> <oid> (<crc32>)` for every object of one pack, or of all packs
    pub async fn show_index(&mut self, pack: Option<&str>) -> anyhow::Result<()> {
        let packs = match pack {
            Some(pack) => {
                let pack = pack.trim_start_matches("pack-").trim_end_matches(".idx");
                ObjectId::try_parse(pack)
                    .with_context(|| format!("'{pack}' is not a pack hash"))?;
                vec![pack.to_string()]
            }
            None => self.database().packs().pack_names().await?,
        };

        let mut lines = Vec::new();
        for pack in packs {
            let index = self.database().packs().index(&pack).await?;
            lines.extend(
                index
                    .entries()
                    .map(|(oid, offset, crc32)| format!("{offset} {oid} ({crc32:08x})")),
            );
        }

        let mut writer = self.writer();
        for line in lines {
            writeln!(writer, "{line}")?;
        }

        Ok(())
    }
}
