use crate::areas::loose::OBJECTS_DIR;
use crate::areas::packs::Packs;
use crate::areas::repository::Repository;
use crate::artifacts::refs::{HEAD_REF_NAME, REFS_DIR};
use anyhow::Context;
use tokio::fs;

const DEFAULT_BRANCH: &str = "master";

impl Repository {
    pub async fn init(&mut self) -> anyhow::Result<()> {
        let git_dir = self.git_dir().to_path_buf();

        fs::create_dir_all(git_dir.join(OBJECTS_DIR))
            .await
            .context("Failed to create .git/objects directory")?;

        fs::create_dir_all(git_dir.join(Packs::pack_dir()))
            .await
            .context("Failed to create .git/objects/pack directory")?;

        for refs_dir in ["heads", "tags"] {
            fs::create_dir_all(git_dir.join(REFS_DIR).join(refs_dir))
                .await
                .with_context(|| format!("Failed to create .git/refs/{refs_dir} directory"))?;
        }

        // re-running init must not move HEAD off the current branch
        if !fs::try_exists(git_dir.join(HEAD_REF_NAME)).await? {
            self.database()
                .refs()
                .set_symbolic_ref(HEAD_REF_NAME, &format!("refs/heads/{DEFAULT_BRANCH}"))
                .await
                .context("Failed to create initial HEAD reference")?;
        }

        let git_dir = git_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", git_dir.display()))?;

        writeln!(
            self.writer(),
            "Initialized empty Git repository in {}/",
            git_dir.display()
        )?;

        Ok(())
    }
}
