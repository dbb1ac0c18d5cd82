//! Object store configuration
//!
//! | setting             | source                          | default |
//! |---------------------|---------------------------------|---------|
//! | `git_dir`           | `--git-dir` / `GIT_DIR`         | `.git`  |
//! | `compression_level` | `BIT_COMPRESSION_LEVEL` (0-9)   | 6       |
//! | `fsync`             | `BIT_FSYNC` (`1`/`true`)        | off     |

use anyhow::Context;
use std::path::{Path, PathBuf};

pub const DEFAULT_GIT_DIR: &str = ".git";
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

const COMPRESSION_LEVEL_ENV: &str = "BIT_COMPRESSION_LEVEL";
const FSYNC_ENV: &str = "BIT_FSYNC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    git_dir: PathBuf,
    compression_level: u32,
    fsync: bool,
}

impl StoreConfig {
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            git_dir: git_dir.into(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            fsync: false,
        }
    }

    /// Defaults for `git_dir`, overridden by `BIT_COMPRESSION_LEVEL` and `BIT_FSYNC`
    pub fn load_from_env(git_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let mut config = Self::new(git_dir);

        if let Ok(level) = std::env::var(COMPRESSION_LEVEL_ENV) {
            let level = level
                .trim()
                .parse::<u32>()
                .with_context(|| format!("{COMPRESSION_LEVEL_ENV} is not a number: {level}"))?;
            config = config.with_compression_level(level)?;
        }

        if let Ok(fsync) = std::env::var(FSYNC_ENV) {
            config.fsync = matches!(fsync.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    pub fn with_compression_level(mut self, level: u32) -> anyhow::Result<Self> {
        if level > 9 {
            anyhow::bail!("compression level must be between 0 and 9, got {level}");
        }
        self.compression_level = level;
        Ok(self)
    }

    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    pub fn fsync(&self) -> bool {
        self.fsync
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_DIR)
    }
}
