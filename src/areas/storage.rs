//! Path-addressed byte storage
//!
//! Every path handed to a [`Storage`] is relative to the git directory
//! (`objects/ab/cdef...`, `refs/heads/main`, `packed-refs`). Absence is not an
//! error: reads and listings return `Ok(None)` so callers can fall back to the
//! next source.

use crate::errors::{OdbError, OdbResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::instrument;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Whole file contents
    async fn read_file(&self, path: &Path) -> OdbResult<Option<Bytes>>;

    /// Bytes in `start..end`, or `start..` when `end` is omitted
    ///
    /// A range reaching past the end of the file is cut short at the end.
    async fn read_range(&self, path: &Path, start: u64, end: Option<u64>)
    -> OdbResult<Option<Bytes>>;

    /// Replace the file at `path` atomically, creating parent directories
    ///
    /// A concurrent reader sees either the previous complete file or the new
    /// complete file.
    async fn write_file(&self, path: &Path, data: Bytes) -> OdbResult<()>;

    /// Names of the direct children of a directory
    async fn list_directory(&self, path: &Path) -> OdbResult<Option<Vec<String>>>;
}

/// Storage rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    fsync: bool,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>, fsync: bool) -> Self {
        FsStorage {
            root: root.into(),
            fsync,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Read errors meaning "there is nothing at this path"
fn is_absent(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::IsADirectory
    )
}

#[async_trait]
impl Storage for FsStorage {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn read_file(&self, path: &Path) -> OdbResult<Option<Bytes>> {
        let full_path = self.root.join(path);

        match fs::read(&full_path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(error) if is_absent(&error) => Ok(None),
            Err(error) => Err(OdbError::storage(full_path, error)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn read_range(
        &self,
        path: &Path,
        start: u64,
        end: Option<u64>,
    ) -> OdbResult<Option<Bytes>> {
        let full_path = self.root.join(path);
        let storage_error = |error| OdbError::storage(&full_path, error);

        let mut file = match fs::File::open(&full_path).await {
            Ok(file) => file,
            Err(error) if is_absent(&error) => return Ok(None),
            Err(error) => return Err(storage_error(error)),
        };

        let file_len = file.metadata().await.map_err(storage_error)?.len();
        let end = end.map_or(file_len, |end| end.min(file_len));
        if start >= end {
            return Ok(Some(Bytes::new()));
        }

        let len = usize::try_from(end - start).map_err(|_| {
            storage_error(std::io::Error::other(format!(
                "range {start}..{end} exceeds platform address space"
            )))
        })?;

        file.seek(std::io::SeekFrom::Start(start))
            .await
            .map_err(storage_error)?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer).await.map_err(storage_error)?;

        Ok(Some(Bytes::from(buffer)))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn write_file(&self, path: &Path, data: Bytes) -> OdbResult<()> {
        let full_path = self.root.join(path);
        let parent = full_path
            .parent()
            .ok_or_else(|| {
                OdbError::storage(
                    &full_path,
                    std::io::Error::new(ErrorKind::InvalidInput, "path has no parent directory"),
                )
            })?
            .to_path_buf();

        fs::create_dir_all(&parent)
            .await
            .map_err(|error| OdbError::storage(&parent, error))?;

        // unique name per writer so concurrent saves of one object never share a temp file
        let temp_path = parent.join(format!("tmp-obj-{}", fake::rand::random::<u32>()));
        let write_temp = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            if self.fsync {
                file.sync_all().await?;
            }
            fs::rename(&temp_path, &full_path).await
        };

        if let Err(error) = write_temp.await {
            // best effort; the temp file may not even exist
            let _ = fs::remove_file(&temp_path).await;
            return Err(OdbError::storage(full_path, error));
        }

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list_directory(&self, path: &Path) -> OdbResult<Option<Vec<String>>> {
        let full_path = self.root.join(path);
        let storage_error = |error| OdbError::storage(&full_path, error);

        let mut entries = match fs::read_dir(&full_path).await {
            Ok(entries) => entries,
            Err(error) if is_absent(&error) => return Ok(None),
            Err(error) => return Err(storage_error(error)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(storage_error)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        Ok(Some(names))
    }
}

/// Storage kept entirely in memory
///
/// Directories exist implicitly as the parents of stored files.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<BTreeMap<PathBuf, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a stored file, returning whether it existed
    pub fn remove(&self, path: &Path) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read_file(&self, path: &Path) -> OdbResult<Option<Bytes>> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        Ok(files.get(path).cloned())
    }

    async fn read_range(
        &self,
        path: &Path,
        start: u64,
        end: Option<u64>,
    ) -> OdbResult<Option<Bytes>> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);

        Ok(files.get(path).map(|data| {
            let len = data.len() as u64;
            let end = end.map_or(len, |end| end.min(len));
            let start = start.min(end);
            data.slice(start as usize..end as usize)
        }))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> OdbResult<()> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> OdbResult<Option<Vec<String>>> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);

        let names = files
            .keys()
            .filter_map(|file| file.strip_prefix(path).ok())
            .filter_map(|relative| relative.components().next())
            .map(|child| child.as_os_str().to_string_lossy().into_owned())
            .collect::<BTreeSet<_>>();

        if names.is_empty() {
            return Ok(None);
        }
        Ok(Some(names.into_iter().collect()))
    }
}
