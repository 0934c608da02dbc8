//! Durable storage the registry loads unopened documents from.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use walkdir::WalkDir;

/// One entry produced by [`Storage::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_file: bool,
}

#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// # Errors
    ///
    /// Any failure to read `path` as UTF-8 text.
    async fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Every entry below `roots`, recursively, in no particular order.
    ///
    /// # Errors
    ///
    /// Only if the walk cannot run at all; unreadable entries are skipped.
    async fn walk(&self, roots: &[PathBuf]) -> io::Result<Vec<WalkEntry>>;
}

/// The local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskStorage;

#[async_trait]
impl Storage for DiskStorage {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn walk(&self, roots: &[PathBuf]) -> io::Result<Vec<WalkEntry>> {
        let roots = roots.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            for root in &roots {
                for entry in WalkDir::new(root) {
                    match entry {
                        Ok(entry) => entries.push(WalkEntry {
                            is_file: entry.file_type().is_file(),
                            path: entry.into_path(),
                        }),
                        Err(error) => {
                            tracing::warn!(root = %root.display(), %error, "skipping unreadable entry");
                        }
                    }
                }
            }
            entries
        })
        .await
        .map_err(io::Error::other)
    }
}

/// In-memory files, keyed by path. Directories are implied by file paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: DashMap<PathBuf, String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .map(|text| text.value().clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    async fn walk(&self, roots: &[PathBuf]) -> io::Result<Vec<WalkEntry>> {
        Ok(self
            .files
            .iter()
            .filter(|file| roots.iter().any(|root| file.key().starts_with(root)))
            .map(|file| WalkEntry {
                path: file.key().clone(),
                is_file: true,
            })
            .collect())
    }
}
