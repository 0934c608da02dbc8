//! Workspace bootstrap: register every profile and map found under the roots

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tower_lsp::lsp_types::Url;

use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::state::{DocumentKind, DocumentRegistry};

const PROGRESS_TITLE: &str = "Loading Comlink documents";

/// What one bootstrap run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Profile and map files found by the walk.
    pub discovered: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// A bootstrap running in the background.
#[derive(Debug)]
#[must_use = "the handle reports the bootstrap outcome"]
pub struct BootstrapHandle {
    pub(crate) task: JoinHandle<Result<BootstrapReport>>,
}

impl BootstrapHandle {
    /// Wait for the bootstrap to finish.
    ///
    /// # Errors
    ///
    /// Whatever the bootstrap failed with, or `Task` if it panicked or was
    /// cancelled.
    pub async fn join(self) -> Result<BootstrapReport> {
        self.task.await?
    }
}

/// Walk `roots` and load every profile and map file into `registry`.
///
/// Files are read concurrently. A file that cannot be loaded is logged and
/// counted, it does not stop the run. Nothing is analyzed. `progress` sees
/// `begin` first and `end` last, whether the run succeeds or not.
///
/// # Errors
///
/// `Io` if a root cannot be walked.
#[tracing::instrument(skip_all, fields(roots = roots.len()))]
pub async fn load_workspace_documents(
    registry: &Arc<DocumentRegistry>,
    roots: &[PathBuf],
    progress: &dyn Progress,
) -> Result<BootstrapReport> {
    tracing::info!("workspace bootstrap started");
    progress.begin(PROGRESS_TITLE).await;

    let result = load(registry, roots, progress).await;
    let summary = match &result {
        Ok(report) => format!("{} of {} documents loaded", report.loaded, report.discovered),
        Err(error) => format!("bootstrap failed: {error}"),
    };
    progress.end(summary).await;
    result
}

async fn load(
    registry: &Arc<DocumentRegistry>,
    roots: &[PathBuf],
    progress: &dyn Progress,
) -> Result<BootstrapReport> {
    let mut uris = Vec::new();
    for root in roots {
        let entries = registry
            .storage()
            .walk(std::slice::from_ref(root))
            .await
            .map_err(|source| Error::Io {
                path: root.clone(),
                source,
            })?;
        for entry in entries {
            if !entry.is_file || DocumentKind::from_path(&entry.path).is_none() {
                continue;
            }
            match Url::from_file_path(&entry.path) {
                Ok(uri) => uris.push(uri),
                Err(()) => {
                    tracing::warn!(path = %entry.path.display(), "skipping path without a file uri");
                }
            }
        }
    }

    let mut report = BootstrapReport {
        discovered: uris.len(),
        ..BootstrapReport::default()
    };
    progress
        .report(format!("walked workspace, {} documents found", report.discovered), Some(0))
        .await;
    let mut loads = JoinSet::new();
    for uri in uris {
        let registry = Arc::clone(registry);
        loads.spawn(async move {
            let result = registry.load_document(&uri).await;
            (uri, result)
        });
    }

    while let Some(joined) = loads.join_next().await {
        match joined {
            Ok((_, Ok(_))) => report.loaded += 1,
            Ok((uri, Err(error))) => {
                tracing::warn!(%uri, %error, "failed to load document");
                report.failed += 1;
            }
            Err(error) => {
                tracing::warn!(%error, "document load task failed");
                report.failed += 1;
            }
        }
        let done = report.loaded + report.failed;
        progress
            .report(
                format!("{done}/{} documents", report.discovered),
                u32::try_from(done * 100 / report.discovered.max(1)).ok(),
            )
            .await;
    }

    tracing::info!(
        discovered = report.discovered,
        loaded = report.loaded,
        failed = report.failed,
        "workspace bootstrap finished"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use std::io;
    use std::path::Path;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::progress::Silent;
    use crate::storage::{MemoryStorage, Storage, WalkEntry};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct Recorded {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Progress for Recorded {
        async fn begin(&self, title: &str) {
            self.events.lock().push(format!("begin {title}"));
        }

        async fn report(&self, message: String, percentage: Option<u32>) {
            self.events.lock().push(format!("report {message} {percentage:?}"));
        }

        async fn end(&self, message: String) {
            self.events.lock().push(format!("end {message}"));
        }
    }

    #[derive(Debug)]
    struct Unwalkable;

    #[async_trait]
    impl Storage for Unwalkable {
        async fn read_file(&self, path: &Path) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }

        async fn walk(&self, _roots: &[PathBuf]) -> io::Result<Vec<WalkEntry>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[tokio::test]
    async fn test_bootstrap_registers_profiles_and_maps_only() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.insert("/ws/weather.supr", "name = \"weather\"\nversion = \"1.0.0\"\n");
        storage.insert("/ws/maps/weather.suma", "profile = \"weather@1.0\"\nprovider = \"p\"\n");
        storage.insert("/ws/README.md", "# readme");
        storage.insert("/elsewhere/other.supr", "name = \"other\"\nversion = \"1.0.0\"\n");
        let registry = Arc::new(DocumentRegistry::new(Arc::new(storage)));

        let report =
            load_workspace_documents(&registry, &[PathBuf::from("/ws")], &Silent).await?;

        assert_eq!(
            report,
            BootstrapReport {
                discovered: 2,
                loaded: 2,
                failed: 0
            }
        );
        let mut names: Vec<_> = registry
            .all()
            .iter()
            .map(|d| d.file_name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["weather.suma", "weather.supr"]);
        assert!(registry.all().iter().all(|d| d.stats().parses == 0));
        Ok(())
    }

    #[tokio::test]
    async fn test_bootstrap_keeps_open_documents() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.insert("/ws/weather.supr", "name = \"weather\"\nversion = \"1.0.0\"\n");
        let registry = Arc::new(DocumentRegistry::new(Arc::new(storage)));
        let uri = Url::from_file_path("/ws/weather.supr").map_err(|()| {
            Error::InvariantViolation("absolute path has a file uri".to_string())
        })?;
        registry.create(uri.clone(), DocumentKind::Profile, 7, "unsaved");

        load_workspace_documents(&registry, &[PathBuf::from("/ws")], &Silent).await?;

        let document = registry.get(&uri).map(|d| (d.version(), d.text()));
        assert_eq!(document, Some((7, Arc::from("unsaved"))));
        Ok(())
    }

    #[tokio::test]
    async fn test_bootstrap_progress_begins_and_ends() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.insert("/ws/weather.supr", "name = \"weather\"\nversion = \"1.0.0\"\n");
        storage.insert("/ws/weather.suma", "profile = \"weather@1.0\"\nprovider = \"p\"\n");
        let registry = Arc::new(DocumentRegistry::new(Arc::new(storage)));
        let progress = Recorded::default();

        load_workspace_documents(&registry, &[PathBuf::from("/ws")], &progress).await?;

        let events = progress.events.into_inner();
        assert_eq!(
            events,
            vec![
                "begin Loading Comlink documents".to_string(),
                "report walked workspace, 2 documents found Some(0)".to_string(),
                "report 1/2 documents Some(50)".to_string(),
                "report 2/2 documents Some(100)".to_string(),
                "end 2 of 2 documents loaded".to_string(),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_bootstrap_progress_ends_when_walk_fails() {
        let registry = Arc::new(DocumentRegistry::new(Arc::new(Unwalkable)));
        let progress = Recorded::default();

        let result = load_workspace_documents(&registry, &[PathBuf::from("/ws")], &progress).await;

        assert!(matches!(result, Err(Error::Io { .. })));
        let events = progress.events.into_inner();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], "begin Loading Comlink documents");
        assert!(events[1].starts_with("end bootstrap failed: failed to read /ws"));
    }
}
