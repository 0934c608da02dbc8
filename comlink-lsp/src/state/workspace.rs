//! Workspace-level operations used by the protocol endpoint

use std::path::PathBuf;
use std::sync::Arc;

use tower_lsp::lsp_types::{Diagnostic, SymbolInformation, TextDocumentContentChangeEvent, Url};

use crate::capabilities::workspace_symbols::{flatten_symbols, matches_query};
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::state::bootstrap::{BootstrapHandle, load_workspace_documents};
use crate::state::{Document, DocumentKind, DocumentRegistry, Outline};
use crate::storage::Storage;

/// Entry point for editor events and queries.
///
/// Queries that scan the whole registry wait for any running bootstrap to
/// finish first; single-document operations never wait.
#[derive(Debug, Clone)]
pub struct Workspace {
    registry: Arc<DocumentRegistry>,
}

impl Workspace {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            registry: Arc::new(DocumentRegistry::new(storage)),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }

    /// Register a document opened in the editor. The language id decides
    /// the kind, falling back to the file extension.
    ///
    /// # Errors
    ///
    /// `UnrecognizedKind` if neither names a profile or map.
    pub fn open_document(
        &self,
        uri: Url,
        language_id: &str,
        version: i32,
        text: &str,
    ) -> Result<Arc<Document>> {
        let kind = DocumentKind::from_language_id(language_id)
            .or_else(|| DocumentKind::from_uri(&uri))
            .ok_or_else(|| Error::UnrecognizedKind(uri.clone()))?;
        Ok(self.registry.create(uri, kind, version, text))
    }

    /// # Errors
    ///
    /// `NotFound` or `VersionOutOfOrder`, see [`DocumentRegistry::update`].
    pub fn change_document(
        &self,
        uri: &Url,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<Arc<Document>> {
        self.registry.update(uri, changes, version)
    }

    /// # Errors
    ///
    /// `NotFound` if `uri` is not registered.
    pub fn close_document(&self, uri: &Url) -> Result<()> {
        self.registry.remove(uri).map(drop)
    }

    /// Diagnostics of `uri`, loading it from storage if it is not registered.
    ///
    /// # Errors
    ///
    /// Load failures, see [`DocumentRegistry::load_document`], and
    /// `InvariantViolation`.
    pub async fn diagnostics(&self, uri: &Url) -> Result<Arc<[Diagnostic]>> {
        self.registry.barrier().wait().await;
        let document = self.registry.load_document(uri).await?;
        document.diagnostics(&self.registry)
    }

    /// Outline of `uri`, loading it from storage if it is not registered.
    ///
    /// # Errors
    ///
    /// Load failures, or `Syntax` if the document does not parse.
    pub async fn document_symbols(&self, uri: &Url) -> Result<Outline> {
        let document = self.registry.load_document(uri).await?;
        document.symbols()
    }

    /// Flattened outlines of every registered document whose name contains
    /// `query`, ignoring case. Documents that do not parse are skipped.
    ///
    /// Yields to the runtime between documents, so dropping the returned
    /// future stops the scan at a document boundary.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` only.
    pub async fn workspace_symbols(&self, query: &str) -> Result<Vec<SymbolInformation>> {
        self.registry.barrier().wait().await;

        let mut found = Vec::new();
        for document in self.registry.all() {
            tokio::task::yield_now().await;
            let outline = match document.symbols() {
                Ok(outline) => outline,
                Err(Error::Syntax(_)) => continue,
                Err(error) => return Err(error),
            };
            found.extend(
                flatten_symbols(document.uri(), &outline)
                    .into_iter()
                    .filter(|symbol| matches_query(symbol, query)),
            );
        }
        Ok(found)
    }

    /// Maps whose diagnostics depend on the profile at `uri`. Empty for maps
    /// and for profiles that do not parse.
    ///
    /// # Errors
    ///
    /// `NotFound` if `uri` is not registered, `InvariantViolation`.
    pub async fn dependents(&self, uri: &Url) -> Result<Vec<Arc<Document>>> {
        self.registry.barrier().wait().await;

        let document = self
            .registry
            .get(uri)
            .ok_or_else(|| Error::NotFound(uri.clone()))?;
        if document.kind() == DocumentKind::Map {
            return Ok(Vec::new());
        }
        match document.namespace() {
            Ok(namespace) => self.registry.maps_targeting(&namespace),
            Err(Error::Syntax(_)) => Ok(Vec::new()),
            Err(error) => Err(error),
        }
    }

    /// Start a bootstrap of `roots` in the background. Whole-workspace
    /// queries issued from now on wait for it.
    pub fn spawn_bootstrap(
        &self,
        roots: Vec<PathBuf>,
        progress: Arc<dyn Progress>,
    ) -> BootstrapHandle {
        let guard = self.registry.barrier().enter();
        let registry = Arc::clone(&self.registry);
        let task = tokio::spawn(async move {
            let _guard = guard;
            load_workspace_documents(&registry, &roots, progress.as_ref()).await
        });
        BootstrapHandle { task }
    }
}
