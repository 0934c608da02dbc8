//! Registry of every known document, keyed by uri

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use crate::error::{Error, Result};
use crate::state::{BootstrapBarrier, Document, DocumentKind};
use crate::storage::Storage;

/// Documents opened in the editor or loaded from storage.
///
/// Maps refer to profiles by namespace only; every lookup rescans the
/// registered documents.
#[derive(Debug)]
pub struct DocumentRegistry {
    documents: DashMap<Url, Arc<Document>>,
    storage: Arc<dyn Storage>,
    barrier: BootstrapBarrier,
}

impl DocumentRegistry {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            documents: DashMap::new(),
            storage,
            barrier: BootstrapBarrier::new(),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    #[must_use]
    pub fn barrier(&self) -> &BootstrapBarrier {
        &self.barrier
    }

    /// Register a document, replacing whatever was registered at `uri`.
    /// Nothing is analyzed yet.
    pub fn create(&self, uri: Url, kind: DocumentKind, version: i32, text: &str) -> Arc<Document> {
        let document = Arc::new(Document::new(uri.clone(), kind, version, text));
        let previous = self.documents.insert(uri, Arc::clone(&document));
        tracing::debug!(uri = %document.uri(), ?kind, version, "document registered");

        if let Some(previous) = previous {
            self.forget_profile(&previous);
        }
        if kind == DocumentKind::Profile {
            self.invalidate_unresolved();
        }
        document
    }

    /// Apply edits to a registered document.
    ///
    /// A profile edit may move it to another namespace, which is not known
    /// until it is parsed again. Maps validated against its old namespace
    /// and maps that found no profile are both invalidated.
    ///
    /// # Errors
    ///
    /// `NotFound` if `uri` is not registered, `VersionOutOfOrder` if
    /// `version` does not move forward.
    pub fn update(
        &self,
        uri: &Url,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<Arc<Document>> {
        let document = self.get(uri).ok_or_else(|| Error::NotFound(uri.clone()))?;
        let previous = document.update(changes, version)?;
        if document.kind() == DocumentKind::Profile {
            if let Some(namespace) = previous {
                self.invalidate_dependents(&namespace);
            }
            self.invalidate_unresolved();
        }
        Ok(document)
    }

    /// Unregister a document.
    ///
    /// # Errors
    ///
    /// `NotFound` if `uri` is not registered.
    pub fn remove(&self, uri: &Url) -> Result<Arc<Document>> {
        let (_, document) = self
            .documents
            .remove(uri)
            .ok_or_else(|| Error::NotFound(uri.clone()))?;
        tracing::debug!(%uri, "document removed");
        self.forget_profile(&document);
        Ok(document)
    }

    #[must_use]
    pub fn get(&self, uri: &Url) -> Option<Arc<Document>> {
        self.documents.get(uri).map(|entry| Arc::clone(entry.value()))
    }

    /// The registered document at `uri`, reading it from storage first if
    /// needed. Documents loaded this way start at version 0. When several
    /// loads of the same uri race, the first to finish reading is kept.
    ///
    /// # Errors
    ///
    /// `UnrecognizedKind` for extensions other than profile and map ones,
    /// `NotAFile` for non-file uris, `Io` if the read fails.
    pub async fn load_document(&self, uri: &Url) -> Result<Arc<Document>> {
        if let Some(document) = self.get(uri) {
            return Ok(document);
        }

        let kind = DocumentKind::from_uri(uri).ok_or_else(|| Error::UnrecognizedKind(uri.clone()))?;
        let path = uri
            .to_file_path()
            .map_err(|()| Error::NotAFile(uri.clone()))?;
        let text = self
            .storage
            .read_file(&path)
            .await
            .map_err(|source| Error::Io { path, source })?;

        let (document, inserted) = match self.documents.entry(uri.clone()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let document = Arc::new(Document::new(uri.clone(), kind, 0, &text));
                entry.insert(Arc::clone(&document));
                (document, true)
            }
        };

        if inserted {
            tracing::debug!(%uri, ?kind, "document loaded from storage");
            if kind == DocumentKind::Profile {
                self.invalidate_unresolved();
            }
        }
        Ok(document)
    }

    /// Snapshot of the registered documents, unaffected by later changes.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Document>> {
        self.documents
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The profile registered under `namespace`. Profiles that fail to parse
    /// never match. If several profiles share the namespace, the one with the
    /// lowest uri wins.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if a profile's outline is malformed.
    pub fn find_profile(&self, namespace: &str) -> Result<Option<Arc<Document>>> {
        Ok(self
            .documents_in(DocumentKind::Profile, namespace)?
            .into_iter()
            .min_by(|a, b| a.uri().cmp(b.uri())))
    }

    /// Every map targeting `namespace`. Maps that fail to parse never match.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if a map's outline is malformed.
    pub fn maps_targeting(&self, namespace: &str) -> Result<Vec<Arc<Document>>> {
        self.documents_in(DocumentKind::Map, namespace)
    }

    fn documents_in(&self, kind: DocumentKind, namespace: &str) -> Result<Vec<Arc<Document>>> {
        let mut matching = Vec::new();
        for document in self.all() {
            if document.kind() != kind {
                continue;
            }
            match document.namespace() {
                Ok(found) if found == namespace => matching.push(document),
                Ok(_) | Err(Error::Syntax(_)) => {}
                Err(error) => return Err(error),
            }
        }
        Ok(matching)
    }

    /// Clear cached diagnostics of every map targeting `namespace`.
    ///
    /// A map only holds diagnostics once its outline is cached, so the
    /// cached namespace is enough and no map gets parsed here.
    pub fn invalidate_dependents(&self, namespace: &str) {
        for document in self.all() {
            if document.kind() == DocumentKind::Map
                && document.cached_namespace().as_deref() == Some(namespace)
            {
                document.clear_cache();
            }
        }
    }

    fn invalidate_unresolved(&self) {
        for document in self.all() {
            if document.kind() == DocumentKind::Map {
                document.clear_unresolved();
            }
        }
    }

    /// Drop map diagnostics that were validated against `document`, which
    /// just left the registry or was replaced.
    fn forget_profile(&self, document: &Document) {
        if document.kind() == DocumentKind::Profile {
            if let Some(namespace) = document.cached_namespace() {
                self.invalidate_dependents(&namespace);
            }
        }
    }
}
