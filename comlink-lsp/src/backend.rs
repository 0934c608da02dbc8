//! LSP backend implementation
//!
//! Contains the main `Backend` struct that implements the `LanguageServer` trait.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use dashmap::DashSet;
use tower_lsp::jsonrpc::{self, Result};
use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DocumentSymbolParams, DocumentSymbolResponse, InitializeParams, InitializeResult,
    InitializedParams, OneOf, ServerCapabilities, ServerInfo, SymbolInformation,
    TextDocumentSyncCapability, TextDocumentSyncKind, Url, WorkspaceSymbolParams,
};
use tower_lsp::{Client, LanguageServer};

use crate::capabilities::diagnostics;
use crate::config::Config;
use crate::error::Error;
use crate::progress::{ClientProgress, Progress, Silent};
use crate::state::{DocumentKind, Workspace};
use crate::storage::{DiskStorage, Storage};

const BOOTSTRAP_PROGRESS_TOKEN: &str = "comlink/bootstrap";

/// LSP backend for Comlink profiles and maps
pub struct Backend {
    /// Client handle for sending messages back to the editor
    client: Client,
    workspace: Workspace,
    /// Set once by `initialize`
    config: OnceLock<Config>,
    roots: OnceLock<Vec<PathBuf>>,
    /// Whether the client accepts server-created progress tokens
    work_done_progress: OnceLock<bool>,
    /// Documents currently open in the editor
    open: DashSet<Url>,
}

impl Backend {
    /// Create a backend reading unopened documents from disk
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_storage(client, Arc::new(DiskStorage))
    }

    #[must_use]
    pub fn with_storage(client: Client, storage: Arc<dyn Storage>) -> Self {
        Self {
            client,
            workspace: Workspace::new(storage),
            config: OnceLock::new(),
            roots: OnceLock::new(),
            work_done_progress: OnceLock::new(),
            open: DashSet::new(),
        }
    }

    fn config(&self) -> &Config {
        self.config.get_or_init(Config::default)
    }

    /// Publish diagnostics for a document
    async fn publish_diagnostics(&self, uri: Url) {
        let computed = match self.workspace.diagnostics(&uri).await {
            Ok(computed) => computed,
            Err(error) => {
                tracing::error!(%uri, %error, "dropping diagnostics request");
                return;
            }
        };
        let version = if self.open.contains(&uri) {
            self.workspace.registry().get(&uri).map(|document| document.version())
        } else {
            None
        };
        let published = diagnostics::truncate(&computed, self.config().max_problems);
        self.client
            .publish_diagnostics(uri, published, version)
            .await;
    }

    /// Republish open maps validated against the profile at `uri`
    async fn publish_dependents(&self, uri: &Url) {
        let is_profile = self
            .workspace
            .registry()
            .get(uri)
            .is_some_and(|document| document.kind() == DocumentKind::Profile);
        if !is_profile {
            return;
        }

        match self.workspace.dependents(uri).await {
            Ok(maps) => {
                for map in maps {
                    if self.open.contains(map.uri()) {
                        self.publish_diagnostics(map.uri().clone()).await;
                    }
                }
            }
            Err(error) => tracing::error!(%uri, %error, "failed to resolve dependent maps"),
        }
    }
}

/// Local folders named by the client, `rootUri` if there are no workspace
/// folders.
fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
    #[allow(deprecated)] // rootUri is the fallback for clients without folders
    let uris: Vec<&Url> = match &params.workspace_folders {
        Some(folders) if !folders.is_empty() => folders.iter().map(|folder| &folder.uri).collect(),
        Some(_) | None => params.root_uri.iter().collect(),
    };
    uris.into_iter()
        .filter_map(|uri| match uri.to_file_path() {
            Ok(path) => Some(path),
            Err(()) => {
                tracing::warn!(%uri, "ignoring non-file workspace root");
                None
            }
        })
        .collect()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Initializing comlink-lsp");

        let config = Config::from_initialization_options(params.initialization_options.clone());
        let mut roots = workspace_roots(&params);
        roots.extend(config.extra_roots.iter().cloned());
        let work_done_progress = params
            .capabilities
            .window
            .as_ref()
            .and_then(|window| window.work_done_progress)
            .unwrap_or(false);
        if self.config.set(config).is_err()
            || self.roots.set(roots).is_err()
            || self.work_done_progress.set(work_done_progress).is_err()
        {
            tracing::warn!("initialize received more than once, keeping first settings");
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "comlink-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("comlink-lsp initialized");

        let roots = self.roots.get().cloned().unwrap_or_default();
        if !self.config().bootstrap || roots.is_empty() {
            return;
        }

        let progress: Arc<dyn Progress> = if self.work_done_progress.get() == Some(&true) {
            Arc::new(ClientProgress::new(self.client.clone(), BOOTSTRAP_PROGRESS_TOKEN))
        } else {
            Arc::new(Silent)
        };
        let bootstrap = self.workspace.spawn_bootstrap(roots, progress);
        tokio::spawn(async move {
            match bootstrap.join().await {
                Ok(report) => tracing::debug!(?report, "bootstrap complete"),
                Err(error) => tracing::error!(%error, "bootstrap failed"),
            }
        });
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down comlink-lsp");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        tracing::debug!("Document opened: {}", document.uri);

        if let Err(error) = self.workspace.open_document(
            document.uri.clone(),
            &document.language_id,
            document.version,
            &document.text,
        ) {
            tracing::error!(%error, "ignoring opened document");
            return;
        }
        self.open.insert(document.uri.clone());
        self.publish_diagnostics(document.uri.clone()).await;
        self.publish_dependents(&document.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document changed: {uri}");

        if let Err(error) = self.workspace.change_document(
            &uri,
            &params.content_changes,
            params.text_document.version,
        ) {
            tracing::error!(%error, "dropping document change");
            return;
        }
        self.publish_diagnostics(uri.clone()).await;
        self.publish_dependents(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document closed: {uri}");

        self.open.remove(&uri);
        if let Err(error) = self.workspace.close_document(&uri) {
            tracing::error!(%error, "closing unknown document");
        }
        // Clear diagnostics for closed file
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        match self.workspace.document_symbols(&uri).await {
            Ok(outline) => Ok(Some(DocumentSymbolResponse::Nested(outline.to_vec()))),
            Err(Error::Syntax(_)) => Ok(None),
            Err(error) => {
                tracing::error!(%uri, %error, "document symbol request failed");
                Err(jsonrpc::Error::internal_error())
            }
        }
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        match self.workspace.workspace_symbols(&params.query).await {
            Ok(symbols) => Ok(Some(symbols)),
            Err(error) => {
                tracing::error!(%error, "workspace symbol request failed");
                Err(jsonrpc::Error::internal_error())
            }
        }
    }
}
