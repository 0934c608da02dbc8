use std::path::PathBuf;

use comlink_parser::SyntaxError;
use tower_lsp::lsp_types::Url;

/// Failures of the analysis core.
///
/// Syntax and validation problems in a document are not errors here: they
/// become diagnostics. `Syntax` only surfaces when a caller asks for
/// something (like a namespace) that needs a successful parse.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("document not registered: {0}")]
    NotFound(Url),

    #[error("not a profile or map document: {0}")]
    UnrecognizedKind(Url),

    #[error("document {uri} is at version {current}, refusing update to version {requested}")]
    VersionOutOfOrder {
        uri: Url,
        current: i32,
        requested: i32,
    },

    #[error("not a file uri: {0}")]
    NotAFile(Url),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
