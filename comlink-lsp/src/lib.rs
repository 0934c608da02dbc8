//! comlink-lsp library
//!
//! The incremental analysis core for Comlink profile and map documents, and
//! the LSP backend built on it.

pub mod backend;
pub mod capabilities;
pub mod config;
pub mod convert;
pub mod error;
pub mod progress;
pub mod state;
pub mod storage;

pub use backend::Backend;
pub use config::Config;
pub use error::{Error, Result};
pub use progress::{ClientProgress, Progress, Silent};
pub use state::{Document, DocumentKind, DocumentRegistry, Workspace};
pub use storage::{DiskStorage, MemoryStorage, Storage, WalkEntry};
