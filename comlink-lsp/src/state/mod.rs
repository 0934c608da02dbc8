//! State management for profile and map documents

mod barrier;
mod bootstrap;
mod document;
mod registry;
mod workspace;

pub use barrier::{BootstrapBarrier, BootstrapGuard};
pub use bootstrap::{BootstrapHandle, BootstrapReport, load_workspace_documents};
pub use document::{Document, DocumentKind, DocumentStats, Outline, ParseOutcome};
pub use registry::DocumentRegistry;
pub use workspace::Workspace;
