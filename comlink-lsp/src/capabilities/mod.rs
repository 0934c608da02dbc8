//! LSP capability implementations

pub mod diagnostics;
pub mod symbols;
pub mod workspace_symbols;
