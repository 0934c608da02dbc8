//! Workspace symbols: flattened outlines of every registered document

use tower_lsp::lsp_types::{DocumentSymbol, Location, SymbolInformation, Url};

/// Flatten an outline into `SymbolInformation`, parents before children,
/// each child naming its parent as container.
#[must_use]
pub fn flatten_symbols(uri: &Url, symbols: &[DocumentSymbol]) -> Vec<SymbolInformation> {
    let mut flat = Vec::new();
    for symbol in symbols {
        push_symbol(uri, symbol, None, &mut flat);
    }
    flat
}

fn push_symbol(
    uri: &Url,
    symbol: &DocumentSymbol,
    container: Option<&str>,
    flat: &mut Vec<SymbolInformation>,
) {
    #[allow(deprecated)] // deprecated field but required by the type
    flat.push(SymbolInformation {
        name: symbol.name.clone(),
        kind: symbol.kind,
        tags: None,
        deprecated: None,
        location: Location::new(uri.clone(), symbol.range),
        container_name: container.map(ToString::to_string),
    });
    for child in symbol.children.iter().flatten() {
        push_symbol(uri, child, Some(&symbol.name), flat);
    }
}

/// Case-insensitive substring match; an empty query matches everything.
#[must_use]
pub fn matches_query(symbol: &SymbolInformation, query: &str) -> bool {
    query.is_empty() || symbol.name.to_lowercase().contains(&query.to_lowercase())
}
