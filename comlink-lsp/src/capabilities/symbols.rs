//! Document symbols: the file → namespace → definitions outline

use comlink_parser::{
    Location, MapDefinition, MapDocument, ProfileDefinition, ProfileDocument, SyntaxTree, Version,
};
use tower_lsp::lsp_types::{DocumentSymbol, Range, SymbolKind};

use crate::convert::{location_to_range, parser_position_to_lsp};
use crate::error::{Error, Result};

/// Format a namespace as a dependency key: `scope/name@major.minor`, or
/// `name@major.minor` without a scope.
#[must_use]
pub fn format_namespace(scope: Option<&str>, name: &str, version: Version) -> String {
    let namespace = format!("{name}@{}.{}", version.major, version.minor);
    match scope {
        Some(scope) => format!("{scope}/{namespace}"),
        None => namespace,
    }
}

/// Build the outline of a parsed document: one `File` symbol containing one
/// `Namespace` symbol containing the top-level definitions.
#[must_use]
pub fn document_symbols(tree: &SyntaxTree, file_name: &str) -> Vec<DocumentSymbol> {
    let (namespace, header, children) = match tree {
        SyntaxTree::Profile(profile) => (
            format_namespace(
                profile.header.scope.as_deref(),
                &profile.header.name,
                profile.header.version,
            ),
            &profile.header.location,
            profile_children(profile),
        ),
        SyntaxTree::Map(map) => (
            format_namespace(
                map.header.profile.scope.as_deref(),
                &map.header.profile.name,
                map.header.profile.version,
            ),
            &map.header.location,
            map_children(map),
        ),
    };

    let file = tree.location();
    let namespace_range = Range {
        start: parser_position_to_lsp(header.start),
        end: parser_position_to_lsp(file.end),
    };

    vec![symbol(
        file_name.to_string(),
        None,
        SymbolKind::FILE,
        location_to_range(file),
        vec![symbol(
            namespace,
            None,
            SymbolKind::NAMESPACE,
            namespace_range,
            children,
        )],
    )]
}

/// The namespace name of an outline built by [`document_symbols`].
///
/// # Errors
///
/// `InvariantViolation` if the outline does not have a namespace as the
/// first child of its root.
pub fn namespace_of(symbols: &[DocumentSymbol]) -> Result<&str> {
    symbols
        .first()
        .and_then(|file| file.children.as_deref())
        .and_then(<[DocumentSymbol]>::first)
        .filter(|namespace| namespace.kind == SymbolKind::NAMESPACE)
        .map(|namespace| namespace.name.as_str())
        .ok_or_else(|| {
            Error::InvariantViolation("document outline has no namespace symbol".to_string())
        })
}

fn profile_children(profile: &ProfileDocument) -> Vec<DocumentSymbol> {
    profile
        .definitions
        .iter()
        .map(|definition| {
            let kind = match definition {
                ProfileDefinition::UseCase(_) | ProfileDefinition::Model(_) => {
                    SymbolKind::INTERFACE
                }
                ProfileDefinition::Field(_) => SymbolKind::FIELD,
            };
            leaf(
                definition.name(),
                definition.title(),
                kind,
                definition.location(),
            )
        })
        .collect()
}

fn map_children(map: &MapDocument) -> Vec<DocumentSymbol> {
    map.definitions
        .iter()
        .map(|definition| {
            let kind = match definition {
                MapDefinition::Map(_) => SymbolKind::CLASS,
                MapDefinition::Operation(_) => SymbolKind::FUNCTION,
            };
            let body = definition.body();
            leaf(&body.name, None, kind, &body.location)
        })
        .collect()
}

fn leaf(name: &str, detail: Option<&str>, kind: SymbolKind, location: &Location) -> DocumentSymbol {
    symbol(
        name.to_string(),
        detail.map(ToString::to_string),
        kind,
        location_to_range(location),
        Vec::new(),
    )
}

fn symbol(
    name: String,
    detail: Option<String>,
    kind: SymbolKind,
    range: Range,
    children: Vec<DocumentSymbol>,
) -> DocumentSymbol {
    #[allow(deprecated)] // deprecated field but required by the type
    DocumentSymbol {
        name,
        detail,
        kind,
        tags: None,
        deprecated: None,
        range,
        selection_range: range,
        children: Some(children),
    }
}
