//! Single document state: text, version, and the memoized derivations

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use comlink_parser::{
    ProfileOutput, SyntaxError, SyntaxKind, SyntaxTree, compute_profile_output, validate_map,
};
use parking_lot::Mutex;
use tower_lsp::lsp_types::{Diagnostic, DocumentSymbol, TextDocumentContentChangeEvent, Url};

use crate::capabilities::{diagnostics, symbols};
use crate::convert::apply_content_changes;
use crate::error::{Error, Result};
use crate::state::DocumentRegistry;

/// Which grammar a document follows. Fixed for the document's lifetime.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum DocumentKind {
    Profile,
    Map,
}

impl DocumentKind {
    pub const PROFILE_EXTENSION: &'static str = "supr";
    pub const MAP_EXTENSION: &'static str = "suma";

    /// Kind announced by the editor on open.
    #[must_use]
    pub fn from_language_id(language_id: &str) -> Option<Self> {
        match language_id {
            "comlink-profile" => Some(Self::Profile),
            "comlink-map" => Some(Self::Map),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            Self::PROFILE_EXTENSION => Some(Self::Profile),
            Self::MAP_EXTENSION => Some(Self::Map),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::from_extension)
    }

    #[must_use]
    pub fn from_uri(uri: &Url) -> Option<Self> {
        uri.path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|file| file.rsplit_once('.'))
            .and_then(|(_, extension)| Self::from_extension(extension))
    }

    #[must_use]
    pub fn syntax_kind(self) -> SyntaxKind {
        match self {
            Self::Profile => SyntaxKind::Profile,
            Self::Map => SyntaxKind::Map,
        }
    }
}

/// Result of parsing one generation of the text.
pub type ParseOutcome = Arc<Result<SyntaxTree, SyntaxError>>;

/// File → namespace → definitions outline of a parsed document.
pub type Outline = Arc<[DocumentSymbol]>;

/// How many times a document ran each expensive derivation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    pub parses: usize,
    pub diagnostics: usize,
}

/// Derived state, one variant per pipeline stage reached for the current
/// text. A text change resets to `Empty`; clearing diagnostics steps back
/// from `Diagnosed` to `Outlined`.
#[derive(Debug, Default)]
enum Cache {
    #[default]
    Empty,
    Parsed {
        ast: ParseOutcome,
    },
    Outlined {
        ast: ParseOutcome,
        symbols: Result<Outline, SyntaxError>,
    },
    Diagnosed {
        ast: ParseOutcome,
        symbols: Result<Outline, SyntaxError>,
        diagnostics: Arc<[Diagnostic]>,
        /// A map validated against no profile.
        unresolved: bool,
    },
}

impl Cache {
    fn ast(&self) -> Option<&ParseOutcome> {
        match self {
            Self::Empty => None,
            Self::Parsed { ast } | Self::Outlined { ast, .. } | Self::Diagnosed { ast, .. } => {
                Some(ast)
            }
        }
    }

    fn symbols(&self) -> Option<&Result<Outline, SyntaxError>> {
        match self {
            Self::Empty | Self::Parsed { .. } => None,
            Self::Outlined { symbols, .. } | Self::Diagnosed { symbols, .. } => Some(symbols),
        }
    }

    fn namespace(&self) -> Option<String> {
        match self.symbols() {
            Some(Ok(outline)) => symbols::namespace_of(outline).ok().map(ToString::to_string),
            Some(Err(_)) | None => None,
        }
    }
}

#[derive(Debug)]
struct Inner {
    text: Arc<str>,
    version: i32,
    /// Bumped on every text change.
    generation: u64,
    /// Bumped on every text change and every diagnostics invalidation.
    epoch: u64,
    cache: Cache,
}

/// A parsed generation together with the text it came from.
struct Parsed {
    text: Arc<str>,
    generation: u64,
    ast: ParseOutcome,
}

/// One profile or map document known to the registry.
///
/// The lock is only held to read or swap cache entries. Parsing, validation
/// and registry lookups run without it, and their results are stored only
/// if the text (and, for diagnostics, the epoch) did not move meanwhile.
#[derive(Debug)]
pub struct Document {
    uri: Url,
    kind: DocumentKind,
    inner: Mutex<Inner>,
    parses: AtomicUsize,
    diagnostics_runs: AtomicUsize,
}

impl Document {
    #[must_use]
    pub fn new(uri: Url, kind: DocumentKind, version: i32, text: &str) -> Self {
        Self {
            uri,
            kind,
            inner: Mutex::new(Inner {
                text: Arc::from(text),
                version,
                generation: 0,
                epoch: 0,
                cache: Cache::Empty,
            }),
            parses: AtomicUsize::new(0),
            diagnostics_runs: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.inner.lock().version
    }

    #[must_use]
    pub fn text(&self) -> Arc<str> {
        Arc::clone(&self.inner.lock().text)
    }

    #[must_use]
    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            parses: self.parses.load(Ordering::Relaxed),
            diagnostics: self.diagnostics_runs.load(Ordering::Relaxed),
        }
    }

    /// Last path segment of the uri, used as the outline's root name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.uri
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_else(|| self.uri.as_str())
    }

    /// Parse of the current text.
    #[must_use]
    pub fn ast(&self) -> ParseOutcome {
        self.parsed().ast
    }

    fn parsed(&self) -> Parsed {
        let (text, generation) = {
            let inner = self.inner.lock();
            if let Some(ast) = inner.cache.ast() {
                tracing::trace!(uri = %self.uri, "ast cache hit");
                return Parsed {
                    text: Arc::clone(&inner.text),
                    generation: inner.generation,
                    ast: Arc::clone(ast),
                };
            }
            (Arc::clone(&inner.text), inner.generation)
        };

        self.parses.fetch_add(1, Ordering::Relaxed);
        let ast: ParseOutcome = Arc::new(comlink_parser::parse(&text, self.kind.syntax_kind()));

        let mut inner = self.inner.lock();
        if inner.generation == generation && matches!(inner.cache, Cache::Empty) {
            inner.cache = Cache::Parsed {
                ast: Arc::clone(&ast),
            };
        }
        Parsed {
            text,
            generation,
            ast,
        }
    }

    /// Outline of the current text.
    ///
    /// # Errors
    ///
    /// `Syntax` with the parse error if the text does not parse.
    pub fn symbols(&self) -> Result<Outline> {
        self.outlined().1.map_err(Error::from)
    }

    fn outlined(&self) -> (Parsed, Result<Outline, SyntaxError>) {
        let parsed = self.parsed();
        {
            let inner = self.inner.lock();
            if inner.generation == parsed.generation {
                if let Some(symbols) = inner.cache.symbols() {
                    tracing::trace!(uri = %self.uri, "symbols cache hit");
                    return (parsed, symbols.clone());
                }
            }
        }

        let symbols = match parsed.ast.as_ref() {
            Ok(tree) => Ok(Outline::from(symbols::document_symbols(
                tree,
                self.file_name(),
            ))),
            Err(error) => Err(error.clone()),
        };

        let mut inner = self.inner.lock();
        if inner.generation == parsed.generation {
            if let Cache::Parsed { ast } = std::mem::take(&mut inner.cache) {
                inner.cache = Cache::Outlined {
                    ast,
                    symbols: symbols.clone(),
                };
            }
        }
        drop(inner);
        (parsed, symbols)
    }

    /// Dependency key of the current text, e.g. `acme/weather@1.2`.
    ///
    /// # Errors
    ///
    /// `Syntax` if the text does not parse, `InvariantViolation` if the
    /// outline has no namespace node.
    pub fn namespace(&self) -> Result<String> {
        let outline = self.symbols()?;
        symbols::namespace_of(&outline).map(ToString::to_string)
    }

    /// Namespace of the outline currently cached, without computing one.
    #[must_use]
    pub fn cached_namespace(&self) -> Option<String> {
        self.inner.lock().cache.namespace()
    }

    /// Diagnostics of the current text.
    ///
    /// Computing a profile's diagnostics clears the cached diagnostics of
    /// every map targeting its namespace. A map whose profile is not
    /// registered gets no diagnostics.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if an outline is malformed.
    pub fn diagnostics(&self, registry: &DocumentRegistry) -> Result<Arc<[Diagnostic]>> {
        let epoch = {
            let inner = self.inner.lock();
            if let Cache::Diagnosed { diagnostics, .. } = &inner.cache {
                tracing::trace!(uri = %self.uri, "diagnostics cache hit");
                return Ok(Arc::clone(diagnostics));
            }
            inner.epoch
        };

        self.diagnostics_runs.fetch_add(1, Ordering::Relaxed);
        let (parsed, outline) = self.outlined();
        let (diagnostics, unresolved) = match (parsed.ast.as_ref(), &outline) {
            (Err(error), _) | (_, Err(error)) => (
                vec![diagnostics::syntax_error_to_diagnostic(error, &parsed.text)],
                false,
            ),
            (Ok(tree), Ok(outline)) => {
                let namespace = symbols::namespace_of(outline)?;
                match tree {
                    SyntaxTree::Profile(_) => {
                        registry.invalidate_dependents(namespace);
                        (Vec::new(), false)
                    }
                    SyntaxTree::Map(map) => match Self::resolve_profile(registry, namespace)? {
                        Some(output) => {
                            let result = validate_map(&output, map);
                            (diagnostics::validation_diagnostics(&result), false)
                        }
                        None => {
                            tracing::debug!(uri = %self.uri, namespace, "no profile registered for map");
                            (Vec::new(), true)
                        }
                    },
                }
            }
        };
        let diagnostics: Arc<[Diagnostic]> = Arc::from(diagnostics);

        let mut inner = self.inner.lock();
        if inner.generation == parsed.generation && inner.epoch == epoch {
            if let Cache::Outlined { ast, symbols } = std::mem::take(&mut inner.cache) {
                inner.cache = Cache::Diagnosed {
                    ast,
                    symbols,
                    diagnostics: Arc::clone(&diagnostics),
                    unresolved,
                };
            }
        } else {
            tracing::trace!(uri = %self.uri, "discarding diagnostics computed for a stale state");
        }
        drop(inner);
        Ok(diagnostics)
    }

    /// Semantic output of the profile registered under `namespace`, if any.
    fn resolve_profile(
        registry: &DocumentRegistry,
        namespace: &str,
    ) -> Result<Option<ProfileOutput>> {
        let Some(profile) = registry.find_profile(namespace)? else {
            return Ok(None);
        };
        let ast = profile.ast();
        let output = match ast.as_ref() {
            Ok(SyntaxTree::Profile(document)) => Some(compute_profile_output(document)),
            Ok(SyntaxTree::Map(_)) | Err(_) => None,
        };
        Ok(output)
    }

    /// Apply editor changes and move to `version`. Returns the namespace the
    /// previous text had, if it was known.
    ///
    /// # Errors
    ///
    /// `VersionOutOfOrder` unless `version` is greater than the current one.
    pub fn update(
        &self,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Result<Option<String>> {
        let mut inner = self.inner.lock();
        if version <= inner.version {
            return Err(Error::VersionOutOfOrder {
                uri: self.uri.clone(),
                current: inner.version,
                requested: version,
            });
        }

        let previous = inner.cache.namespace();
        inner.text = Arc::from(apply_content_changes(&inner.text, changes));
        inner.version = version;
        inner.generation += 1;
        inner.epoch += 1;
        inner.cache = Cache::Empty;
        drop(inner);

        tracing::debug!(uri = %self.uri, version, "document updated");
        Ok(previous)
    }

    /// Forget cached diagnostics, keeping the parse and outline.
    pub fn clear_cache(&self) {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        if let Cache::Diagnosed { ast, symbols, .. } = std::mem::take(&mut inner.cache) {
            tracing::trace!(uri = %self.uri, "diagnostics invalidated");
            inner.cache = Cache::Outlined { ast, symbols };
        }
    }

    /// Forget cached diagnostics only if they were computed without a
    /// profile to validate against.
    pub fn clear_unresolved(&self) {
        let unresolved = matches!(
            self.inner.lock().cache,
            Cache::Diagnosed {
                unresolved: true,
                ..
            }
        );
        if unresolved {
            self.clear_cache();
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tower_lsp::lsp_types::{Position, Range};

    const PROFILE: &str = "name = \"weather\"\nversion = \"1.0.0\"\nusecase GetWeather {}\n";

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///ws/{path}")).expect("valid uri")
    }

    fn registry() -> DocumentRegistry {
        DocumentRegistry::new(Arc::new(MemoryStorage::new()))
    }

    fn full(text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_string(),
        }
    }

    #[rstest]
    #[case("file:///ws/a.supr", Some(DocumentKind::Profile))]
    #[case("file:///ws/dir/b.suma", Some(DocumentKind::Map))]
    #[case("file:///ws/notes.txt", None)]
    #[case("file:///ws/supr", None)]
    fn test_kind_from_uri(#[case] input: &str, #[case] expected: Option<DocumentKind>) {
        let uri = Url::parse(input).expect("valid uri");
        assert_eq!(DocumentKind::from_uri(&uri), expected);
    }

    #[test]
    fn test_kind_from_language_id() {
        assert_eq!(
            DocumentKind::from_language_id("comlink-map"),
            Some(DocumentKind::Map)
        );
        assert_eq!(DocumentKind::from_language_id("plaintext"), None);
        assert_eq!(
            DocumentKind::from_path(Path::new("/ws/a.supr")),
            Some(DocumentKind::Profile)
        );
    }

    #[test]
    fn test_ast_is_memoized() {
        let document = Document::new(uri("weather.supr"), DocumentKind::Profile, 1, PROFILE);
        assert!(document.ast().is_ok());
        assert!(document.ast().is_ok());
        assert!(document.symbols().is_ok());
        assert_eq!(document.stats().parses, 1);
    }

    #[test]
    fn test_namespace_and_file_name() {
        let document = Document::new(uri("weather.supr"), DocumentKind::Profile, 1, PROFILE);
        assert_eq!(document.file_name(), "weather.supr");
        assert_eq!(document.cached_namespace(), None);
        assert_eq!(document.namespace().expect("namespace"), "weather@1.0");
        assert_eq!(document.cached_namespace().as_deref(), Some("weather@1.0"));
    }

    #[test]
    fn test_namespace_of_broken_document_is_the_syntax_error() {
        let document = Document::new(uri("broken.supr"), DocumentKind::Profile, 1, "name = ");
        let Err(Error::Syntax(error)) = document.namespace() else {
            panic!("expected a syntax error");
        };
        let Err(parse_error) = document.ast().as_ref().clone() else {
            panic!("expected a failed parse");
        };
        assert_eq!(error, parse_error);
    }

    #[test]
    fn test_update_reparses_new_text() -> Result<()> {
        let document = Document::new(uri("weather.supr"), DocumentKind::Profile, 1, PROFILE);
        assert_eq!(document.namespace()?, "weather@1.0");

        let previous = document.update(
            &[full("name = \"acme/weather\"\nversion = \"2.1.0\"\n")],
            2,
        )?;
        assert_eq!(previous.as_deref(), Some("weather@1.0"));
        assert_eq!(document.version(), 2);
        assert_eq!(document.namespace()?, "acme/weather@2.1");
        assert_eq!(document.stats().parses, 2);
        Ok(())
    }

    #[test]
    fn test_update_applies_ranged_edit() -> Result<()> {
        let document = Document::new(uri("weather.supr"), DocumentKind::Profile, 1, PROFILE);
        document.update(
            &[TextDocumentContentChangeEvent {
                range: Some(Range::new(Position::new(1, 11), Position::new(1, 16))),
                range_length: None,
                text: "3.4.0".to_string(),
            }],
            2,
        )?;
        assert_eq!(document.namespace()?, "weather@3.4");
        Ok(())
    }

    #[rstest]
    #[case(1)]
    #[case(0)]
    fn test_update_rejects_stale_version(#[case] version: i32) {
        let document = Document::new(uri("weather.supr"), DocumentKind::Profile, 1, PROFILE);
        let result = document.update(&[full("")], version);
        assert!(matches!(
            result,
            Err(Error::VersionOutOfOrder {
                current: 1,
                requested,
                ..
            }) if requested == version
        ));
        assert_eq!(&*document.text(), PROFILE);
    }

    #[test]
    fn test_syntax_error_is_single_diagnostic() -> Result<()> {
        let registry = registry();
        let document = Document::new(
            uri("broken.supr"),
            DocumentKind::Profile,
            1,
            "name = \"weather\nversion = \"1.0.0\"\n",
        );
        let diagnostics = document.diagnostics(&registry)?;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].source.as_deref(), Some("lexer"));
        assert_eq!(diagnostics[0].range.start, Position::new(0, 7));
        Ok(())
    }

    #[test]
    fn test_diagnostics_cached_until_cleared() -> Result<()> {
        let registry = registry();
        let document = Document::new(uri("weather.supr"), DocumentKind::Profile, 1, PROFILE);

        assert!(document.diagnostics(&registry)?.is_empty());
        assert!(document.diagnostics(&registry)?.is_empty());
        assert_eq!(document.stats().diagnostics, 1);

        document.clear_cache();
        document.diagnostics(&registry)?;
        assert_eq!(
            document.stats(),
            DocumentStats {
                parses: 1,
                diagnostics: 2
            }
        );
        Ok(())
    }

    #[test]
    fn test_clear_unresolved_keeps_resolved_results() -> Result<()> {
        let registry = registry();
        let profile = Document::new(uri("weather.supr"), DocumentKind::Profile, 1, PROFILE);
        profile.diagnostics(&registry)?;
        profile.clear_unresolved();
        profile.diagnostics(&registry)?;
        assert_eq!(profile.stats().diagnostics, 1);
        Ok(())
    }
}
