use std::fmt;

use serde::Serialize;

/// A `Location` represents a region of a document.
///
/// Byte offsets are canonical; `start` and `end` are the human-readable
/// positions of those offsets.
#[derive(Debug, Default, Clone, Hash, Eq, PartialEq, Serialize)]
pub struct Location {
    /// The absolute start byte offset of the location.
    pub absolute_start: usize,
    /// The absolute end byte offset of the location (exclusive).
    pub absolute_end: usize,

    /// The start position of the location.
    pub start: Position,
    /// The end position of the location.
    pub end: Position,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "location.start({}), location.end({})",
            self.start, self.end
        )
    }
}

/// A `Position` is a 1-based line and column. Columns count Unicode scalar
/// values, not bytes.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line: {}, column: {}", self.line, self.column)
    }
}

/// `major.minor[.patch]`
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl Version {
    /// Parse a `major.minor[.patch]` version string.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = match parts.next() {
            Some(patch) => Some(patch.parse().ok()?),
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        Ok(())
    }
}

/// A `[scope/]name` document name.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize)]
pub struct DocumentName {
    pub scope: Option<String>,
    pub name: String,
}

impl DocumentName {
    /// Parse a `[scope/]name` string. Both parts must be non-empty and made of
    /// lowercase letters, digits, `-` and `_`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let (scope, name) = match input.split_once('/') {
            Some((scope, name)) => (Some(scope), name),
            None => (None, input),
        };
        if !is_name_part(name) || scope.is_some_and(|scope| !is_name_part(scope)) {
            return None;
        }
        Some(Self {
            scope: scope.map(ToString::to_string),
            name: name.to_string(),
        })
    }
}

fn is_name_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// The profile a map implements: `[scope/]name@major.minor`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize)]
pub struct ProfileId {
    pub scope: Option<String>,
    pub name: String,
    pub version: Version,
}

impl ProfileId {
    /// Parse a `[scope/]name@major.minor[.patch]` profile id.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let (name, version) = input.split_once('@')?;
        let DocumentName { scope, name } = DocumentName::parse(name)?;
        Some(Self {
            scope,
            name,
            version: Version::parse(version)?,
        })
    }

    /// Two ids refer to the same contract when scope, name, major and minor
    /// agree. Patch versions are compatible.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.scope == other.scope
            && self.name == other.name
            && self.version.major == other.version.major
            && self.version.minor == other.version.minor
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{scope}/")?;
        }
        write!(
            f,
            "{}@{}.{}",
            self.name, self.version.major, self.version.minor
        )
    }
}

/// The parse of one document, tagged by the kind it was parsed as.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum SyntaxTree {
    Profile(ProfileDocument),
    Map(MapDocument),
}

impl SyntaxTree {
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::Profile(profile) => &profile.location,
            Self::Map(map) => &map.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileDocument {
    pub header: ProfileHeader,
    pub definitions: Vec<ProfileDefinition>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileHeader {
    pub scope: Option<String>,
    pub name: String,
    pub version: Version,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ProfileDefinition {
    UseCase(UseCaseDefinition),
    Model(NamedModelDefinition),
    Field(NamedFieldDefinition),
}

impl ProfileDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::UseCase(usecase) => &usecase.name,
            Self::Model(model) => &model.name,
            Self::Field(field) => &field.name,
        }
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::UseCase(usecase) => usecase.title.as_deref(),
            Self::Model(model) => model.title.as_deref(),
            Self::Field(field) => field.title.as_deref(),
        }
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::UseCase(usecase) => &usecase.location,
            Self::Model(model) => &model.location,
            Self::Field(field) => &field.location,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCaseSafety {
    Safe,
    Unsafe,
    Idempotent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UseCaseDefinition {
    pub name: String,
    pub safety: Option<UseCaseSafety>,
    pub title: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedModelDefinition {
    pub name: String,
    pub title: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedFieldDefinition {
    pub name: String,
    /// The declared type token, if any (`{...}` for inline models).
    pub type_name: Option<String>,
    pub title: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDocument {
    pub header: MapHeader,
    pub definitions: Vec<MapDefinition>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapHeader {
    pub profile: ProfileId,
    pub provider: String,
    pub variant: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum MapDefinition {
    Map(MapBody),
    Operation(MapBody),
}

impl MapDefinition {
    #[must_use]
    pub fn body(&self) -> &MapBody {
        match self {
            Self::Map(body) | Self::Operation(body) => body,
        }
    }
}

/// The parts of a `map` or `operation` definition the tooling cares about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapBody {
    pub name: String,
    pub calls: Vec<CallSite>,
    pub location: Location,
}

/// A `call Operation` statement inside a map or operation body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSite {
    pub operation: String,
    pub location: Location,
}
