//! Semantic checks of a map against the profile it implements.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::model::{
    Location, MapDefinition, MapDocument, ProfileDefinition, ProfileDocument, ProfileId,
    UseCaseSafety,
};

/// The contract a profile exposes to maps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileOutput {
    pub profile: ProfileId,
    pub usecases: Vec<UseCaseOutput>,
    pub models: Vec<String>,
    pub fields: Vec<String>,
}

impl ProfileOutput {
    #[must_use]
    pub fn usecase(&self, name: &str) -> Option<&UseCaseOutput> {
        self.usecases.iter().find(|usecase| usecase.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UseCaseOutput {
    pub name: String,
    pub safety: Option<UseCaseSafety>,
    pub title: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum IssueKind {
    #[error("map targets profile {expected} but the profile is {actual}")]
    ProfileMismatch { expected: String, actual: String },

    #[error("usecase `{name}` is not defined in profile {profile}")]
    UseCaseNotFound { name: String, profile: String },

    #[error("map for usecase `{name}` is defined more than once")]
    DuplicateMap { name: String },

    #[error("operation `{name}` is defined more than once")]
    DuplicateOperation { name: String },

    #[error("operation `{name}` is not defined")]
    OperationNotFound { name: String },

    #[error("operation `{name}` is never called")]
    UnusedOperation { name: String },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind}")]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub pass: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// Summarise a profile's contract.
#[must_use]
pub fn compute_profile_output(profile: &ProfileDocument) -> ProfileOutput {
    let mut output = ProfileOutput {
        profile: ProfileId {
            scope: profile.header.scope.clone(),
            name: profile.header.name.clone(),
            version: profile.header.version,
        },
        usecases: Vec::new(),
        models: Vec::new(),
        fields: Vec::new(),
    };

    for definition in &profile.definitions {
        match definition {
            ProfileDefinition::UseCase(usecase) => output.usecases.push(UseCaseOutput {
                name: usecase.name.clone(),
                safety: usecase.safety,
                title: usecase.title.clone(),
            }),
            ProfileDefinition::Model(model) => output.models.push(model.name.clone()),
            ProfileDefinition::Field(field) => output.fields.push(field.name.clone()),
        }
    }

    output
}

/// Check `map` against the contract in `output`.
#[must_use]
pub fn validate_map(output: &ProfileOutput, map: &MapDocument) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !map.header.profile.is_compatible_with(&output.profile) {
        errors.push(ValidationIssue {
            kind: IssueKind::ProfileMismatch {
                expected: map.header.profile.to_string(),
                actual: output.profile.to_string(),
            },
            location: Some(map.header.location.clone()),
        });
    }

    let mut maps = FxHashSet::default();
    let mut operations = FxHashMap::default();
    for definition in &map.definitions {
        match definition {
            MapDefinition::Map(body) => {
                if !maps.insert(body.name.as_str()) {
                    errors.push(ValidationIssue {
                        kind: IssueKind::DuplicateMap {
                            name: body.name.clone(),
                        },
                        location: Some(body.location.clone()),
                    });
                }
                if output.usecase(&body.name).is_none() {
                    errors.push(ValidationIssue {
                        kind: IssueKind::UseCaseNotFound {
                            name: body.name.clone(),
                            profile: output.profile.to_string(),
                        },
                        location: Some(body.location.clone()),
                    });
                }
            }
            MapDefinition::Operation(body) => {
                if operations.insert(body.name.as_str(), body).is_some() {
                    errors.push(ValidationIssue {
                        kind: IssueKind::DuplicateOperation {
                            name: body.name.clone(),
                        },
                        location: Some(body.location.clone()),
                    });
                }
            }
        }
    }

    let mut called = FxHashSet::default();
    for call in map.definitions.iter().flat_map(|d| &d.body().calls) {
        called.insert(call.operation.as_str());
        if !operations.contains_key(call.operation.as_str()) {
            errors.push(ValidationIssue {
                kind: IssueKind::OperationNotFound {
                    name: call.operation.clone(),
                },
                location: Some(call.location.clone()),
            });
        }
    }

    // Walk definitions rather than the map so warnings come out in source order.
    for definition in &map.definitions {
        let MapDefinition::Operation(body) = definition else {
            continue;
        };
        if !called.contains(body.name.as_str()) {
            warnings.push(ValidationIssue {
                kind: IssueKind::UnusedOperation {
                    name: body.name.clone(),
                },
                location: Some(body.location.clone()),
            });
        }
    }

    ValidationResult {
        pass: errors.is_empty(),
        errors,
        warnings,
    }
}
