//! One row of the mapping table.

use std::fmt;

use thiserror::Error;

use crate::types::DataType;

/// Array placeholder used in target paths and source-key patterns.
pub const WILDCARD: &str = "[N]";

/// Reasons a target path cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetPathError {
    #[error("target path is empty")]
    Empty,
    #[error("target path '{0}' contains more than one [N] segment")]
    NestedWildcard(String),
    #[error("target path '{0}' has no array name before [N]")]
    MissingArrayName(String),
    #[error("target path '{0}' has no element field after [N]")]
    MissingElementPath(String),
}

/// Parsed location in the output tree a rule writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPath {
    /// Plain nested field, e.g. `acquisition.voltage`.
    Field(Vec<String>),
    /// Field inside elements of an array, e.g. `acquisition.detectors[N].name`.
    Array {
        /// Path to the array itself, array name included (`acquisition.detectors`).
        array: Vec<String>,
        /// Path inside one element (`name`).
        element: Vec<String>,
    },
}

impl TargetPath {
    pub fn parse(raw: &str) -> Result<Self, TargetPathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TargetPathError::Empty);
        }

        let Some((before, after)) = raw.split_once(WILDCARD) else {
            return Ok(Self::Field(split_segments(raw)));
        };
        if after.contains(WILDCARD) {
            return Err(TargetPathError::NestedWildcard(raw.to_string()));
        }
        if before.is_empty() || before.ends_with('.') {
            return Err(TargetPathError::MissingArrayName(raw.to_string()));
        }
        let after = after.strip_prefix('.').unwrap_or(after);
        if after.is_empty() {
            return Err(TargetPathError::MissingElementPath(raw.to_string()));
        }

        Ok(Self::Array {
            array: split_segments(before),
            element: split_segments(after),
        })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    /// Dot-joined location of the array, if this is an array path.
    pub fn array_location(&self) -> Option<String> {
        match self {
            Self::Array { array, .. } => Some(array.join(".")),
            Self::Field(_) => None,
        }
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(path) => f.write_str(&path.join(".")),
            Self::Array { array, element } => {
                write!(f, "{}{WILDCARD}.{}", array.join("."), element.join("."))
            }
        }
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// One prioritized group of source-key patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTier {
    /// Default source-key pattern.
    pub primary: String,
    /// Preferred over `primary` when it resolves.
    pub alternate: String,
    /// Unit conversion factor; empty means no conversion.
    pub unit_factor: String,
}

impl SourceTier {
    /// Non-empty patterns in lookup order (alternate first).
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        [self.alternate.as_str(), self.primary.as_str()]
            .into_iter()
            .filter(|p| !p.is_empty())
    }
}

/// Declared target type of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    Known(DataType),
    /// A type name the converter does not handle; the field is never written.
    Unrecognized(String),
}

impl DeclaredType {
    pub fn parse(name: &str) -> Self {
        match DataType::from_declared(name) {
            Some(t) => Self::Known(t),
            None => Self::Unrecognized(name.trim().to_string()),
        }
    }
}

/// A single mapping rule: where a field goes, where it comes from, how to convert it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    pub target: TargetPath,
    /// Lookup tiers in priority order.
    pub tiers: [SourceTier; 2],
    /// Unit label attached to numeric values.
    pub unit: String,
    pub declared_type: DeclaredType,
}

impl MappingRule {
    /// A rule with a single tier. Convenient for tests and programmatic tables.
    pub fn new(target: TargetPath, primary: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            target,
            tiers: [
                SourceTier {
                    primary: primary.into(),
                    ..SourceTier::default()
                },
                SourceTier::default(),
            ],
            unit: String::new(),
            declared_type,
        }
    }

    pub fn with_alternate(mut self, alternate: impl Into<String>) -> Self {
        self.tiers[0].alternate = alternate.into();
        self
    }

    pub fn with_unit_factor(mut self, factor: impl Into<String>) -> Self {
        self.tiers[0].unit_factor = factor.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_second_tier(mut self, tier: SourceTier) -> Self {
        self.tiers[1] = tier;
        self
    }
}
