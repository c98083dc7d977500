use std::fmt;

use crate::observability::Severity;

use super::tree::TreeError;
use super::value::UnitConversionError;

/// A non-fatal problem found while converting one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Unit factor present but the source value is not numeric; the raw value was kept.
    UnitConversionFailed {
        target: String,
        error: UnitConversionError,
    },
    /// The rule's target path collides with an existing value; the rule was skipped.
    InsertConflict { target: String, error: TreeError },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnitConversionFailed { .. } => Severity::Warning,
            Self::InsertConflict { .. } => Severity::Error,
        }
    }

    /// Target path the diagnostic refers to.
    pub fn subject(&self) -> &str {
        match self {
            Self::UnitConversionFailed { target, .. } | Self::InsertConflict { target, .. } => target,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnitConversionFailed { target, error } => {
                write!(f, "unit conversion failed for {target}: {error}")
            }
            Self::InsertConflict { target, error } => write!(f, "skipped {target}: {error}"),
        }
    }
}
