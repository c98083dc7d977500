//! Mapping table model and loading.
//!
//! A mapping table is a CSV file with one [`MappingRule`] per row. Most callers either load
//! their own table with [`load_mapping_from_path`] or fall back to [`MappingTable::embedded`],
//! the default table compiled into the crate.
//!
//! ```
//! use oscem_converter::mapping::load_mapping_from_str;
//!
//! let table = load_mapping_from_str(
//!     "oscem,fromformat,optionals,units,crunch,type\n\
//!      acquisition.detectors[N].name,Detectors.Detector-[N].DetectorName,,,,string\n",
//! )?;
//! assert_eq!(table.rules.len(), 1);
//! assert!(table.rules[0].target.is_array());
//! # Ok::<(), oscem_converter::ConversionError>(())
//! ```

pub mod csv;
pub mod rule;

pub use csv::{load_mapping_from_path, load_mapping_from_reader, load_mapping_from_str, TableLayout};
pub use rule::{DeclaredType, MappingRule, SourceTier, TargetPath, TargetPathError, WILDCARD};

use crate::error::ConversionResult;

const EMBEDDED_TABLE: &str = include_str!("conversions.csv");

/// A parsed mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    /// Layout the table was read with.
    pub layout: TableLayout,
    /// Rules in table order.
    pub rules: Vec<MappingRule>,
    /// Number of rows dropped because their target path was unusable.
    pub skipped: usize,
}

impl MappingTable {
    /// Build a table directly from rules.
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self {
            layout: TableLayout::Full,
            rules,
            skipped: 0,
        }
    }

    /// The default mapping table shipped with the crate.
    pub fn embedded() -> ConversionResult<Self> {
        load_mapping_from_str(EMBEDDED_TABLE)
    }
}
