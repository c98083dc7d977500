//! Mapping resolution and tree assembly.
//!
//! [`convert`] runs a [`MappingTable`] over one [`FlatDocument`]:
//!
//! 1. every rule is resolved against the input ([`resolve`]); found values are converted
//!    ([`value`]) and written into the tree ([`tree`]). Wildcard patterns that do not match
//!    literally are collected in a [`DeferredRules`] accumulator owned by this call;
//! 2. deferred rules are expanded into array elements by scanning input keys ([`dynamic`]);
//! 3. the configured constants are inserted;
//! 4. unset values and empty containers are pruned ([`prune`]).
//!
//! Field-level problems never fail the conversion; they are returned as [`Diagnostic`]s.
//!
//! ## Example
//!
//! ```rust
//! use oscem_converter::conversion::{convert, ConversionOptions};
//! use oscem_converter::mapping::load_mapping_from_str;
//! use oscem_converter::types::FlatDocument;
//!
//! let table = load_mapping_from_str(
//!     "oscem,fromformat,optionals,units,crunch,type\n\
//!      instrument.acceleration_voltage,HT,,kV,0.001,float\n\
//!      acquisition.detectors[N].name,Detectors.Detector-[N].DetectorName,,,,string\n",
//! )?;
//! let input: FlatDocument = [
//!     ("HT", "300000"),
//!     ("Detectors.Detector-1.DetectorName", "Falcon"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v.to_string()))
//! .collect();
//!
//! let output = convert(&table, &input, &ConversionOptions::default());
//! assert!(output.diagnostics.is_empty());
//! assert_eq!(
//!     output.to_json(),
//!     serde_json::json!({
//!         "instrument": {"acceleration_voltage": {"value": 300.0, "unit": "kV"}},
//!         "acquisition": {"detectors": [{"name": "Falcon"}]}
//!     })
//! );
//! # Ok::<(), oscem_converter::ConversionError>(())
//! ```

pub mod diagnostic;
pub mod dynamic;
pub mod prune;
pub mod resolve;
pub mod tree;
pub mod value;

pub use diagnostic::Diagnostic;
pub use dynamic::DeferredRules;
pub use prune::prune;

use crate::error::ConversionResult;
use crate::mapping::{MappingRule, MappingTable, TargetPath};
use crate::types::{DataType, FlatDocument, Node, Object};

use self::resolve::Resolution;

/// Caller-supplied constants written next to the mapped fields.
///
/// `None` leaves the field alone; whatever the mapping produced (if anything) is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Spherical aberration, written to `instrument.cs` as a float in `mm`.
    pub cs: Option<String>,
    /// Gain reference flip/rotate instruction, written to `acquisition.gainref_flip_rotate`.
    pub gain_flip_rotate: Option<String>,
}

/// Counters for one conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Rules in the mapping table.
    pub rules: usize,
    /// Rules resolved by exact lookup in the first pass.
    pub resolved: usize,
    /// Wildcard patterns handed to array expansion.
    pub deferred: usize,
    /// Array elements created by expansion (before pruning).
    pub array_elements: usize,
}

/// Result of [`convert`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutput {
    /// Pruned output tree.
    pub document: Object,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    pub fn to_json(&self) -> serde_json::Value {
        Node::Object(self.document.clone()).to_json()
    }

    /// Pretty JSON with 2-space indentation and a trailing newline.
    pub fn to_json_pretty(&self) -> ConversionResult<String> {
        let mut text = serde_json::to_string_pretty(&DocumentRef(&self.document))?;
        text.push('\n');
        Ok(text)
    }
}

struct DocumentRef<'a>(&'a Object);

impl serde::Serialize for DocumentRef<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter())
    }
}

const CS_PATH: [&str; 2] = ["instrument", "cs"];
const CS_UNIT: &str = "mm";
const GAIN_FLIP_ROTATE_PATH: [&str; 2] = ["acquisition", "gainref_flip_rotate"];

/// Convert `input` according to `table`.
pub fn convert(table: &MappingTable, input: &FlatDocument, options: &ConversionOptions) -> ConversionOutput {
    let mut tree = Object::new();
    let mut diagnostics = Vec::new();
    let mut deferred = DeferredRules::default();
    let mut stats = ConversionStats {
        rules: table.rules.len(),
        ..ConversionStats::default()
    };

    for rule in &table.rules {
        let found = resolve::resolve_with(rule, input, |pattern, tier| {
            deferred.register(rule, pattern, tier);
        });
        if let Some(found) = found {
            stats.resolved += 1;
            apply_resolution(&mut tree, rule, &found, &mut diagnostics);
        }
    }
    stats.deferred = deferred.len();
    tracing::debug!(
        rules = stats.rules,
        resolved = stats.resolved,
        deferred = stats.deferred,
        "first pass complete"
    );

    for expanded in dynamic::expand(&deferred, input, &mut diagnostics) {
        stats.array_elements += expanded.elements.len();
        if let Err(error) = tree::append_to_array(&mut tree, &expanded.array, expanded.elements) {
            diagnostics.push(Diagnostic::InsertConflict {
                target: expanded.array.join("."),
                error,
            });
        }
    }

    insert_constants(&mut tree, options, &mut diagnostics);

    ConversionOutput {
        document: prune::prune_root(tree),
        diagnostics,
        stats,
    }
}

fn apply_resolution(
    tree: &mut Object,
    rule: &MappingRule,
    found: &Resolution,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match &rule.target {
        TargetPath::Field(path) => {
            let Some(raw) = found.values.first() else {
                return;
            };
            let Some(value) = convert_reporting(rule, raw, &found.unit_factor, diagnostics) else {
                return;
            };
            if let Err(error) = tree::insert(tree, path, value) {
                report_conflict(rule, error, diagnostics);
            }
        }
        TargetPath::Array { array, element } => {
            for (index, raw) in found.values.iter().enumerate() {
                if raw.is_empty() {
                    continue;
                }
                let Some(value) = convert_reporting(rule, raw, &found.unit_factor, diagnostics) else {
                    continue;
                };
                if let Err(error) = tree::insert_at_index(tree, array, index, element, value) {
                    report_conflict(rule, error, diagnostics);
                    return;
                }
            }
        }
    }
}

fn convert_reporting(
    rule: &MappingRule,
    raw: &str,
    unit_factor: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Node> {
    let conversion = value::convert(raw, unit_factor, &rule.declared_type, &rule.unit);
    if let Some(error) = conversion.warning {
        diagnostics.push(Diagnostic::UnitConversionFailed {
            target: rule.target.to_string(),
            error,
        });
    }
    conversion.value.map(Node::Value)
}

fn report_conflict(rule: &MappingRule, error: tree::TreeError, diagnostics: &mut Vec<Diagnostic>) {
    diagnostics.push(Diagnostic::InsertConflict {
        target: rule.target.to_string(),
        error,
    });
}

fn insert_constants(tree: &mut Object, options: &ConversionOptions, diagnostics: &mut Vec<Diagnostic>) {
    let constants = [
        (CS_PATH, options.cs.as_deref(), DataType::Float64, CS_UNIT),
        (GAIN_FLIP_ROTATE_PATH, options.gain_flip_rotate.as_deref(), DataType::Utf8, ""),
    ];
    for (path, raw, data_type, unit) in constants {
        let Some(raw) = raw else {
            continue;
        };
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        let value = Node::Value(value::cast(raw, data_type, unit));
        if let Err(error) = tree::insert(tree, &path, value) {
            diagnostics.push(Diagnostic::InsertConflict {
                target: path.join("."),
                error,
            });
        }
    }
}
