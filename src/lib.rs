//! `oscem-converter` turns flat instrument metadata (key → string JSON, as exported from
//! acquisition software) into a nested OSCEM JSON document, driven by a CSV mapping table.
//!
//! The primary entrypoint is [`pipeline::run_conversion`], which loads a mapping table (the
//! embedded default or a custom file), reads the input document, converts it and writes the
//! output file. The pure conversion engine is [`conversion::convert`].
//!
//! ## Mapping tables
//!
//! Each row maps a target path to source keys:
//!
//! - **Simplified layout**: `oscem, fromformat, optionals, units, crunch, type`
//! - **Full layout**: two source tiers, mdoc (`frommdoc`, `optionals_mdoc`, `crunchfrommdoc`)
//!   before xml (`fromxml`, `optionals_xml`, `crunchfromxml`), plus `oscem`, `units`, `type`
//!
//! Within a tier the alternate (`optionals*`) key wins over the primary key. Source patterns may
//! be a `;`-separated key list (fixed-size arrays) or contain a `[N]` wildcard (arrays discovered
//! from the input keys). Declared types are `int`, `float`/`float64`, `bool` and `string`.
//!
//! ## Output
//!
//! Numbers with a unit serialize as `{"value": v, "unit": "u"}`, everything else as bare JSON
//! scalars. Fields absent from the input leave no key behind.
//!
//! ## Quick example
//!
//! ```no_run
//! use oscem_converter::conversion::ConversionOptions;
//! use oscem_converter::pipeline::{run_conversion, MappingSource, PipelineOptions};
//!
//! # fn main() -> Result<(), oscem_converter::ConversionError> {
//! let opts = PipelineOptions {
//!     mapping: MappingSource::Path("conversions.csv".into()),
//!     output_name: Some("session".to_string()),
//!     conversion: ConversionOptions {
//!         cs: Some("2.7".to_string()),
//!         gain_flip_rotate: None,
//!     },
//!     ..Default::default()
//! };
//! let report = run_conversion("metadata.json", &opts)?;
//! println!("wrote {} ({} diagnostics)", report.output_path.display(), report.diagnostics.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mapping`]: mapping table model and CSV loading
//! - [`conversion`]: resolution, value conversion, tree building, array expansion, pruning
//! - [`document`]: input loading
//! - [`output`]: output naming and writing
//! - [`pipeline`]: end-to-end runs with observer reporting
//! - [`observability`]: observer trait and implementations

pub mod conversion;
pub mod document;
pub mod error;
pub mod mapping;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod types;

pub use error::{ConversionError, ConversionResult};
