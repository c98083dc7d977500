//! CSV mapping table loading.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ConversionError, ConversionResult};

use super::rule::{DeclaredType, MappingRule, SourceTier, TargetPath};
use super::MappingTable;

/// Column layout of a mapping table, detected from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// One source tier: `oscem, fromformat, optionals, units, crunch, type`.
    Simplified,
    /// Two source tiers (mdoc first, then xml).
    Full,
}

impl TableLayout {
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Simplified => &["oscem", "fromformat", "optionals", "units", "crunch", "type"],
            Self::Full => &[
                "oscem",
                "fromxml",
                "frommdoc",
                "optionals_mdoc",
                "units",
                "crunchfromxml",
                "crunchfrommdoc",
                "optionals_xml",
                "type",
            ],
        }
    }

    fn detect(columns: &HashMap<String, usize>) -> Self {
        if columns.contains_key("fromformat") {
            Self::Simplified
        } else {
            Self::Full
        }
    }
}

/// Load a mapping table from a CSV file.
///
/// Rules:
///
/// - The CSV must have a header row; column order does not matter.
/// - Column names are matched case-insensitively after trimming whitespace and a UTF-8 BOM.
/// - A header containing `fromformat` uses the simplified layout, anything else the full one.
/// - Missing required columns is an error; rows with unusable target paths are skipped.
pub fn load_mapping_from_path(path: impl AsRef<Path>) -> ConversionResult<MappingTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    load_mapping_from_reader(&mut rdr)
}

/// Load a mapping table from CSV text.
pub fn load_mapping_from_str(input: &str) -> ConversionResult<MappingTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());
    load_mapping_from_reader(&mut rdr)
}

/// Load a mapping table from an existing CSV reader.
pub fn load_mapping_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
) -> ConversionResult<MappingTable> {
    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();

    let mut columns = HashMap::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        columns.entry(name.clone()).or_insert(idx);
    }

    let layout = TableLayout::detect(&columns);
    for &column in layout.required_columns() {
        if !columns.contains_key(column) {
            return Err(ConversionError::MissingColumn {
                column: column.to_string(),
                headers,
            });
        }
    }

    let mut rules = Vec::new();
    let mut skipped = 0usize;
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based, header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;
        let cell = |name: &str| {
            columns
                .get(name)
                .and_then(|&idx| record.get(idx))
                .unwrap_or("")
                .trim()
                .to_string()
        };

        let oscem = cell("oscem");
        let target = match TargetPath::parse(&oscem) {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(row = user_row, error = %err, "skipping mapping row");
                skipped += 1;
                continue;
            }
        };

        let tiers = match layout {
            TableLayout::Simplified => [
                SourceTier {
                    primary: cell("fromformat"),
                    alternate: cell("optionals"),
                    unit_factor: cell("crunch"),
                },
                SourceTier::default(),
            ],
            TableLayout::Full => [
                SourceTier {
                    primary: cell("frommdoc"),
                    alternate: cell("optionals_mdoc"),
                    unit_factor: cell("crunchfrommdoc"),
                },
                SourceTier {
                    primary: cell("fromxml"),
                    alternate: cell("optionals_xml"),
                    unit_factor: cell("crunchfromxml"),
                },
            ],
        };

        rules.push(MappingRule {
            target,
            tiers,
            unit: cell("units"),
            declared_type: DeclaredType::parse(&cell("type")),
        });
    }

    tracing::debug!(?layout, rules = rules.len(), skipped, "loaded mapping table");
    Ok(MappingTable { layout, rules, skipped })
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').trim().to_ascii_lowercase()
}
