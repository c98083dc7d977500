//! Output naming and writing.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::conversion::ConversionOutput;
use crate::error::ConversionResult;

const EXTENSION: &str = ".json";
const FALLBACK_STEM: &str = "output";

/// Resolve the output file name.
///
/// An explicit name gets `.json` appended unless it already contains `.json`. Without one, the
/// base name of the current working directory is used.
///
/// ```
/// use oscem_converter::output::output_file_name;
///
/// assert_eq!(output_file_name(Some("run42")), "run42.json");
/// assert_eq!(output_file_name(Some("run42.json")), "run42.json");
/// assert_eq!(output_file_name(Some("run42.json.bak")), "run42.json.bak");
/// ```
pub fn output_file_name(explicit: Option<&str>) -> String {
    match explicit {
        Some(name) if !name.is_empty() => with_extension(name),
        _ => {
            let stem = env::current_dir()
                .ok()
                .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| FALLBACK_STEM.to_string());
            with_extension(&stem)
        }
    }
}

fn with_extension(name: &str) -> String {
    if name.contains(EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{EXTENSION}")
    }
}

/// Write `output` as pretty JSON to `path`, returning the path written.
pub fn write_output(output: &ConversionOutput, path: impl AsRef<Path>) -> ConversionResult<PathBuf> {
    let path = path.as_ref();
    fs::write(path, output.to_json_pretty()?)?;
    tracing::debug!(path = %path.display(), "wrote output document");
    Ok(path.to_path_buf())
}
