//! End-to-end conversion of one metadata file.
//!
//! [`run_conversion`] loads the mapping table, reads the input document, converts it, writes the
//! output file and reports to the configured [`ConversionObserver`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::conversion::{convert, ConversionOptions, ConversionStats, Diagnostic};
use crate::document::load_document_from_path;
use crate::error::{ConversionError, ConversionResult};
use crate::mapping::{load_mapping_from_path, MappingTable};
use crate::observability::{ConversionContext, ConversionObserver, Severity};
use crate::output::{output_file_name, write_output};
use crate::types::Object;

/// Where the mapping table comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MappingSource {
    /// The table compiled into the library.
    #[default]
    Embedded,
    /// A CSV file in either layout.
    Path(PathBuf),
}

impl MappingSource {
    pub fn load(&self) -> ConversionResult<MappingTable> {
        match self {
            Self::Embedded => MappingTable::embedded(),
            Self::Path(path) => load_mapping_from_path(path),
        }
    }
}

impl fmt::Display for MappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options controlling a pipeline run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    pub mapping: MappingSource,
    /// Output file name; see [`output_file_name`].
    pub output_name: Option<String>,
    /// Directory the output file is written to. `None` means the working directory.
    pub output_dir: Option<PathBuf>,
    pub conversion: ConversionOptions,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ConversionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("mapping", &self.mapping)
            .field("output_name", &self.output_name)
            .field("output_dir", &self.output_dir)
            .field("conversion", &self.conversion)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mapping: MappingSource::Embedded,
            output_name: None,
            output_dir: None,
            conversion: ConversionOptions::default(),
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    pub document: Object,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ConversionStats,
}

/// Convert the metadata file at `input` and write the result.
///
/// When an observer is configured, this function reports:
///
/// - `on_diagnostic` for every field-level diagnostic
/// - `on_success` once the output file is written
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// ```no_run
/// use std::sync::Arc;
///
/// use oscem_converter::observability::{Severity, StdErrObserver};
/// use oscem_converter::pipeline::{run_conversion, PipelineOptions};
///
/// # fn main() -> Result<(), oscem_converter::ConversionError> {
/// let opts = PipelineOptions {
///     output_name: Some("session".to_string()),
///     observer: Some(Arc::new(StdErrObserver)),
///     alert_at_or_above: Severity::Error,
///     ..Default::default()
/// };
/// let report = run_conversion("metadata.json", &opts)?;
/// println!("Extracted data was written to: {}", report.output_path.display());
/// # Ok(())
/// # }
/// ```
pub fn run_conversion(input: impl AsRef<Path>, options: &PipelineOptions) -> ConversionResult<ConversionReport> {
    let input = input.as_ref();
    let ctx = ConversionContext {
        input: input.to_path_buf(),
        mapping: options.mapping.to_string(),
    };

    let result = run_inner(input, options, &ctx);

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(report) => obs.on_success(&ctx, report.stats),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

fn run_inner(input: &Path, options: &PipelineOptions, ctx: &ConversionContext) -> ConversionResult<ConversionReport> {
    let table = options.mapping.load()?;
    let document = load_document_from_path(input)?;
    tracing::debug!(
        input = %input.display(),
        keys = document.len(),
        rules = table.rules.len(),
        "loaded input and mapping"
    );

    let output = convert(&table, &document, &options.conversion);
    if let Some(obs) = options.observer.as_ref() {
        for diagnostic in &output.diagnostics {
            obs.on_diagnostic(ctx, diagnostic);
        }
    }

    let name = output_file_name(options.output_name.as_deref());
    let path = match &options.output_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    };
    let output_path = write_output(&output, &path)?;

    Ok(ConversionReport {
        output_path,
        document: output.document,
        diagnostics: output.diagnostics,
        stats: output.stats,
    })
}

/// Severity of a pipeline failure: I/O problems are critical, everything else is an error.
pub fn severity_for_error(e: &ConversionError) -> Severity {
    match e {
        ConversionError::Io(_) => Severity::Critical,
        ConversionError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        ConversionError::Json(err) if err.is_io() => Severity::Critical,
        ConversionError::Json(_) | ConversionError::MissingColumn { .. } | ConversionError::InvalidInput { .. } => {
            Severity::Error
        }
    }
}

/// Owned request object, for callers that queue conversions.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub options: PipelineOptions,
}

impl ConversionRequest {
    /// Execute the request by calling [`run_conversion`].
    pub fn run(&self) -> ConversionResult<ConversionReport> {
        run_conversion(&self.input, &self.options)
    }
}
