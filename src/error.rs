use thiserror::Error;

/// Convenience result type for loading, the conversion pipeline and output writing.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Error type returned by everything that can abort a conversion.
///
/// Field-level problems never end up here: they are reported as
/// [`crate::conversion::Diagnostic`]s and the conversion carries on.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Mapping table CSV error.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Input document could not be parsed, or output could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The mapping table header lacks a column required by its layout.
    #[error("missing required column: {column}. headers={headers:?}")]
    MissingColumn { column: String, headers: Vec<String> },

    /// The input document does not have the expected shape.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}
