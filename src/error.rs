use thiserror::Error;

/// Convenience result type for migration operations.
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error type shared across sniffing, storage, loading and reconciliation.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Process configuration is missing or invalid.
    #[error("config error: {message}")]
    Config { message: String },

    /// Object storage could not serve the requested object.
    #[error("storage error for {bucket}/{key}: {message}")]
    Storage {
        bucket: String,
        key: String,
        message: String,
    },

    /// The document store could not be reached.
    #[error("document store unreachable at '{uri}': {message}")]
    StoreUnreachable { uri: String, message: String },

    /// The document store rejected an operation.
    #[error("document store error: {message}")]
    Store { message: String },

    /// The payload is not a valid enveloped-JSON export.
    #[error("envelope error: {message}")]
    Envelope { message: String },

    /// A delimited payload did not yield a usable table for a delimiter candidate.
    #[error("delimited parse error: {message}")]
    Delimited { message: String },

    /// No format candidate could parse the payload.
    #[error("cannot parse {key}: {reasons}")]
    Unparseable { key: String, reasons: String },

    /// Every row had at least one missing value.
    #[error("all {rows} rows contain missing values")]
    AllRowsMissing { rows: usize },

    /// Collection names could not be derived for the configured source keys.
    #[error("naming error: {message}")]
    Naming { message: String },
}
