/*!
Defines the [IcebergError] and [Result] types.

The engine uses one closed error taxonomy end to end (parsing, schema
evolution, delete application, catalog, commit) so that callers can match
on variant rather than stringly-typed messages.
*/

use thiserror::Error;

/// The closed error taxonomy for the Iceberg metadata engine.
#[derive(Error, Debug)]
pub enum IcebergError {
    /// A namespace, table, snapshot, schema-id, or metadata file was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A namespace, table, or field name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Attempted to drop a namespace that still contains tables.
    #[error("not empty: {0}")]
    NotEmpty(String),

    /// A CAS lost, a `put_if_absent` collided, or a `commit_table` requirement failed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input: bad path, unsupported format-version, invalid literal, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A schema-evolution type change is not in the allowed promotion table.
    #[error("incompatible type change: {from} -> {to}")]
    IncompatibleType {
        /// The source type, rendered for display.
        from: String,
        /// The attempted target type, rendered for display.
        to: String,
    },

    /// Attempted to drop a column referenced by `identifier-field-ids`.
    #[error("field {field_id} ({name}) is an identifier field and cannot be dropped")]
    IdentifierFieldProtected {
        /// The protected field's id.
        field_id: i32,
        /// The protected field's name.
        name: String,
    },

    /// A commit exceeded its retry budget.
    #[error("commit retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of attempts made, including the first.
        attempts: u32,
        /// The error that caused the final attempt to fail.
        last: String,
    },

    /// A mid-commit I/O failure; some files may be orphaned.
    #[error("transaction failed, {} files written, cleanup {}", written_files.len(), if *cleanup_ok { "succeeded" } else { "incomplete" })]
    TransactionFailed {
        /// Paths written before the failure, best-effort.
        written_files: Vec<String>,
        /// Whether `cleanup_on_failure` reclaimed all of `written_files`.
        cleanup_ok: bool,
    },

    /// JSON (de)serialization failure, wrapped verbatim.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Underlying I/O failure, wrapped verbatim.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The backing object store reported a failure.
    #[error("object store error: {0}")]
    Storage(String),
}

impl IcebergError {
    /// True for [IcebergError::Conflict], the only variant the commit retry loop retries on.
    pub fn is_retriable(&self) -> bool {
        matches!(self, IcebergError::Conflict(_))
    }
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, IcebergError>;
