//! Error handling for the GolemDB SQL adapter.
//!
//! All components share a single error type classified into the canonical
//! DB-adapter hierarchy. The classification (`ErrorKind`) is what callers
//! embedding the adapter behind a generic database interface switch on; the
//! variants carry the context useful for debugging.

use std::fmt;

use thiserror::Error;

/// DB-adapter error categories.
///
/// These mirror the classic database-driver exception hierarchy and are
/// stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Problems with the adapter interface itself: malformed connection
    /// parameters, use of a closed handle, unsupported parameter style.
    Interface,
    /// Errors in the SQL sent by the caller: parse failures, unknown tables
    /// or columns, type mismatches against the catalog.
    Programming,
    /// Values that violate a declared column type: integer overflow, DECIMAL
    /// precision/scale violations, VARCHAR overflow, pre-epoch timestamps.
    Data,
    /// SQL constructs the adapter cannot translate to the backing store.
    NotSupported,
    /// Constraint violations the adapter itself detected. Detection is
    /// best-effort and never promised.
    Integrity,
    /// Backing-store failures: RPC errors, timeouts.
    Operational,
    /// Bugs and corruption: catalog file damage, codec invariant violations.
    Internal,
}

impl ErrorKind {
    /// Canonical exception-class name for this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Interface => "InterfaceError",
            ErrorKind::Programming => "ProgrammingError",
            ErrorKind::Data => "DataError",
            ErrorKind::NotSupported => "NotSupportedError",
            ErrorKind::Integrity => "IntegrityError",
            ErrorKind::Operational => "OperationalError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The unified error type for all adapter operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Malformed or incomplete connection parameters.
    #[error("invalid connection parameters: {message}")]
    InvalidConnection {
        /// What was wrong.
        message: String,
    },

    /// Operation attempted on a closed connection or cursor.
    #[error("{handle} is closed")]
    Closed {
        /// Which handle was used.
        handle: &'static str,
    },

    /// Parameter style or binding problem.
    #[error("parameter error: {message}")]
    Parameter {
        /// What was wrong.
        message: String,
    },

    /// SQL could not be parsed.
    #[error("failed to parse SQL: {message}")]
    ParseFailure {
        /// Parser diagnostic.
        message: String,
    },

    /// Referenced table does not exist in the catalog.
    #[error("table '{table}' not found")]
    TableNotFound {
        /// The missing table.
        table: String,
    },

    /// Table already exists.
    #[error("table '{table}' already exists")]
    TableExists {
        /// The duplicate table.
        table: String,
    },

    /// Referenced column does not exist.
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// The missing column.
        column: String,
        /// The table searched.
        table: String,
    },

    /// A literal does not fit the declared column type.
    #[error("type mismatch for column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Column being assigned or compared.
        column: String,
        /// Declared SQL type.
        expected: String,
        /// What the statement supplied.
        actual: String,
    },

    /// Value violates the declared type's range or length constraints.
    #[error("{message}")]
    ValueOutOfRange {
        /// Constraint description.
        message: String,
    },

    /// SQL construct the adapter does not translate.
    #[error("not supported: {operation}")]
    NotSupported {
        /// The unsupported construct.
        operation: String,
    },

    /// Constraint violation detected after the fact.
    #[error("integrity violation: {message}")]
    Integrity {
        /// Violation description.
        message: String,
    },

    /// Backing-store RPC call failed.
    #[error("backing store error: {message}")]
    Rpc {
        /// Original error message, preserved verbatim.
        message: String,
    },

    /// Backing-store call exceeded its timeout.
    #[error("timeout after {duration_ms}ms")]
    Timeout {
        /// Configured timeout.
        duration_ms: u64,
    },

    /// The persisted catalog could not be read or written.
    #[error("catalog error for schema '{schema_id}': {message}")]
    Catalog {
        /// Schema whose file was touched.
        schema_id: String,
        /// Underlying failure.
        message: String,
    },

    /// Internal invariant violation. Indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Diagnostic.
        message: String,
    },
}

impl DbError {
    /// Classifies this error into the DB-adapter hierarchy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConnection { .. } | Self::Closed { .. } | Self::Parameter { .. } => {
                ErrorKind::Interface
            }
            Self::ParseFailure { .. }
            | Self::TableNotFound { .. }
            | Self::TableExists { .. }
            | Self::ColumnNotFound { .. }
            | Self::TypeMismatch { .. } => ErrorKind::Programming,
            Self::ValueOutOfRange { .. } => ErrorKind::Data,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Rpc { .. } | Self::Timeout { .. } => ErrorKind::Operational,
            Self::Catalog { .. } | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// True if a read operation that failed with this error may be retried.
    ///
    /// Writes are never retried regardless; the store has no idempotency
    /// tokens.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Rpc { .. })
    }

    /// Creates a data error from a constraint description.
    #[must_use]
    pub fn data(message: impl Into<String>) -> Self {
        Self::ValueOutOfRange {
            message: message.into(),
        }
    }

    /// Creates a not-supported error.
    #[must_use]
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result alias used across the adapter.
pub type DbResult<T> = std::result::Result<T, DbError>;
