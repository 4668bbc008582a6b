//! Error types for the data access layer.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for data layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the data access layer.
#[derive(Debug)]
pub enum DataError {
    /// Migration execution failed.
    MigrationFailed {
        /// Underlying migration error.
        source: sqlx::migrate::MigrateError,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// The register holds a status string outside the known lifecycle.
    InvalidStatus {
        /// Tape whose row was read.
        tape: String,
        /// Stored value.
        value: String,
    },
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MigrationFailed { .. } => formatter.write_str("migration failed"),
            Self::QueryFailed { .. } => formatter.write_str("database operation failed"),
            Self::InvalidStatus { .. } => formatter.write_str("stored tape status is invalid"),
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MigrationFailed { source } => Some(source),
            Self::QueryFailed { source, .. } => Some(source),
            Self::InvalidStatus { .. } => None,
        }
    }
}

impl DataError {
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::QueryFailed { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_display_and_source() {
        let migration = DataError::MigrationFailed {
            source: sqlx::migrate::MigrateError::VersionMissing(1),
        };
        assert_eq!(migration.to_string(), "migration failed");
        assert!(migration.source().is_some());

        let query = DataError::query("fetch_tape_status")(sqlx::Error::RowNotFound);
        assert_eq!(query.to_string(), "database operation failed");
        assert!(query.source().is_some());

        let status = DataError::InvalidStatus {
            tape: "T00001".into(),
            value: "archived".into(),
        };
        assert_eq!(status.to_string(), "stored tape status is invalid");
        assert!(status.source().is_none());
    }
}
