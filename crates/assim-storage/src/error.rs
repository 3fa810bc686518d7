use crate::messages::Messages;
use http::StatusCode;
use thiserror::Error;
use tracing::error;

/// Storage-specific error types for the HR store.
///
/// Every repository call returns one of these. Callers branch on
/// [`StorageError::kind`] rather than on the variant itself.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Entity not found in database
    #[error("Entity not found: {entity_type} with {field}={value}")]
    NotFound {
        entity_type: String,
        field: String,
        value: String,
    },

    /// Input rejected before touching the store
    #[error("{0}")]
    Validation(String),

    /// Uniqueness or referential integrity violation
    #[error("{0}")]
    Conflict(String),

    /// Store unreachable after every retry
    #[error("Connection failed after {attempts} attempts: {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A column could not be read as the expected type
    #[error("Cannot decode column {column}: {message}")]
    Decode { column: String, message: String },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`StorageError`], one per outcome a caller handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Connection,
    Internal,
}

impl ErrorKind {
    /// HTTP status an API layer answers with.
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Connection => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl StorageError {
    pub fn not_found(entity_type: &str, id: i64) -> Self {
        StorageError::NotFound {
            entity_type: entity_type.to_string(),
            field: "id".to_string(),
            value: id.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Validation(_) => ErrorKind::Validation,
            StorageError::Conflict(_) => ErrorKind::Conflict,
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Connection { .. } => ErrorKind::Connection,
            StorageError::Database(sqlx::Error::PoolTimedOut)
            | StorageError::Database(sqlx::Error::Io(_)) => ErrorKind::Connection,
            StorageError::Database(_)
            | StorageError::Migration(_)
            | StorageError::Configuration(_)
            | StorageError::Decode { .. }
            | StorageError::Internal(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Message safe to show an end user.
    ///
    /// Internal failures are logged here and replaced by a generic text.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::Conflict => self.to_string(),
            ErrorKind::NotFound => match self {
                StorageError::NotFound { entity_type, .. } => Messages::not_found(entity_type),
                other => other.to_string(),
            },
            ErrorKind::Connection => {
                error!("Database unavailable: {}", self);
                Messages::DATABASE_UNAVAILABLE.to_string()
            }
            ErrorKind::Internal => {
                error!("Internal storage error: {}", self);
                Messages::INTERNAL_ERROR.to_string()
            }
        }
    }
}

impl From<assim_core::Error> for StorageError {
    fn from(err: assim_core::Error) -> Self {
        StorageError::Validation(err.to_string())
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Rewrites integrity violations reported by the driver as [`StorageError::Conflict`].
pub(crate) trait ConflictExt<T> {
    /// `unique` is used for unique-key violations, `foreign_key` for FK violations.
    fn or_conflict(self, unique: &str, foreign_key: &str) -> StorageResult<T>;
}

impl<T> ConflictExt<T> for StorageResult<T> {
    fn or_conflict(self, unique: &str, foreign_key: &str) -> StorageResult<T> {
        self.map_err(|err| match err {
            StorageError::Database(sqlx::Error::Database(db_err)) => {
                if db_err.is_unique_violation() {
                    StorageError::Conflict(unique.to_string())
                } else if db_err.is_foreign_key_violation() {
                    StorageError::Conflict(foreign_key.to_string())
                } else {
                    StorageError::Database(sqlx::Error::Database(db_err))
                }
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StorageError::Validation("CPF inválido".into()), ErrorKind::Validation, 400)]
    #[case(StorageError::Conflict("CPF já cadastrado".into()), ErrorKind::Conflict, 409)]
    #[case(StorageError::not_found("Cargo", 7), ErrorKind::NotFound, 404)]
    #[case(
        StorageError::Connection { attempts: 3, source: sqlx::Error::PoolTimedOut },
        ErrorKind::Connection,
        503
    )]
    #[case(StorageError::Database(sqlx::Error::RowNotFound), ErrorKind::Internal, 500)]
    #[case(StorageError::Configuration("bad".into()), ErrorKind::Internal, 500)]
    fn test_kind_and_status(#[case] err: StorageError, #[case] kind: ErrorKind, #[case] status: u16) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.status_code().as_u16(), status);
    }

    #[test]
    fn test_public_message_hides_internal_details() {
        let err = StorageError::Internal("secret table layout".into());
        assert_eq!(err.public_message(), Messages::INTERNAL_ERROR);

        let err = StorageError::Conflict(Messages::DUPLICATE_CPF.into());
        assert_eq!(err.public_message(), "CPF já cadastrado");

        assert_eq!(StorageError::not_found("Cargo", 1).public_message(), "Cargo não encontrado");
    }

    #[test]
    fn test_core_error_becomes_validation() {
        let err: StorageError = assim_core::Error::InvalidCpf.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "CPF inválido");
    }

    #[test]
    fn test_or_conflict_passes_other_errors_through() {
        let result: StorageResult<()> = Err(StorageError::Database(sqlx::Error::RowNotFound));
        let err = result.or_conflict("dup", "fk").unwrap_err();
        assert!(matches!(err, StorageError::Database(sqlx::Error::RowNotFound)));
    }
}
