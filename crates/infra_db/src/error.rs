//! Database error types
//!
//! SQLx failures are classified by PostgreSQL SQLSTATE into
//! [`DatabaseError`] and then lowered into the [`PortError`] taxonomy the
//! domain crates understand.

use std::str::FromStr;

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Exclusion constraint violation, raised by overlapping tariff periods
    #[error("Overlapping effective period: {0}")]
    PeriodOverlap(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("HmoClaim", "CLM-123");
    /// assert!(error.to_string().contains("HmoClaim"));
    /// ```
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
                | DatabaseError::PeriodOverlap(_)
        )
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

/// Maps SQLx errors to DatabaseError variants by PostgreSQL error code
///
/// <https://www.postgresql.org/docs/current/errcodes-appendix.html>
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::not_found("Record", "row"),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::SerializationError(error.to_string())
            }
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    Some("23P01") => DatabaseError::PeriodOverlap(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::NotFound { entity_type: entity, id },
            DatabaseError::DuplicateEntry(message) | DatabaseError::PeriodOverlap(message) => {
                PortError::Conflict { message }
            }
            DatabaseError::ForeignKeyViolation(message) | DatabaseError::ConstraintViolation(message) => {
                PortError::validation(message)
            }
            DatabaseError::ConnectionFailed(message) => PortError::connection(message),
            DatabaseError::PoolExhausted => PortError::connection("Connection pool exhausted"),
            DatabaseError::SerializationError(message) => PortError::transformation(message),
            other => PortError::Internal {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

/// Lowers a SQLx error straight into a port error
pub(crate) fn db_err(error: sqlx::Error) -> PortError {
    DatabaseError::from(error).into()
}

/// Parses a TEXT enum column
pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, PortError>
where
    T: FromStr,
{
    value
        .parse()
        .map_err(|_| PortError::transformation(format!("Unexpected {} value: {}", column, value)))
}

/// Decodes a JSON document stored in a TEXT column
pub(crate) fn decode_json<T>(value: &str, column: &str) -> Result<T, PortError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(value)
        .map_err(|e| PortError::transformation(format!("Malformed {} document: {}", column, e)))
}

/// Encodes a value as a JSON document for a TEXT column
pub(crate) fn encode_json<T>(value: &T, column: &str) -> Result<String, PortError>
where
    T: serde::Serialize,
{
    serde_json::to_string(value)
        .map_err(|e| PortError::transformation(format!("Cannot encode {}: {}", column, e)))
}

/// Reads a non-negative INTEGER column into a count
pub(crate) fn to_count(value: i32, column: &str) -> Result<u32, PortError> {
    u32::try_from(value)
        .map_err(|_| PortError::transformation(format!("Negative {}: {}", column, value)))
}

/// Prepares a count for an INTEGER column
pub(crate) fn from_count(value: u32, column: &str) -> Result<i32, PortError> {
    i32::try_from(value)
        .map_err(|_| PortError::validation_field(format!("{} is too large", value), column))
}
