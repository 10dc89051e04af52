//! Error types for Gestioneau

use thiserror::Error;

/// Result type alias using Gestioneau's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Gestioneau error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Caller errors (E001-E099)
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Unknown resource '{0}'. Run `gestioneau entities` to see all resources.")]
    UnknownResource(String),

    // Store errors (E400-E499)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Search mirror errors (E500-E599)
    #[error("Search index error: {0}")]
    SearchError(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Serialization errors (E700-E799)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Unexpected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "E001",
            Self::NotFound { .. } => "E002",
            Self::UnknownResource(_) => "E003",
            Self::ConstraintViolation(_) => "E400",
            Self::DatabaseError(_) => "E401",
            Self::SearchError(_) => "E500",
            Self::ConfigError(_) => "E600",
            Self::Serialization(_) => "E700",
            Self::Unexpected(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::UnknownResource(_) => Some("gestioneau entities".to_string()),
            Self::SearchError(_) => Some("gestioneau reindex".to_string()),
            Self::ConfigError(_) => Some("gestioneau config list".to_string()),
            _ => None,
        }
    }

    /// True when the error is the store rejecting a write
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            use sqlx::error::ErrorKind;
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return Self::ConstraintViolation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        Self::DatabaseError(err)
    }
}
