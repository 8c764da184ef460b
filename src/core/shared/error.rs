use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Error type shared by the engines and the web layer.
///
/// HTML rendering lives in `crate::web::error`; engines only decide which
/// variant a failure is.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Connection error: {0}")]
    Pool(String),
    #[error("Document error: {0}")]
    Pdf(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        Self::Forbidden(why.into())
    }

    /// Message safe to show to an end user.
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::Validation(msg) => msg.clone(),
            Self::Unauthenticated => "Please log in to continue.".to_string(),
            Self::Database(_) | Self::Pool(_) | Self::Pdf(_) | Self::Internal(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Pool(_) | Self::Pdf(_) | Self::Internal(_)
        )
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound("Object not found".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::Conflict(info.message().to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        let err: AppError = DieselError::NotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.public_message(), "Object not found");
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::Database("relation \"users\" does not exist".to_string());
        assert!(err.is_server_error());
        assert!(!err.public_message().contains("relation"));
    }

    #[test]
    fn test_client_errors_keep_message() {
        let err = AppError::Conflict("You are already enrolled in this course.".to_string());
        assert!(!err.is_server_error());
        assert_eq!(err.public_message(), "You are already enrolled in this course.");
    }
}
