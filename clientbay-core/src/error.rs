use serde::Serialize;

/// A field-level validation error.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Error taxonomy shared by every core operation.
///
/// `NotFound` deliberately covers both "absent" and "present but outside the
/// caller's tenant scope" so that agency-style endpoints never leak the
/// existence of another tenant's resources. `Forbidden` is reserved for
/// call sites where the URL already implies the resource exists.
pub enum CoreError {
    Unauthenticated,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Validation(Vec<FieldError>),
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn not_found(what: &str) -> Self {
        CoreError::NotFound(format!("{what} not found"))
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Unauthenticated => write!(f, "Authentication required"),
            CoreError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            CoreError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            CoreError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            CoreError::Validation(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            CoreError::Internal(msg) => write!(f, "Internal Error: {msg}"),
        }
    }
}

impl std::fmt::Debug for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for CoreError {}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CoreError::NotFound("resource not found".into()),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<garde::Report> for CoreError {
    fn from(report: garde::Report) -> Self {
        let errors = report
            .iter()
            .map(|(path, error)| FieldError {
                field: path.to_string(),
                message: error.to_string(),
            })
            .collect();
        CoreError::Validation(errors)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}
