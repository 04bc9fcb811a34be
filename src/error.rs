use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failures of the auth-service boundary. These are shown to the user, so each one
/// carries a display message through `user_message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    AlreadyExists,
    #[error("unexpected auth failure: {0}")]
    Unexpected(String),
}

impl AuthError {
    /// The message shown on the login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password. Please try again.",
            AuthError::AlreadyExists => {
                "An account with this email already exists. Please login instead."
            }
            AuthError::Unexpected(_) => "An unexpected error occurred. Please try again.",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AlreadyExists => StatusCode::CONFLICT,
            AuthError::Unexpected(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Unexpected(detail) = &self {
            tracing::error!(%detail, "auth provider failure");
        }
        (self.status(), Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Outcome of a profile lookup or creation that did not yield a profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// No row yet. Expected for a brand-new user whose profile insert has not landed.
    #[error("profile not found")]
    NotFound,
    #[error("profile already exists")]
    AlreadyExists,
    #[error("unexpected store failure: {0}")]
    Unexpected(String),
}

impl From<FetchError> for AuthError {
    /// Profile creation during signup: a conflicting row means the account exists.
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::AlreadyExists => AuthError::AlreadyExists,
            other => AuthError::Unexpected(other.to_string()),
        }
    }
}

/// Errors at the table-store seam.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A unique or primary-key constraint rejected the write.
    #[error("record already exists")]
    Conflict,
    /// The write was rejected before or by a check constraint.
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    /// Maps unique violations to `Conflict` and check violations to `Invalid`.
    pub fn classify(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict,
            sqlx::Error::Database(db) if db.is_check_violation() => {
                RepoError::Invalid(db.message().to_string())
            }
            _ => RepoError::Database(err),
        }
    }
}

impl IntoResponse for RepoError {
    fn into_response(self) -> Response {
        match self {
            RepoError::Conflict => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Record already exists." })),
            )
                .into_response(),
            RepoError::Invalid(detail) => {
                tracing::debug!(%detail, "write rejected");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": detail }))).into_response()
            }
            RepoError::Database(e) => {
                tracing::error!(error = ?e, "database write failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "An unexpected error occurred. Please try again." })),
                )
                    .into_response()
            }
        }
    }
}

/// Startup configuration problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}
