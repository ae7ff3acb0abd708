use crate::{auth::AuthError, db::dao::DaoLayerError};

/// Message returned for every refresh/logout-all failure; the kind is only logged.
pub const TOKEN_REJECTED: &str = "Invalid or expired token";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Internal(message) => message.as_str(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<DaoLayerError> for AppError {
    fn from(err: DaoLayerError) -> Self {
        match err {
            DaoLayerError::NotFound { .. } => AppError::not_found(err.to_string()),
            DaoLayerError::Db(db_err) => {
                tracing::error!(error = %db_err, "database operation failed");
                AppError::internal("database operation failed")
            }
        }
    }
}

// Every taxonomy kind collapses to one 401 so callers cannot tell them apart.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::unauthorized(INVALID_CREDENTIALS),
            AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::TokenRevoked
            | AuthError::TokenReused => AppError::unauthorized(TOKEN_REJECTED),
            AuthError::Storage(err) => err.into(),
            AuthError::Signing(reason) => {
                tracing::error!(%reason, "token signing failed");
                AppError::internal("token issuance failed")
            }
        }
    }
}
