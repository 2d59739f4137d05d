use std::time::Duration;

use auth::JwtError;
use thiserror::Error;

/// Failures of the login, refresh and logout flows.
///
/// `InvalidCredentials` and `Unauthenticated` deliberately carry no detail
/// about which check failed.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many failed login attempts")]
    RateLimited { retry_after: Duration },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid or expired refresh token")]
    InvalidToken,

    // Internal faults, logged and never shown to the caller
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),

    #[error("Credential store error: {0}")]
    Repository(String),
}

impl From<JwtError> for SessionError {
    fn from(err: JwtError) -> Self {
        SessionError::TokenIssuance(err.to_string())
    }
}
