use async_trait::async_trait;

use super::errors::SessionError;
use super::models::AuthenticatedSession;
use super::models::LoginCommand;
use super::models::RefreshedSession;
use super::models::SessionBundle;

/// Port for session lifecycle operations.
#[async_trait]
pub trait SessionServicePort: Send + Sync + 'static {
    /// Authenticate against one account namespace and open a session.
    ///
    /// # Errors
    /// * `RateLimited` - Too many recent failures for this client and identity
    /// * `InvalidCredentials` - Unknown identity or wrong password
    /// * `HashingFailed` - Password verification could not run
    /// * `TokenIssuance` - Token signing failed
    /// * `Repository` - Credential lookup failed
    async fn login(&self, command: LoginCommand) -> Result<SessionBundle, SessionError>;

    /// Mint a new access token and CSRF token from a refresh token.
    ///
    /// The refresh token itself is returned to the caller unchanged.
    ///
    /// # Errors
    /// * `InvalidToken` - Refresh token is invalid, expired or revoked
    /// * `TokenIssuance` - Token signing failed
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedSession, SessionError>;

    /// Revoke the access token, and the refresh token when supplied.
    ///
    /// Idempotent; invalid or already revoked tokens are accepted.
    async fn logout(&self, access_token: &str, refresh_token: Option<&str>);

    /// Resolve an access token into the session it belongs to.
    ///
    /// # Errors
    /// * `Unauthenticated` - Token is missing, malformed, expired or revoked
    async fn current_session(
        &self,
        access_token: &str,
    ) -> Result<AuthenticatedSession, SessionError>;
}
