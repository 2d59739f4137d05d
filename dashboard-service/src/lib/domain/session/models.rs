use std::str::FromStr;

use auth::SessionClaims;
use auth::SessionPayload;

use crate::domain::account::models::Credential;
use crate::domain::account::models::CredentialId;
use crate::domain::account::models::Role;
use crate::domain::account::models::Username;

/// Command to log in to one of the account namespaces.
///
/// `username` stays raw: a malformed name must fail exactly like an
/// unknown one.
#[derive(Clone)]
pub struct LoginCommand {
    pub role: Role,
    pub username: String,
    pub password: String,
    pub client_address: String,
}

impl LoginCommand {
    pub fn new(role: Role, username: String, password: String, client_address: String) -> Self {
        Self {
            role,
            username,
            password,
            client_address,
        }
    }

    /// Submitted identity cut one character past the longest valid
    /// username, safe to use in keys and log fields.
    pub fn identity(&self) -> &str {
        match self.username.char_indices().nth(Username::MAX_LENGTH + 1) {
            Some((end, _)) => &self.username[..end],
            None => &self.username,
        }
    }

    /// Lockout bucket: client address, namespace and bounded identity.
    pub fn attempt_key(&self) -> String {
        format!("{}:{}:{}", self.client_address, self.role, self.identity())
    }
}

impl std::fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCommand")
            .field("role", &self.role)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_address", &self.client_address)
            .finish()
    }
}

/// Public identity of a logged-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: CredentialId,
    pub username: String,
    pub role: Role,
}

impl SessionUser {
    pub fn payload(&self) -> SessionPayload {
        SessionPayload::new(self.id, &self.username, self.role)
    }

    /// Rebuild the identity from verified token claims.
    ///
    /// # Returns
    /// None if the claims reference an unknown role or a malformed id
    pub fn from_claims(claims: &SessionClaims) -> Option<Self> {
        Some(Self {
            id: CredentialId::from_string(&claims.sub).ok()?,
            username: claims.username.clone(),
            role: Role::from_str(&claims.role).ok()?,
        })
    }
}

impl From<&Credential> for SessionUser {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            username: credential.username.as_str().to_string(),
            role: credential.role,
        }
    }
}

/// Everything a client receives after a successful login.
#[derive(Debug, Clone)]
pub struct SessionBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
    pub expires_in: u64,
    pub user: SessionUser,
}

/// Result of exchanging a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub access_token: String,
    pub csrf_token: String,
    pub expires_in: u64,
}

/// A verified access token's identity and its bound CSRF token.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: SessionUser,
    pub csrf_token: String,
}
