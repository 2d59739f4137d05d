use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Identity carried by every session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPayload {
    pub subject_id: String,
    pub username: String,
    pub role: String,
}

impl SessionPayload {
    pub fn new(subject_id: impl ToString, username: impl ToString, role: impl ToString) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
        }
    }
}

/// Distinguishes short-lived access tokens from long-lived refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims for a dashboard session.
///
/// Standard RFC 7519 claims (`sub`, `iat`, `exp`, `jti`) plus the session
/// identity. Access tokens also carry the anti-forgery token issued with
/// them; refresh tokens never do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Subject (credential identifier)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Unique token identifier, keeps two tokens issued in the same second distinct
    pub jti: String,

    pub username: String,

    pub role: String,

    #[serde(rename = "typ")]
    pub kind: TokenKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf: Option<String>,
}

impl SessionClaims {
    /// Create claims expiring `lifetime` from now.
    pub fn issue(payload: &SessionPayload, kind: TokenKind, lifetime: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + lifetime;

        Self {
            sub: payload.subject_id.clone(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            username: payload.username.clone(),
            role: payload.role.clone(),
            kind,
            csrf: None,
        }
    }

    /// Bind an anti-forgery token to these claims.
    pub fn with_csrf(mut self, csrf: impl ToString) -> Self {
        self.csrf = Some(csrf.to_string());
        self
    }

    /// Session identity without the token bookkeeping.
    pub fn payload(&self) -> SessionPayload {
        SessionPayload {
            subject_id: self.sub.clone(),
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }

    /// Check if token is expired.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }
}
