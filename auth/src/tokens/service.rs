use std::time::Duration;

use chrono::Utc;

use super::blacklist::TokenBlacklist;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::SessionClaims;
use crate::jwt::SessionPayload;
use crate::jwt::TokenKind;

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::from_secs(60 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// A freshly signed token and the number of seconds it stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

/// Issues, verifies and revokes session tokens.
///
/// Verification folds every failure mode (bad signature, expiry, wrong
/// kind, revocation) into `None` so callers cannot tell them apart.
pub struct TokenService {
    jwt_handler: JwtHandler,
    config: TokenConfig,
    blacklist: TokenBlacklist,
}

impl TokenService {
    /// Create a token service signing with `secret`.
    pub fn new(secret: &[u8], config: TokenConfig) -> Self {
        Self {
            jwt_handler: JwtHandler::new(secret),
            config,
            blacklist: TokenBlacklist::new(),
        }
    }

    /// Sign a short-lived access token bound to the session's CSRF token.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed
    pub fn issue_access_token(
        &self,
        payload: &SessionPayload,
        csrf_token: &str,
    ) -> Result<IssuedToken, JwtError> {
        let claims = SessionClaims::issue(payload, TokenKind::Access, self.lifetime(TokenKind::Access))
            .with_csrf(csrf_token);

        self.sign(&claims, self.config.access_ttl)
    }

    /// Sign a long-lived refresh token.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed
    pub fn issue_refresh_token(&self, payload: &SessionPayload) -> Result<IssuedToken, JwtError> {
        let claims =
            SessionClaims::issue(payload, TokenKind::Refresh, self.lifetime(TokenKind::Refresh));

        self.sign(&claims, self.config.refresh_ttl)
    }

    /// Decode `token` if it is a valid, unexpired, unrevoked token of `kind`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Option<SessionClaims> {
        if self.blacklist.contains(token) {
            tracing::debug!(kind = ?kind, "Rejected revoked token");
            return None;
        }

        let claims: SessionClaims = match self.jwt_handler.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(kind = ?kind, error = %e, "Rejected token");
                return None;
            }
        };

        if claims.kind != kind {
            tracing::debug!(expected = ?kind, actual = ?claims.kind, "Rejected token of wrong kind");
            return None;
        }

        Some(claims)
    }

    /// Revoke `token` until it would have expired anyway.
    ///
    /// Retention comes from the token's own `exp` claim, capped at the
    /// refresh lifetime. Unparseable tokens are retained for the full
    /// refresh lifetime; already-expired tokens are not stored at all.
    pub fn blacklist(&self, token: &str) {
        let max_retention = self.config.refresh_ttl;
        let now = Utc::now().timestamp();

        let retain_for = match self.jwt_handler.decode_unverified::<SessionClaims>(token) {
            Ok(claims) if claims.is_expired(now) => return,
            Ok(claims) => {
                let remaining = u64::try_from(claims.exp - now).unwrap_or(0);
                // exp has second granularity, keep one extra second so the
                // entry never disappears before the token stops verifying
                Duration::from_secs(remaining.saturating_add(1)).min(max_retention)
            }
            Err(_) => max_retention,
        };

        self.blacklist.insert(token, retain_for);
    }

    /// Forget revoked tokens that have expired on their own.
    pub fn purge_blacklist(&self) -> usize {
        self.blacklist.purge_expired()
    }

    fn lifetime(&self, kind: TokenKind) -> chrono::Duration {
        let ttl = match kind {
            TokenKind::Access => self.config.access_ttl,
            TokenKind::Refresh => self.config.refresh_ttl,
        };

        chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
    }

    fn sign(&self, claims: &SessionClaims, ttl: Duration) -> Result<IssuedToken, JwtError> {
        let token = self.jwt_handler.encode(claims)?;

        Ok(IssuedToken {
            token,
            expires_in: ttl.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    fn service() -> TokenService {
        TokenService::new(SECRET, TokenConfig::default())
    }

    fn payload() -> SessionPayload {
        SessionPayload::new("8c1f0f7e-4d8e-4a52-9a57-7d0c2c1e9f10", "admin", "admin")
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let service = service();

        let issued = service
            .issue_access_token(&payload(), "csrf-123")
            .expect("Failed to issue token");
        assert_eq!(issued.expires_in, 3600);

        let claims = service
            .verify(&issued.token, TokenKind::Access)
            .expect("Token should verify");
        assert_eq!(claims.payload(), payload());
        assert_eq!(claims.csrf.as_deref(), Some("csrf-123"));
    }

    #[test]
    fn test_refresh_token_lifetime() {
        let service = service();

        let issued = service
            .issue_refresh_token(&payload())
            .expect("Failed to issue token");
        let claims = service
            .verify(&issued.token, TokenKind::Refresh)
            .expect("Token should verify");

        assert_eq!(issued.expires_in, 7 * 24 * 3600);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
        assert!(claims.csrf.is_none());
    }

    #[test]
    fn test_verify_rejects_wrong_kind() {
        let service = service();

        let access = service.issue_access_token(&payload(), "csrf").unwrap();
        let refresh = service.issue_refresh_token(&payload()).unwrap();

        assert!(service.verify(&access.token, TokenKind::Refresh).is_none());
        assert!(service.verify(&refresh.token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_verify_rejects_any_tampered_character() {
        let service = service();
        let token = service.issue_access_token(&payload(), "csrf").unwrap().token;

        for (index, original) in token.char_indices() {
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(index..index + 1, &replacement.to_string());

            assert!(
                service.verify(&tampered, TokenKind::Access).is_none(),
                "tampered token verified after changing position {}",
                index
            );
        }
    }

    #[test]
    fn test_verify_rejects_token_signed_with_other_secret() {
        let other = TokenService::new(b"another_secret_key_at_least_32_bytes", TokenConfig::default());
        let token = other.issue_access_token(&payload(), "csrf").unwrap().token;

        assert!(service().verify(&token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let service = TokenService::new(
            SECRET,
            TokenConfig {
                access_ttl: Duration::from_secs(1),
                refresh_ttl: Duration::from_secs(1),
            },
        );
        let token = service.issue_access_token(&payload(), "csrf").unwrap().token;

        std::thread::sleep(Duration::from_secs(2));

        assert!(service.verify(&token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_blacklisted_token_no_longer_verifies() {
        let service = service();
        let token = service.issue_access_token(&payload(), "csrf").unwrap().token;

        service.blacklist(&token);
        assert!(service.verify(&token, TokenKind::Access).is_none());

        service.blacklist(&token);
        assert!(service.verify(&token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_blacklist_does_not_affect_other_tokens() {
        let service = service();
        let revoked = service.issue_access_token(&payload(), "csrf").unwrap().token;
        let kept = service.issue_access_token(&payload(), "csrf").unwrap().token;

        service.blacklist(&revoked);

        assert!(service.verify(&kept, TokenKind::Access).is_some());
    }

    #[test]
    fn test_blacklist_retention_is_bounded_by_token_expiry() {
        let service = TokenService::new(
            SECRET,
            TokenConfig {
                access_ttl: Duration::from_secs(1),
                refresh_ttl: Duration::from_secs(60),
            },
        );
        let token = service.issue_access_token(&payload(), "csrf").unwrap().token;

        service.blacklist(&token);
        assert_eq!(service.purge_blacklist(), 0);

        std::thread::sleep(Duration::from_millis(2100));

        assert_eq!(service.purge_blacklist(), 1);
    }

    #[test]
    fn test_blacklist_garbage_is_harmless() {
        let service = service();

        service.blacklist("not-a-token");

        assert!(service.verify("not-a-token", TokenKind::Access).is_none());
    }
}
