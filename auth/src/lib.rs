//! Authentication and session-security primitives.
//!
//! Provides the building blocks a service composes into its login,
//! refresh and logout flows:
//! - Password hashing (Argon2id)
//! - Signed access/refresh tokens with revocation
//! - Anti-forgery (CSRF) tokens
//! - Failed-login tracking with sliding-window lockout
//!
//! Nothing here knows about HTTP or storage; services adapt these types
//! behind their own ports.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash));
//! assert!(!hasher.verify("not_my_password", &hash));
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::{CsrfGuard, SessionPayload, TokenConfig, TokenKind, TokenService};
//!
//! let tokens = TokenService::new(b"secret_key_at_least_32_bytes_long!", TokenConfig::default());
//! let csrf = CsrfGuard::new().generate();
//! let payload = SessionPayload::new("user123", "alice", "teacher");
//!
//! let access = tokens.issue_access_token(&payload, &csrf).unwrap();
//! let claims = tokens.verify(&access.token, TokenKind::Access).unwrap();
//! assert_eq!(claims.username, "alice");
//!
//! tokens.blacklist(&access.token);
//! assert!(tokens.verify(&access.token, TokenKind::Access).is_none());
//! ```
//!
//! ## Login Lockout
//! ```
//! use auth::{LockoutPolicy, LoginAttemptTracker};
//!
//! let tracker = LoginAttemptTracker::new(LockoutPolicy::default());
//! for _ in 0..5 {
//!     tracker.record_failure("127.0.0.1:admin:alice");
//! }
//! assert!(tracker.is_locked("127.0.0.1:admin:alice"));
//! ```

pub mod attempts;
pub mod csrf;
pub mod jwt;
pub mod password;
pub mod tokens;

// Re-export commonly used items
pub use attempts::LockoutPolicy;
pub use attempts::LoginAttemptTracker;
pub use csrf::CsrfGuard;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::SessionClaims;
pub use jwt::SessionPayload;
pub use jwt::TokenKind;
pub use password::HashingCost;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use tokens::IssuedToken;
pub use tokens::TokenConfig;
pub use tokens::TokenService;
