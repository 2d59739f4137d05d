use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

const TOKEN_LENGTH: usize = 48;

/// Anti-forgery tokens for state-changing requests.
///
/// Tokens are random strings from the OS RNG and share nothing with the
/// session's access or refresh tokens. Storage and rotation belong to the
/// caller; the guard only generates and compares.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfGuard;

impl CsrfGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    /// True only when both tokens are present and identical.
    pub fn verify(&self, supplied: &str, expected: &str) -> bool {
        if supplied.is_empty() || expected.is_empty() {
            return false;
        }

        if supplied.len() != expected.len() {
            return false;
        }

        supplied
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_distinct_tokens() {
        let guard = CsrfGuard::new();

        let first = guard.generate();
        let second = guard.generate();

        assert_eq!(first.len(), TOKEN_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_exact_match() {
        let guard = CsrfGuard::new();
        let token = guard.generate();

        assert!(guard.verify(&token, &token.clone()));
        assert!(!guard.verify(&token, &guard.generate()));
        assert!(!guard.verify("abc", "abd"));
        assert!(!guard.verify("abc", "abcd"));
        assert!(!guard.verify("ABC", "abc"));
    }

    #[test]
    fn test_verify_rejects_missing_side() {
        let guard = CsrfGuard::new();

        assert!(!guard.verify("", ""));
        assert!(!guard.verify("token", ""));
        assert!(!guard.verify("", "token"));
    }
}
