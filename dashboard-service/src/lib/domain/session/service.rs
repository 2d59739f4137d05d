use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::CsrfGuard;
use auth::LoginAttemptTracker;
use auth::PasswordHasher;
use auth::TokenKind;
use auth::TokenService;
use tokio::task::JoinHandle;

use super::errors::SessionError;
use super::models::AuthenticatedSession;
use super::models::LoginCommand;
use super::models::RefreshedSession;
use super::models::SessionBundle;
use super::models::SessionUser;
use super::ports::SessionServicePort;
use crate::domain::account::models::Credential;
use crate::domain::account::models::Username;
use crate::domain::account::ports::CredentialRepository;

const DUMMY_PASSWORD: &str = "unknown-identity-placeholder";

/// Session orchestrator.
///
/// Composes the lockout tracker, password verification, token issuance and
/// CSRF generation into the login, refresh and logout flows. The tracker and
/// token service hold process-wide state and are shared with the cleanup
/// task through `Arc`.
pub struct SessionService<CR>
where
    CR: CredentialRepository,
{
    repository: Arc<CR>,
    password_hasher: Arc<PasswordHasher>,
    token_service: Arc<TokenService>,
    attempts: Arc<LoginAttemptTracker>,
    csrf_guard: CsrfGuard,
    dummy_hash: String,
}

impl<CR> SessionService<CR>
where
    CR: CredentialRepository,
{
    pub fn new(
        repository: Arc<CR>,
        password_hasher: Arc<PasswordHasher>,
        token_service: Arc<TokenService>,
        attempts: Arc<LoginAttemptTracker>,
    ) -> Self {
        let dummy_hash = password_hasher
            .hash(DUMMY_PASSWORD)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Could not prepare hash for unknown-user checks");
                String::new()
            });

        Self {
            repository,
            password_hasher,
            token_service,
            attempts,
            csrf_guard: CsrfGuard::new(),
            dummy_hash,
        }
    }

    /// Drop expired lockout records and blacklist entries.
    ///
    /// # Returns
    /// (attempt records removed, blacklist entries removed)
    pub fn purge_expired(&self) -> (usize, usize) {
        (
            self.attempts.purge_expired(),
            self.token_service.purge_blacklist(),
        )
    }

    async fn find_credential(
        &self,
        command: &LoginCommand,
    ) -> Result<Option<Credential>, SessionError> {
        // A name that could never have been registered is just an unknown user.
        let Ok(username) = Username::new(command.username.clone()) else {
            return Ok(None);
        };

        self.repository
            .find_by_username(command.role, &username)
            .await
            .map_err(|e| SessionError::Repository(e.to_string()))
    }

    /// Verification runs on the blocking pool.
    async fn verify_password(&self, password: String, hash: String) -> Result<bool, SessionError> {
        let hasher = Arc::clone(&self.password_hasher);

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| SessionError::HashingFailed(e.to_string()))
    }

    /// Judge the submitted password.
    ///
    /// Unknown identities are checked against a throwaway hash so they cost
    /// the same as a wrong password.
    async fn check_credentials(&self, command: &LoginCommand) -> Result<Credential, SessionError> {
        let Some(credential) = self.find_credential(command).await? else {
            self.verify_password(command.password.clone(), self.dummy_hash.clone())
                .await?;
            return Err(SessionError::InvalidCredentials);
        };

        let verified = self
            .verify_password(command.password.clone(), credential.password_hash.clone())
            .await?;

        if verified {
            Ok(credential)
        } else {
            Err(SessionError::InvalidCredentials)
        }
    }

    fn log_rejection(&self, command: &LoginCommand, failures: u32) {
        let max_attempts = self.attempts.policy().max_attempts;

        tracing::warn!(
            username = %command.identity(),
            role = %command.role,
            client = %command.client_address,
            failures,
            max_attempts,
            "Login failed"
        );

        if failures == max_attempts {
            tracing::warn!(
                username = %command.identity(),
                role = %command.role,
                client = %command.client_address,
                lockout_secs = self.attempts.policy().window.as_secs(),
                "Client locked out after repeated login failures"
            );
        }
    }
}

#[async_trait]
impl<CR> SessionServicePort for SessionService<CR>
where
    CR: CredentialRepository,
{
    async fn login(&self, command: LoginCommand) -> Result<SessionBundle, SessionError> {
        let attempt_key = command.attempt_key();

        let failures = match self.attempts.reserve_attempt(&attempt_key) {
            Ok(failures) => failures,
            Err(retry_after) => {
                tracing::warn!(
                    username = %command.identity(),
                    role = %command.role,
                    client = %command.client_address,
                    retry_after_secs = retry_after.as_secs(),
                    "Login rejected while locked out"
                );
                return Err(SessionError::RateLimited { retry_after });
            }
        };

        let credential = match self.check_credentials(&command).await {
            Ok(credential) => credential,
            Err(SessionError::InvalidCredentials) => {
                self.log_rejection(&command, failures);
                return Err(SessionError::InvalidCredentials);
            }
            Err(e) => {
                // Nothing was judged, so the attempt does not count.
                self.attempts.release_attempt(&attempt_key);
                return Err(e);
            }
        };

        self.attempts.clear_on_success(&attempt_key);

        let user = SessionUser::from(&credential);
        let payload = user.payload();
        let csrf_token = self.csrf_guard.generate();
        let access = self
            .token_service
            .issue_access_token(&payload, &csrf_token)?;
        let refresh = self.token_service.issue_refresh_token(&payload)?;

        tracing::info!(
            credential_id = %user.id,
            username = %user.username,
            role = %user.role,
            client = %command.client_address,
            "Login succeeded"
        );

        Ok(SessionBundle {
            access_token: access.token,
            refresh_token: refresh.token,
            csrf_token,
            expires_in: access.expires_in,
            user,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedSession, SessionError> {
        let claims = self
            .token_service
            .verify(refresh_token, TokenKind::Refresh)
            .ok_or(SessionError::InvalidToken)?;

        let csrf_token = self.csrf_guard.generate();
        let access = self
            .token_service
            .issue_access_token(&claims.payload(), &csrf_token)?;

        tracing::debug!(
            subject = %claims.sub,
            username = %claims.username,
            "Access token refreshed"
        );

        Ok(RefreshedSession {
            access_token: access.token,
            csrf_token,
            expires_in: access.expires_in,
        })
    }

    async fn logout(&self, access_token: &str, refresh_token: Option<&str>) {
        if !access_token.is_empty() {
            self.token_service.blacklist(access_token);
        }

        if let Some(refresh_token) = refresh_token.filter(|token| !token.is_empty()) {
            self.token_service.blacklist(refresh_token);
        }

        tracing::debug!(
            revoked_refresh_token = refresh_token.is_some(),
            "Session logged out"
        );
    }

    async fn current_session(
        &self,
        access_token: &str,
    ) -> Result<AuthenticatedSession, SessionError> {
        let claims = self
            .token_service
            .verify(access_token, TokenKind::Access)
            .ok_or(SessionError::Unauthenticated)?;

        let user = SessionUser::from_claims(&claims).ok_or_else(|| {
            tracing::warn!(subject = %claims.sub, "Signed token carries an unusable identity");
            SessionError::Unauthenticated
        })?;

        Ok(AuthenticatedSession {
            user,
            csrf_token: claims.csrf.unwrap_or_default(),
        })
    }
}

/// Periodically purge expired lockout records and blacklist entries.
///
/// Lookups already ignore stale entries; the sweep only bounds memory for
/// identifiers and tokens that are never seen again.
pub fn spawn_cleanup_task<CR>(service: Arc<SessionService<CR>>, every: Duration) -> JoinHandle<()>
where
    CR: CredentialRepository,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let (attempts, tokens) = service.purge_expired();
            if attempts > 0 || tokens > 0 {
                tracing::debug!(
                    attempt_records = attempts,
                    blacklisted_tokens = tokens,
                    "Purged expired security state"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use auth::HashingCost;
    use auth::LockoutPolicy;
    use auth::TokenConfig;
    use chrono::Utc;
    use mockall::mock;

    use super::*;
    use crate::domain::account::errors::AccountError;
    use crate::domain::account::models::CredentialId;
    use crate::domain::account::models::Role;

    mock! {
        pub TestCredentialRepository {}

        #[async_trait]
        impl CredentialRepository for TestCredentialRepository {
            async fn create(&self, credential: Credential) -> Result<Credential, AccountError>;
            async fn find_by_username(&self, role: Role, username: &Username) -> Result<Option<Credential>, AccountError>;
            async fn list_by_role(&self, role: Role) -> Result<Vec<Credential>, AccountError>;
        }
    }

    const PASSWORD: &str = "Secret123!";

    fn hasher() -> Arc<PasswordHasher> {
        Arc::new(
            PasswordHasher::with_cost(HashingCost {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            })
            .unwrap(),
        )
    }

    fn admin_credential(hasher: &PasswordHasher) -> Credential {
        Credential {
            id: CredentialId::new(),
            username: Username::new("admin".to_string()).unwrap(),
            role: Role::Admin,
            password_hash: hasher.hash(PASSWORD).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn service_with(
        repository: MockTestCredentialRepository,
        hasher: Arc<PasswordHasher>,
    ) -> SessionService<MockTestCredentialRepository> {
        SessionService::new(
            Arc::new(repository),
            hasher,
            Arc::new(TokenService::new(
                b"test_secret_key_at_least_32_bytes!",
                TokenConfig::default(),
            )),
            Arc::new(LoginAttemptTracker::new(LockoutPolicy::default())),
        )
    }

    fn repository_with(credential: Option<Credential>) -> MockTestCredentialRepository {
        let mut repository = MockTestCredentialRepository::new();
        repository
            .expect_find_by_username()
            .returning(move |role, username| {
                Ok(credential
                    .clone()
                    .filter(|c| c.role == role && &c.username == username))
            });
        repository
    }

    fn login(username: &str, password: &str) -> LoginCommand {
        LoginCommand::new(
            Role::Admin,
            username.to_string(),
            password.to_string(),
            "127.0.0.1".to_string(),
        )
    }

    #[tokio::test]
    async fn test_login_success_issues_session() {
        let hasher = hasher();
        let credential = admin_credential(&hasher);
        let credential_id = credential.id;
        let service = service_with(repository_with(Some(credential)), hasher);

        let bundle = service.login(login("admin", PASSWORD)).await.unwrap();

        assert!(!bundle.access_token.is_empty());
        assert!(!bundle.refresh_token.is_empty());
        assert!(!bundle.csrf_token.is_empty());
        assert_eq!(bundle.expires_in, 3600);
        assert_eq!(bundle.user.id, credential_id);
        assert_eq!(bundle.user.username, "admin");
        assert_eq!(bundle.user.role, Role::Admin);

        let session = service.current_session(&bundle.access_token).await.unwrap();
        assert_eq!(session.user, bundle.user);
        assert_eq!(session.csrf_token, bundle.csrf_token);
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_user_are_indistinguishable() {
        let hasher = hasher();
        let service = service_with(repository_with(Some(admin_credential(&hasher))), hasher);

        let wrong_password = service.login(login("admin", "nope")).await.unwrap_err();
        let unknown_user = service.login(login("ghost", PASSWORD)).await.unwrap_err();
        let malformed_user = service.login(login("x", PASSWORD)).await.unwrap_err();

        assert!(matches!(wrong_password, SessionError::InvalidCredentials));
        assert!(matches!(unknown_user, SessionError::InvalidCredentials));
        assert!(matches!(malformed_user, SessionError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_login_locks_out_after_max_failures() {
        let hasher = hasher();
        let service = service_with(repository_with(Some(admin_credential(&hasher))), hasher);

        for _ in 0..5 {
            let err = service.login(login("admin", "wrong")).await.unwrap_err();
            assert!(matches!(err, SessionError::InvalidCredentials));
        }

        // Even the correct password is refused while locked out.
        let err = service.login(login("admin", PASSWORD)).await.unwrap_err();
        match err {
            SessionError::RateLimited { retry_after } => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= Duration::from_secs(900));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lockout_is_scoped_to_client_and_identity() {
        let hasher = hasher();
        let service = service_with(repository_with(Some(admin_credential(&hasher))), hasher);

        for _ in 0..5 {
            let _ = service.login(login("admin", "wrong")).await;
        }

        let mut other_client = login("admin", PASSWORD);
        other_client.client_address = "10.1.2.3".to_string();

        assert!(service.login(other_client).await.is_ok());
    }

    #[tokio::test]
    async fn test_successful_login_resets_failures() {
        let hasher = hasher();
        let service = service_with(repository_with(Some(admin_credential(&hasher))), hasher);

        for _ in 0..4 {
            let _ = service.login(login("admin", "wrong")).await;
        }
        assert!(service.login(login("admin", PASSWORD)).await.is_ok());

        for _ in 0..4 {
            let err = service.login(login("admin", "wrong")).await.unwrap_err();
            assert!(matches!(err, SessionError::InvalidCredentials));
        }
        assert!(service.login(login("admin", PASSWORD)).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_repository_failure_is_not_counted_as_credentials_error() {
        let mut repository = MockTestCredentialRepository::new();
        repository
            .expect_find_by_username()
            .returning(|_, _| Err(AccountError::DatabaseError("connection reset".to_string())));

        let service = service_with(repository, hasher());

        let err = service.login(login("admin", PASSWORD)).await.unwrap_err();
        assert!(matches!(err, SessionError::Repository(_)));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_access_and_csrf_tokens() {
        let hasher = hasher();
        let service = service_with(repository_with(Some(admin_credential(&hasher))), hasher);
        let bundle = service.login(login("admin", PASSWORD)).await.unwrap();

        let refreshed = service.refresh(&bundle.refresh_token).await.unwrap();

        assert_ne!(refreshed.access_token, bundle.access_token);
        assert_ne!(refreshed.csrf_token, bundle.csrf_token);

        let session = service.current_session(&refreshed.access_token).await.unwrap();
        assert_eq!(session.user, bundle.user);
        assert_eq!(session.csrf_token, refreshed.csrf_token);

        // The refresh token is not rotated and stays usable.
        assert!(service.refresh(&bundle.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token_and_garbage() {
        let hasher = hasher();
        let service = service_with(repository_with(Some(admin_credential(&hasher))), hasher);
        let bundle = service.login(login("admin", PASSWORD)).await.unwrap();

        assert!(matches!(
            service.refresh(&bundle.access_token).await,
            Err(SessionError::InvalidToken)
        ));
        assert!(matches!(
            service.refresh("garbage").await,
            Err(SessionError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_tokens_idempotently() {
        let hasher = hasher();
        let service = service_with(repository_with(Some(admin_credential(&hasher))), hasher);
        let bundle = service.login(login("admin", PASSWORD)).await.unwrap();

        service
            .logout(&bundle.access_token, Some(&bundle.refresh_token))
            .await;
        service.logout(&bundle.access_token, None).await;
        service.logout("not-a-token", None).await;

        assert!(matches!(
            service.current_session(&bundle.access_token).await,
            Err(SessionError::Unauthenticated)
        ));
        assert!(matches!(
            service.refresh(&bundle.refresh_token).await,
            Err(SessionError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_state() {
        let hasher = hasher();
        let service = service_with(repository_with(Some(admin_credential(&hasher))), hasher);
        let bundle = service.login(login("admin", PASSWORD)).await.unwrap();

        let _ = service.login(login("admin", "wrong")).await;
        service.logout(&bundle.access_token, None).await;

        assert_eq!(service.purge_expired(), (0, 0));
        assert!(service.current_session(&bundle.access_token).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_identity_is_checked_against_real_hash() {
        let hasher = hasher();
        let service = service_with(repository_with(None), Arc::clone(&hasher));

        assert!(service.dummy_hash.starts_with("$argon2id$"));
        assert!(hasher.verify(DUMMY_PASSWORD, &service.dummy_hash));

        let err = service
            .login(login("ghost", DUMMY_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_guesses_cannot_exceed_lockout() {
        let hasher = hasher();
        let service = Arc::new(service_with(
            repository_with(Some(admin_credential(&hasher))),
            hasher,
        ));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.login(login("admin", "wrong")).await })
            })
            .collect();

        let mut rejected = 0;
        let mut rate_limited = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Err(SessionError::InvalidCredentials) => rejected += 1,
                Err(SessionError::RateLimited { .. }) => rate_limited += 1,
                other => panic!("unexpected login result: {:?}", other.map(|b| b.user)),
            }
        }

        assert_eq!(rejected, 5);
        assert_eq!(rate_limited, 7);
    }

    #[tokio::test]
    async fn test_repository_failure_does_not_count_towards_lockout() {
        let mut repository = MockTestCredentialRepository::new();
        repository
            .expect_find_by_username()
            .returning(|_, _| Err(AccountError::DatabaseError("connection reset".to_string())));
        let service = service_with(repository, hasher());

        for _ in 0..10 {
            let err = service.login(login("admin", PASSWORD)).await.unwrap_err();
            assert!(matches!(err, SessionError::Repository(_)));
        }
    }
}
