use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use chrono::Utc;

use super::errors::AccountError;
use super::models::CreateAccountCommand;
use super::models::Credential;
use super::models::CredentialId;
use super::models::NewPassword;
use super::models::Role;
use super::ports::AccountServicePort;
use super::ports::CredentialRepository;

/// Domain service implementation for account management.
pub struct AccountService<CR>
where
    CR: CredentialRepository,
{
    repository: Arc<CR>,
    password_hasher: Arc<PasswordHasher>,
}

impl<CR> AccountService<CR>
where
    CR: CredentialRepository,
{
    pub fn new(repository: Arc<CR>, password_hasher: Arc<PasswordHasher>) -> Self {
        Self {
            repository,
            password_hasher,
        }
    }

    /// Argon2 is deliberately slow, so hashing runs on the blocking pool.
    async fn hash_password(&self, password: &NewPassword) -> Result<String, AccountError> {
        let hasher = Arc::clone(&self.password_hasher);
        let password = password.clone();

        tokio::task::spawn_blocking(move || hasher.hash(password.expose()))
            .await
            .map_err(|e| AccountError::HashingFailed(e.to_string()))?
            .map_err(|e| AccountError::HashingFailed(e.to_string()))
    }
}

#[async_trait]
impl<CR> AccountServicePort for AccountService<CR>
where
    CR: CredentialRepository,
{
    async fn create_account(
        &self,
        command: CreateAccountCommand,
    ) -> Result<Credential, AccountError> {
        let password_hash = self.hash_password(&command.password).await?;

        let credential = Credential {
            id: CredentialId::new(),
            username: command.username,
            role: command.role,
            password_hash,
            created_at: Utc::now(),
        };

        let created = self.repository.create(credential).await?;

        tracing::info!(
            credential_id = %created.id,
            username = %created.username,
            role = %created.role,
            "Account created"
        );

        Ok(created)
    }

    async fn list_accounts(&self, role: Role) -> Result<Vec<Credential>, AccountError> {
        self.repository.list_by_role(role).await
    }

    async fn ensure_account(&self, command: CreateAccountCommand) -> Result<bool, AccountError> {
        if self
            .repository
            .find_by_username(command.role, &command.username)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        match self.create_account(command).await {
            Ok(_) => Ok(true),
            // Another instance created it between the lookup and the insert.
            Err(AccountError::UsernameAlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
