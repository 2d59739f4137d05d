use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::account::errors::AccountError;
use crate::domain::account::models::Credential;
use crate::domain::account::models::Role;
use crate::domain::account::models::Username;
use crate::domain::account::ports::CredentialRepository;

/// Process-local credential store for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryCredentialRepository {
    /// Map of (role, username) -> credential
    credentials: RwLock<HashMap<(Role, Username), Credential>>,
}

impl InMemoryCredentialRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn create(&self, credential: Credential) -> Result<Credential, AccountError> {
        let mut credentials = self.credentials.write().await;
        let key = (credential.role, credential.username.clone());

        if credentials.contains_key(&key) {
            return Err(AccountError::UsernameAlreadyExists(
                credential.username.as_str().to_string(),
            ));
        }

        credentials.insert(key, credential.clone());
        Ok(credential)
    }

    async fn find_by_username(
        &self,
        role: Role,
        username: &Username,
    ) -> Result<Option<Credential>, AccountError> {
        Ok(self
            .credentials
            .read()
            .await
            .get(&(role, username.clone()))
            .cloned())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Credential>, AccountError> {
        let mut credentials: Vec<Credential> = self
            .credentials
            .read()
            .await
            .values()
            .filter(|credential| credential.role == role)
            .cloned()
            .collect();

        credentials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(credentials)
    }
}
