use async_trait::async_trait;

use super::errors::AccountError;
use super::models::CreateAccountCommand;
use super::models::Credential;
use super::models::Role;
use super::models::Username;

/// Port for account management operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Create a new account with a freshly hashed password.
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` - Username is already taken within the role
    /// * `HashingFailed` - Password could not be hashed
    /// * `DatabaseError` - Database operation failed
    async fn create_account(&self, command: CreateAccountCommand)
        -> Result<Credential, AccountError>;

    /// List all accounts of one role, newest first.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn list_accounts(&self, role: Role) -> Result<Vec<Credential>, AccountError>;

    /// Create the account unless one with the same role and username exists.
    ///
    /// # Returns
    /// True if the account was created
    ///
    /// # Errors
    /// * `HashingFailed` - Password could not be hashed
    /// * `DatabaseError` - Database operation failed
    async fn ensure_account(&self, command: CreateAccountCommand) -> Result<bool, AccountError>;
}

/// Narrow view of the credential store.
#[async_trait]
pub trait CredentialRepository: Send + Sync + 'static {
    /// Persist a new credential.
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` - Username is already taken within the role
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, credential: Credential) -> Result<Credential, AccountError>;

    /// Look up a credential by role namespace and username.
    ///
    /// # Returns
    /// Optional credential (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_username(
        &self,
        role: Role,
        username: &Username,
    ) -> Result<Option<Credential>, AccountError>;

    /// Retrieve all credentials of one role, newest first.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn list_by_role(&self, role: Role) -> Result<Vec<Credential>, AccountError>;
}
