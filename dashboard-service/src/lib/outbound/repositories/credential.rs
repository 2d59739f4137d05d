use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::account::errors::AccountError;
use crate::domain::account::models::Credential;
use crate::domain::account::models::CredentialId;
use crate::domain::account::models::Role;
use crate::domain::account::models::Username;
use crate::domain::account::ports::CredentialRepository;

const UNIQUE_USERNAME_CONSTRAINT: &str = "credentials_role_username_key";

pub struct PostgresCredentialRepository {
    pool: PgPool,
}

impl PostgresCredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    username: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = AccountError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(Credential {
            id: CredentialId(row.id),
            username: Username::new(row.username)?,
            role: Role::from_str(&row.role)?,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl CredentialRepository for PostgresCredentialRepository {
    async fn create(&self, credential: Credential) -> Result<Credential, AccountError> {
        sqlx::query(
            r#"
            INSERT INTO credentials (id, username, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(credential.id.0)
        .bind(credential.username.as_str())
        .bind(credential.role.as_str())
        .bind(&credential.password_hash)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(UNIQUE_USERNAME_CONSTRAINT)
                {
                    return AccountError::UsernameAlreadyExists(
                        credential.username.as_str().to_string(),
                    );
                }
            }
            AccountError::DatabaseError(e.to_string())
        })?;

        Ok(credential)
    }

    async fn find_by_username(
        &self,
        role: Role,
        username: &Username,
    ) -> Result<Option<Credential>, AccountError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, username, role, password_hash, created_at
            FROM credentials
            WHERE role = $1 AND username = $2
            "#,
        )
        .bind(role.as_str())
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        row.map(Credential::try_from).transpose()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Credential>, AccountError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, username, role, password_hash, created_at
            FROM credentials
            WHERE role = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(Credential::try_from).collect()
    }
}
