use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::account::errors::PasswordPolicyError;
use crate::domain::account::errors::UsernameError;
use crate::domain::account::models::CreateAccountCommand;
use crate::domain::account::models::Credential;
use crate::domain::account::models::NewPassword;
use crate::domain::account::models::Role;
use crate::domain::account::models::Username;
use crate::domain::account::ports::AccountServicePort;
use crate::inbound::http::router::AppState;

pub async fn list_teachers(
    State(state): State<AppState>,
) -> Result<ApiSuccess<ListTeachersResponseData>, ApiError> {
    state
        .account_service
        .list_accounts(Role::Teacher)
        .await
        .map_err(ApiError::from)
        .map(|credentials| {
            ApiSuccess::new(
                StatusCode::OK,
                ListTeachersResponseData {
                    teachers: credentials.iter().map(AccountData::from).collect(),
                },
            )
        })
}

pub async fn create_teacher(
    State(state): State<AppState>,
    body: Result<Json<CreateTeacherRequest>, JsonRejection>,
) -> Result<ApiSuccess<CreateTeacherResponseData>, ApiError> {
    let Json(body) = body.map_err(ApiError::from)?;
    state
        .account_service
        .create_account(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref credential| {
            ApiSuccess::new(
                StatusCode::CREATED,
                CreateTeacherResponseData {
                    user: credential.into(),
                },
            )
        })
}

/// HTTP request body for creating a teacher account (raw JSON)
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CreateTeacherRequest {
    username: String,
    password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseCreateTeacherRequestError {
    #[error("Invalid username: {0}")]
    Username(#[from] UsernameError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),
}

impl CreateTeacherRequest {
    fn try_into_command(self) -> Result<CreateAccountCommand, ParseCreateTeacherRequestError> {
        let username = Username::new(self.username)?;
        let password = NewPassword::new(self.password)?;
        Ok(CreateAccountCommand::new(Role::Teacher, username, password))
    }
}

impl From<ParseCreateTeacherRequestError> for ApiError {
    fn from(err: ParseCreateTeacherRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

/// Public profile of a stored account; never carries the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    pub id: String,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Credential> for AccountData {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id.to_string(),
            username: credential.username.as_str().to_string(),
            role: credential.role.to_string(),
            created_at: credential.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListTeachersResponseData {
    pub teachers: Vec<AccountData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTeacherResponseData {
    pub user: AccountData,
}
