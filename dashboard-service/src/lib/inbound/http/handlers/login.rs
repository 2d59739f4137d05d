use std::net::IpAddr;
use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::account::models::Role;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::SessionBundle;
use crate::domain::session::models::SessionUser;
use crate::domain::session::ports::SessionServicePort;
use crate::inbound::http::router::AppState;

pub async fn admin_login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<LoginRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let Json(body) = body.map_err(ApiError::from)?;
    let client = client_address(&headers, peer, state.trust_forwarded_for);

    login(&state, Role::Admin, client, body).await
}

pub async fn teacher_login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<LoginRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let Json(body) = body.map_err(ApiError::from)?;
    let client = client_address(&headers, peer, state.trust_forwarded_for);

    login(&state, Role::Teacher, client, body).await
}

async fn login(
    state: &AppState,
    role: Role,
    client_address: String,
    body: LoginRequestBody,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let command = LoginCommand::new(role, body.username, body.password, client_address);

    state
        .session_service
        .login(command)
        .await
        .map_err(ApiError::from)
        .map(|bundle| ApiSuccess::new(StatusCode::OK, bundle.into()))
}

/// Address used to bucket failed logins.
///
/// `X-Forwarded-For` is only honoured when the service is configured to sit
/// behind a trusted proxy, and only when its first hop is an IP address.
pub fn client_address(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|value| value.trim().parse::<IpAddr>().ok());

        if let Some(address) = forwarded {
            return address.to_string();
        }
    }

    peer.ip().to_string()
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    username: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
    pub expires_in: u64,
    pub user: UserData,
}

impl From<SessionBundle> for LoginResponseData {
    fn from(bundle: SessionBundle) -> Self {
        Self {
            access_token: bundle.access_token,
            refresh_token: bundle.refresh_token,
            csrf_token: bundle.csrf_token,
            expires_in: bundle.expires_in,
            user: (&bundle.user).into(),
        }
    }
}

/// Minimal public profile of a session's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub role: String,
}

impl From<&SessionUser> for UserData {
    fn from(user: &SessionUser) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            role: user.role.to_string(),
        }
    }
}
