use auth::CsrfGuard;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;

use super::handlers::ApiError;
use crate::domain::account::models::CredentialId;
use crate::domain::account::models::Role;
use crate::inbound::http::router::AppState;

pub const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");

/// Extension type carrying the verified session into handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: CredentialId,
    pub username: String,
    pub role: Role,
    pub csrf_token: String,
}

impl AuthenticatedUser {
    /// Reject sessions of any other role, independent of authentication.
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role,
                required = %role,
                "Access denied for role"
            );
            Err(ApiError::Forbidden(format!("Requires {} role", role)))
        }
    }
}

/// Validates the bearer token and adds the session to request extensions.
///
/// Missing, malformed, expired and revoked tokens all produce the same 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or(ApiError::Unauthenticated)?
        .to_string();

    let session = state
        .session_service
        .current_session(&token)
        .await
        .map_err(|e| {
            tracing::debug!(uri = %req.uri(), "Rejected request without a valid session");
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(AuthenticatedUser {
        id: session.user.id,
        username: session.user.username,
        role: session.user.role,
        csrf_token: session.csrf_token,
    });

    Ok(next.run(req).await)
}

/// Requires the session's CSRF token on state-changing requests.
///
/// Runs after [`authenticate`].
pub async fn require_csrf(
    Extension(user): Extension<AuthenticatedUser>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_safe_method(req.method()) {
        return Ok(next.run(req).await);
    }

    let supplied = req
        .headers()
        .get(&CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !CsrfGuard::new().verify(supplied, &user.csrf_token) {
        tracing::warn!(
            username = %user.username,
            method = %req.method(),
            uri = %req.uri(),
            header_present = !supplied.is_empty(),
            "CSRF check failed"
        );
        return Err(ApiError::Forbidden(
            "Missing or invalid CSRF token".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

/// Restricts a route to admin sessions.
///
/// Runs after [`authenticate`].
pub async fn require_admin(
    Extension(user): Extension<AuthenticatedUser>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    user.require_role(Role::Admin)?;
    Ok(next.run(req).await)
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
