use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::Account;
use crate::models::Role;
use crate::services::{AccountInfo, LoginOutcome};

use super::{ApiError, ApiResponse, AppState, MessageResponse};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub user: AccountInfo,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            token: outcome.token,
            expires_at: outcome.expires_at.to_rfc3339(),
            user: outcome.user,
        }
    }
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Authenticated account for the current request, installed by
/// [`auth_middleware`] and read by downstream handlers.
#[derive(Clone)]
pub struct CurrentUser(pub Account);

// ============================================================================
// Middleware
// ============================================================================

/// Bearer-token gate for protected routes.
///
/// Every rejection is a 401: a missing header, a non-Bearer scheme, an empty
/// or invalid token, and a token whose account has since been deleted or
/// deactivated all look the same to the caller.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(header_value) = headers.get(header::AUTHORIZATION) else {
        return Err(ApiError::unauthorized("Authorization header is required"));
    };

    let Ok(header_str) = header_value.to_str() else {
        return Err(ApiError::unauthorized("Invalid Authorization header"));
    };

    let Some(token) = header_str.strip_prefix("Bearer ") else {
        return Err(ApiError::unauthorized(
            "Authorization header must use the Bearer scheme",
        ));
    };

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("Bearer token is empty"));
    }

    // Re-fetches the account, so stale tokens for deleted or deactivated
    // accounts stop working immediately.
    let account = state
        .accounts()
        .validate_token(token)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    request.extensions_mut().insert(CurrentUser(account));
    Ok(next.run(request).await)
}

/// Admin gate, layered inside [`auth_middleware`] on admin-only routes.
/// A valid but non-admin token gets a 403, not a 401.
pub async fn require_admin(
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match account.role {
        Role::Admin => Ok(next.run(request).await),
        Role::User => Err(ApiError::forbidden("Admin access required")),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let outcome = state
        .accounts()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(outcome.into())))
}

/// GET /auth/me
pub async fn me(
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Json<ApiResponse<AccountInfo>> {
    Json(ApiResponse::success(account.into()))
}

/// PATCH /auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation(
            "New password must be at least 8 characters",
        ));
    }

    if payload.current_password == payload.new_password {
        return Err(ApiError::validation(
            "New password must be different from current password",
        ));
    }

    state
        .accounts()
        .change_password(account.id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}
