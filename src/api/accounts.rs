//! Admin-only account management endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::Role;
use crate::services::{AccountInfo, AccountUpdate, RegisterAccount};

use super::{ApiError, ApiResponse, AppState, Paged};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// POST /auth/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountInfo>>), ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if !payload.email.contains('@') {
        return Err(ApiError::validation("A valid email is required"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let account = state
        .accounts()
        .register(RegisterAccount {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            role: payload.role.unwrap_or(Role::User),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(account))))
}

/// GET /auth/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paged<AccountInfo>>>, ApiError> {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);

    let (items, total) = state.accounts().list_paged(page, page_size).await?;

    Ok(Json(ApiResponse::success(Paged {
        items,
        total,
        page: page.max(1),
        page_size: if (1..=100).contains(&page_size) {
            page_size
        } else {
            20
        },
    })))
}

/// GET /auth/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AccountInfo>>, ApiError> {
    let account = state.accounts().get_by_id(id).await?;
    Ok(Json(ApiResponse::success(account)))
}

/// PATCH /auth/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<AccountInfo>>, ApiError> {
    if let Some(email) = &payload.email
        && !email.contains('@')
    {
        return Err(ApiError::validation("A valid email is required"));
    }

    let account = state
        .accounts()
        .update(
            id,
            AccountUpdate {
                email: payload.email,
                role: payload.role,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(account)))
}

/// DELETE /auth/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.accounts().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
