//! Support-request endpoints: one public intake route plus the admin-side
//! management surface.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{Platform, TicketKind, TicketStatus};
use crate::services::{CreateTicket, TicketInfo, TicketUpdate};

use super::{ApiError, ApiResponse, AppState, Paged};

#[derive(Deserialize)]
pub struct CreateSupportRequest {
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub user_email: Option<String>,
    pub message: String,
    pub platform: Platform,
    pub app_version: String,
    pub device_model: String,
    pub app: String,
}

#[derive(Deserialize)]
pub struct UpdateSupportRequest {
    pub status: Option<TicketStatus>,
    pub admin_notes: Option<String>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// POST /support-request (public, rate limited)
pub async fn create_support_request(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSupportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TicketInfo>>), ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::validation("Message is required"));
    }
    if let Some(email) = &payload.user_email
        && !email.is_empty()
        && !email.contains('@')
    {
        return Err(ApiError::validation("A valid email is required"));
    }

    let ticket = state
        .tickets()
        .create(CreateTicket {
            kind: payload.kind,
            user_email: payload.user_email.filter(|e| !e.is_empty()),
            message: payload.message,
            platform: payload.platform,
            app_version: payload.app_version,
            device_model: payload.device_model,
            app: payload.app,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(ticket))))
}

/// GET /support-requests
pub async fn list_support_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paged<TicketInfo>>>, ApiError> {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);

    let (items, total) = state.tickets().list_paged(page, page_size).await?;

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

/// GET /support-requests/{id}
pub async fn get_support_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TicketInfo>>, ApiError> {
    let ticket = state.tickets().get_by_id(id).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

/// PATCH /support-requests/{id}
pub async fn update_support_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSupportRequest>,
) -> Result<Json<ApiResponse<TicketInfo>>, ApiError> {
    if payload.status.is_none() && payload.admin_notes.is_none() {
        return Err(ApiError::validation("Nothing to update"));
    }

    let ticket = state
        .tickets()
        .update(
            id,
            TicketUpdate {
                status: payload.status,
                admin_notes: payload.admin_notes,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ticket)))
}

/// DELETE /support-requests/{id}
pub async fn delete_support_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state.tickets().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
