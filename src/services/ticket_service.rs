//! Domain service for support tickets.

use serde::Serialize;
use thiserror::Error;

use crate::db::Ticket;
use crate::models::{Platform, TicketKind, TicketStatus};

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Support request not found")]
    NotFound,

    #[error("Invalid request")]
    InvalidRequest,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for TicketError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for TicketError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketInfo {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub user_email: Option<String>,
    pub message: String,
    pub platform: Platform,
    pub app_version: String,
    pub device_model: String,
    pub app: String,
    pub status: TicketStatus,
    pub admin_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Ticket> for TicketInfo {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            kind: ticket.kind,
            user_email: ticket.user_email,
            message: ticket.message,
            platform: ticket.platform,
            app_version: ticket.app_version,
            device_model: ticket.device_model,
            app: ticket.app,
            status: ticket.status,
            admin_notes: ticket.admin_notes,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub kind: TicketKind,
    pub user_email: Option<String>,
    pub message: String,
    pub platform: Platform,
    pub app_version: String,
    pub device_model: String,
    pub app: String,
}

/// Admin-side partial update; only status and notes are mutable.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub admin_notes: Option<String>,
}

#[async_trait::async_trait]
pub trait TicketService: Send + Sync {
    /// Persists a new ticket in status `new`.
    async fn create(&self, req: CreateTicket) -> Result<TicketInfo, TicketError>;

    async fn get_by_id(&self, id: i32) -> Result<TicketInfo, TicketError>;

    /// Same clamping rules as account listing: page < 1 becomes 1, page size
    /// outside [1, 100] becomes 20.
    async fn list_paged(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<TicketInfo>, u64), TicketError>;

    async fn update(&self, id: i32, update: TicketUpdate) -> Result<TicketInfo, TicketError>;

    async fn delete(&self, id: i32) -> Result<(), TicketError>;
}
