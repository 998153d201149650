use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::support_requests;
use crate::models::{Platform, TicketKind, TicketStatus};

/// Ticket row with enums decoded from their stored representation.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: i32,
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

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub kind: TicketKind,
    pub user_email: Option<String>,
    pub message: String,
    pub platform: Platform,
    pub app_version: String,
    pub device_model: String,
    pub app: String,
}

fn to_ticket(model: support_requests::Model) -> Result<Ticket> {
    let kind = TicketKind::parse(&model.kind)
        .with_context(|| format!("Unknown ticket kind '{}' for ticket {}", model.kind, model.id))?;
    let platform = Platform::parse(&model.platform).with_context(|| {
        format!(
            "Unknown platform '{}' for ticket {}",
            model.platform, model.id
        )
    })?;
    let status = TicketStatus::parse(&model.status).with_context(|| {
        format!(
            "Unknown ticket status '{}' for ticket {}",
            model.status, model.id
        )
    })?;

    Ok(Ticket {
        id: model.id,
        kind,
        user_email: model.user_email,
        message: model.message,
        platform,
        app_version: model.app_version,
        device_model: model.device_model,
        app: model.app,
        status,
        admin_notes: model.admin_notes,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub struct SupportRequestRepository {
    conn: DatabaseConnection,
}

impl SupportRequestRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn live() -> sea_orm::Select<support_requests::Entity> {
        support_requests::Entity::find().filter(support_requests::Column::DeletedAt.is_null())
    }

    /// New tickets always start in status `new`, regardless of the payload.
    pub async fn create(&self, new: NewTicket) -> Result<Ticket> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = support_requests::ActiveModel {
            id: NotSet,
            kind: Set(new.kind.as_str().to_string()),
            user_email: Set(new.user_email),
            message: Set(new.message),
            platform: Set(new.platform.as_str().to_string()),
            app_version: Set(new.app_version),
            device_model: Set(new.device_model),
            app: Set(new.app),
            status: Set(TicketStatus::New.as_str().to_string()),
            admin_notes: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert support request")?;

        to_ticket(model)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Ticket>> {
        let ticket = Self::live()
            .filter(support_requests::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query support request by ID")?;

        ticket.map(to_ticket).transpose()
    }

    pub async fn list_paged(&self, offset: u64, limit: u64) -> Result<(Vec<Ticket>, u64)> {
        let total = Self::live()
            .count(&self.conn)
            .await
            .context("Failed to count support requests")?;

        let models = Self::live()
            .order_by_desc(support_requests::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list support requests")?;

        let tickets = models
            .into_iter()
            .map(to_ticket)
            .collect::<Result<Vec<_>>>()?;

        Ok((tickets, total))
    }

    pub async fn update_fields(
        &self,
        id: i32,
        status: Option<TicketStatus>,
        admin_notes: Option<String>,
    ) -> Result<Option<Ticket>> {
        let Some(model) = Self::live()
            .filter(support_requests::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query support request for update")?
        else {
            return Ok(None);
        };

        let mut active: support_requests::ActiveModel = model.into();
        if let Some(status) = status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(notes) = admin_notes {
            active.admin_notes = Set(Some(notes));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update support request")?;

        to_ticket(updated).map(Some)
    }

    pub async fn soft_delete(&self, id: i32) -> Result<bool> {
        let Some(model) = Self::live()
            .filter(support_requests::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query support request for delete")?
        else {
            return Ok(false);
        };

        let now = chrono::Utc::now().to_rfc3339();
        let mut active: support_requests::ActiveModel = model.into();
        active.deleted_at = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(true)
    }
}
