//! SeaORM-backed implementation of [`TicketService`].

use tracing::info;

use crate::db::{NewTicket, Store};

use super::ticket_service::{CreateTicket, TicketError, TicketInfo, TicketService, TicketUpdate};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub struct SeaOrmTicketService {
    store: Store,
}

impl SeaOrmTicketService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl TicketService for SeaOrmTicketService {
    async fn create(&self, req: CreateTicket) -> Result<TicketInfo, TicketError> {
        if req.message.is_empty()
            || req.app_version.is_empty()
            || req.device_model.is_empty()
            || req.app.is_empty()
        {
            return Err(TicketError::InvalidRequest);
        }

        let ticket = self
            .store
            .create_ticket(NewTicket {
                kind: req.kind,
                user_email: req.user_email,
                message: req.message,
                platform: req.platform,
                app_version: req.app_version,
                device_model: req.device_model,
                app: req.app,
            })
            .await?;

        info!("Created support request {} ({})", ticket.id, ticket.kind);
        Ok(ticket.into())
    }

    async fn get_by_id(&self, id: i32) -> Result<TicketInfo, TicketError> {
        let ticket = self
            .store
            .get_ticket(id)
            .await?
            .ok_or(TicketError::NotFound)?;

        Ok(ticket.into())
    }

    async fn list_paged(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<TicketInfo>, u64), TicketError> {
        let page = if page < 1 { 1 } else { page as u64 };
        let page_size = if (1..=MAX_PAGE_SIZE).contains(&page_size) {
            page_size as u64
        } else {
            DEFAULT_PAGE_SIZE
        };

        let offset = (page - 1) * page_size;
        let (tickets, total) = self.store.list_tickets(offset, page_size).await?;

        Ok((tickets.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, id: i32, update: TicketUpdate) -> Result<TicketInfo, TicketError> {
        let ticket = self
            .store
            .update_ticket(id, update.status, update.admin_notes)
            .await?
            .ok_or(TicketError::NotFound)?;

        Ok(ticket.into())
    }

    async fn delete(&self, id: i32) -> Result<(), TicketError> {
        if self.store.delete_ticket(id).await? {
            info!("Deleted support request {id}");
            Ok(())
        } else {
            Err(TicketError::NotFound)
        }
    }
}
