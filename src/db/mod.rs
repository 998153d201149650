use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::models::{Role, TicketStatus};

pub mod migrator;
pub mod repositories;

pub use repositories::support_request::{NewTicket, Ticket};
pub use repositories::user::{Account, NewAccount};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn ticket_repo(&self) -> repositories::support_request::SupportRequestRepository {
        repositories::support_request::SupportRequestRepository::new(self.conn.clone())
    }

    // ========== Account operations ==========

    pub async fn create_account(&self, new: NewAccount) -> Result<Account> {
        self.user_repo().create(new).await
    }

    pub async fn get_account(&self, id: i32) -> Result<Option<Account>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_account_with_hash(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>> {
        self.user_repo().get_by_username_with_hash(username).await
    }

    pub async fn get_account_hash(&self, id: i32) -> Result<Option<String>> {
        self.user_repo().get_hash_by_id(id).await
    }

    pub async fn list_accounts(&self, offset: u64, limit: u64) -> Result<(Vec<Account>, u64)> {
        self.user_repo().list_paged(offset, limit).await
    }

    pub async fn update_account(
        &self,
        id: i32,
        email: Option<String>,
        role: Option<Role>,
        is_active: Option<bool>,
    ) -> Result<Option<Account>> {
        self.user_repo()
            .update_fields(id, email, role, is_active)
            .await
    }

    pub async fn set_account_password_hash(&self, id: i32, new_hash: String) -> Result<()> {
        self.user_repo().set_password_hash(id, new_hash).await
    }

    pub async fn touch_account_last_login(&self, id: i32) -> Result<()> {
        self.user_repo().touch_last_login(id).await
    }

    pub async fn delete_account(&self, id: i32) -> Result<bool> {
        self.user_repo().soft_delete(id).await
    }

    pub async fn account_exists(&self, username: &str, email: &str) -> Result<bool> {
        self.user_repo()
            .exists_by_username_or_email(username, email)
            .await
    }

    // ========== Support request operations ==========

    pub async fn create_ticket(&self, new: NewTicket) -> Result<Ticket> {
        self.ticket_repo().create(new).await
    }

    pub async fn get_ticket(&self, id: i32) -> Result<Option<Ticket>> {
        self.ticket_repo().get_by_id(id).await
    }

    pub async fn list_tickets(&self, offset: u64, limit: u64) -> Result<(Vec<Ticket>, u64)> {
        self.ticket_repo().list_paged(offset, limit).await
    }

    pub async fn update_ticket(
        &self,
        id: i32,
        status: Option<TicketStatus>,
        admin_notes: Option<String>,
    ) -> Result<Option<Ticket>> {
        self.ticket_repo()
            .update_fields(id, status, admin_notes)
            .await
    }

    pub async fn delete_ticket(&self, id: i32) -> Result<bool> {
        self.ticket_repo().soft_delete(id).await
    }
}
