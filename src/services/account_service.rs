//! Domain service for authentication and account management.
//!
//! Owns login, registration, admin-driven account CRUD, password changes,
//! token validation and the first-boot admin bootstrap.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::Account;
use crate::models::Role;

/// Errors specific to account operations. The HTTP boundary maps each
/// variant to a fixed status code.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid request")]
    InvalidRequest,

    /// Deliberately identical for unknown username and wrong password, so
    /// callers cannot enumerate usernames.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Username or email already exists")]
    UserExists,

    #[error("User account is inactive")]
    UserInactive,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Public profile DTO; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
}

impl From<Account> for AccountInfo {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            role: account.role,
            is_active: account.is_active,
        }
    }
}

/// Successful login: bearer token, its expiry and the public profile.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AccountInfo,
}

#[derive(Debug, Clone)]
pub struct RegisterAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Domain service trait for accounts.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Verifies credentials, records last-login and issues a token.
    ///
    /// # Errors
    ///
    /// [`AccountError::InvalidCredentials`] for unknown user or wrong
    /// password, [`AccountError::UserInactive`] for a disabled account.
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AccountError>;

    /// Creates a new account (admin operation).
    ///
    /// # Errors
    ///
    /// [`AccountError::UserExists`] when the username or email is taken.
    async fn register(&self, req: RegisterAccount) -> Result<AccountInfo, AccountError>;

    async fn get_by_id(&self, id: i32) -> Result<AccountInfo, AccountError>;

    /// Pages are clamped: page < 1 becomes 1, page size outside [1, 100]
    /// becomes 20. Returns the page plus the total account count.
    async fn list_paged(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<AccountInfo>, u64), AccountError>;

    /// Applies only the fields present in `update`.
    async fn update(&self, id: i32, update: AccountUpdate) -> Result<AccountInfo, AccountError>;

    /// # Errors
    ///
    /// [`AccountError::InvalidCredentials`] when `current` does not verify;
    /// the stored hash is left unchanged in that case.
    async fn change_password(
        &self,
        id: i32,
        current: &str,
        new: &str,
    ) -> Result<(), AccountError>;

    /// Soft-deletes the account; subsequent lookups will not find it.
    async fn delete(&self, id: i32) -> Result<(), AccountError>;

    /// Verifies a bearer token and re-fetches the account behind it,
    /// rejecting tokens for deleted or deactivated accounts.
    async fn validate_token(&self, token: &str) -> Result<Account, AccountError>;

    /// Idempotent bootstrap of the well-known admin account. Safe to call
    /// on every startup.
    async fn ensure_default_admin(&self) -> Result<(), AccountError>;
}
