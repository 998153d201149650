//! SeaORM-backed implementation of [`AccountService`].

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::task;
use tracing::{info, warn};

use crate::db::{NewAccount, Store};
use crate::db::repositories::user::{hash_password, verify_password};
use crate::jwt::JwtIssuer;
use crate::models::Role;

use super::account_service::{
    AccountError, AccountInfo, AccountService, AccountUpdate, LoginOutcome, RegisterAccount,
};

const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_EMAIL: &str = "admin@supportdesk.local";

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub struct SeaOrmAccountService {
    store: Store,
    jwt: Arc<JwtIssuer>,
    /// Password for the bootstrap admin; when absent, a random one is
    /// generated and logged once at creation time.
    bootstrap_admin_password: Option<String>,
}

impl SeaOrmAccountService {
    #[must_use]
    pub const fn new(
        store: Store,
        jwt: Arc<JwtIssuer>,
        bootstrap_admin_password: Option<String>,
    ) -> Self {
        Self {
            store,
            jwt,
            bootstrap_admin_password,
        }
    }
}

/// Argon2 verification takes tens of milliseconds; keep it off the async
/// worker threads.
async fn verify_blocking(stored_hash: String, password: String) -> Result<bool, AccountError> {
    task::spawn_blocking(move || verify_password(&stored_hash, &password))
        .await
        .map_err(|e| AccountError::Database(format!("Verification task failed: {e}")))
}

async fn hash_blocking(password: String) -> Result<String, AccountError> {
    task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AccountError::Database(format!("Hashing task failed: {e}")))?
        .map_err(AccountError::from)
}

#[async_trait::async_trait]
impl AccountService for SeaOrmAccountService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::InvalidRequest);
        }

        let Some((account, stored_hash)) = self.store.get_account_with_hash(username).await? else {
            return Err(AccountError::InvalidCredentials);
        };

        if !account.is_active {
            return Err(AccountError::UserInactive);
        }

        if !verify_blocking(stored_hash, password.to_string()).await? {
            return Err(AccountError::InvalidCredentials);
        }

        // Best effort; a failed timestamp write must not fail the login.
        if let Err(e) = self.store.touch_account_last_login(account.id).await {
            warn!("Failed to record last login for user {}: {e}", account.id);
        }

        let (token, expires_at) = self.jwt.issue(&account)?;
        info!("User {} logged in", account.username);

        Ok(LoginOutcome {
            token,
            expires_at,
            user: account.into(),
        })
    }

    async fn register(&self, req: RegisterAccount) -> Result<AccountInfo, AccountError> {
        if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
            return Err(AccountError::InvalidRequest);
        }

        if self.store.account_exists(&req.username, &req.email).await? {
            return Err(AccountError::UserExists);
        }

        let password_hash = hash_blocking(req.password).await?;

        let account = self
            .store
            .create_account(NewAccount {
                username: req.username,
                email: req.email,
                password_hash,
                role: req.role,
                is_active: true,
            })
            .await?;

        info!("Registered user {} ({})", account.username, account.id);
        Ok(account.into())
    }

    async fn get_by_id(&self, id: i32) -> Result<AccountInfo, AccountError> {
        let account = self
            .store
            .get_account(id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        Ok(account.into())
    }

    async fn list_paged(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<AccountInfo>, u64), AccountError> {
        let page = if page < 1 { 1 } else { page as u64 };
        let page_size = if (1..=MAX_PAGE_SIZE).contains(&page_size) {
            page_size as u64
        } else {
            DEFAULT_PAGE_SIZE
        };

        let offset = (page - 1) * page_size;
        let (accounts, total) = self.store.list_accounts(offset, page_size).await?;

        Ok((accounts.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, id: i32, update: AccountUpdate) -> Result<AccountInfo, AccountError> {
        let account = self
            .store
            .update_account(id, update.email, update.role, update.is_active)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        Ok(account.into())
    }

    async fn change_password(
        &self,
        id: i32,
        current: &str,
        new: &str,
    ) -> Result<(), AccountError> {
        if current.is_empty() || new.is_empty() {
            return Err(AccountError::InvalidRequest);
        }

        let stored_hash = self
            .store
            .get_account_hash(id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if !verify_blocking(stored_hash, current.to_string()).await? {
            return Err(AccountError::InvalidCredentials);
        }

        let new_hash = hash_blocking(new.to_string()).await?;
        self.store.set_account_password_hash(id, new_hash).await?;

        info!("Password changed for user {id}");
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<(), AccountError> {
        if self.store.delete_account(id).await? {
            info!("Deleted user {id}");
            Ok(())
        } else {
            Err(AccountError::UserNotFound)
        }
    }

    async fn validate_token(&self, token: &str) -> Result<crate::db::Account, AccountError> {
        let claims = self
            .jwt
            .verify(token)
            .map_err(|_| AccountError::InvalidToken)?;

        let account = self
            .store
            .get_account(claims.user_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if !account.is_active {
            return Err(AccountError::UserInactive);
        }

        Ok(account)
    }

    async fn ensure_default_admin(&self) -> Result<(), AccountError> {
        if self
            .store
            .get_account_by_username(DEFAULT_ADMIN_USERNAME)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let (password, generated) = match &self.bootstrap_admin_password {
            Some(configured) => (configured.clone(), false),
            None => {
                let random: String = rand::rng()
                    .sample_iter(&Alphanumeric)
                    .take(24)
                    .map(char::from)
                    .collect();
                (random, true)
            }
        };

        let password_hash = hash_blocking(password.clone()).await?;

        let account = self
            .store
            .create_account(NewAccount {
                username: DEFAULT_ADMIN_USERNAME.to_string(),
                email: DEFAULT_ADMIN_EMAIL.to_string(),
                password_hash,
                role: Role::Admin,
                is_active: true,
            })
            .await?;

        if generated {
            // Logged exactly once, on first boot; there is no other way to
            // recover a generated credential.
            info!(
                "Created default admin (id {}) with generated password: {password}",
                account.id
            );
        } else {
            info!("Created default admin (id {})", account.id);
        }

        Ok(())
    }
}
