use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::users;
use crate::models::Role;

/// Account data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to persist a new account. The password is already hashed
/// by the time it reaches the repository.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

fn to_account(model: users::Model) -> Result<Account> {
    let role = Role::parse(&model.role)
        .with_context(|| format!("Unknown role '{}' for user {}", model.role, model.id))?;

    Ok(Account {
        id: model.id,
        username: model.username,
        email: model.email,
        role,
        is_active: model.is_active,
        last_login_at: model.last_login_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Base query excluding tombstoned rows; every lookup goes through this.
    fn live() -> sea_orm::Select<users::Entity> {
        users::Entity::find().filter(users::Column::DeletedAt.is_null())
    }

    pub async fn create(&self, new: NewAccount) -> Result<Account> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            id: NotSet,
            username: Set(new.username),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            role: Set(new.role.as_str().to_string()),
            is_active: Set(new.is_active),
            last_login_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        to_account(model)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Account>> {
        let user = Self::live()
            .filter(users::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        user.map(to_account).transpose()
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        let user = Self::live()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        user.map(to_account).transpose()
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let user = Self::live()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        user.map(to_account).transpose()
    }

    /// Variant used by login and token re-validation, which need the stored
    /// hash alongside the public record.
    pub async fn get_by_username_with_hash(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>> {
        let user = Self::live()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        match user {
            Some(model) => {
                let hash = model.password_hash.clone();
                Ok(Some((to_account(model)?, hash)))
            }
            None => Ok(None),
        }
    }

    pub async fn get_hash_by_id(&self, id: i32) -> Result<Option<String>> {
        let user = Self::live()
            .filter(users::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query user for password hash")?;

        Ok(user.map(|u| u.password_hash))
    }

    /// Newest-first page of live accounts plus the total live count.
    pub async fn list_paged(&self, offset: u64, limit: u64) -> Result<(Vec<Account>, u64)> {
        let total = Self::live()
            .count(&self.conn)
            .await
            .context("Failed to count users")?;

        let models = Self::live()
            .order_by_desc(users::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        let accounts = models
            .into_iter()
            .map(to_account)
            .collect::<Result<Vec<_>>>()?;

        Ok((accounts, total))
    }

    /// Applies only the provided fields; `None` leaves a column untouched.
    /// Returns `None` when the account does not exist (or is tombstoned).
    pub async fn update_fields(
        &self,
        id: i32,
        email: Option<String>,
        role: Option<Role>,
        is_active: Option<bool>,
    ) -> Result<Option<Account>> {
        let Some(model) = Self::live()
            .filter(users::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = model.into();
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(role) = role {
            active.role = Set(role.as_str().to_string());
        }
        if let Some(is_active) = is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        to_account(updated).map(Some)
    }

    pub async fn set_password_hash(&self, id: i32, new_hash: String) -> Result<()> {
        let model = Self::live()
            .filter(users::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = model.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        let model = Self::live()
            .filter(users::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query user for last-login update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = model.into();
        active.last_login_at = Set(Some(chrono::Utc::now().to_rfc3339()));
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Tombstones the row. Returns false when no live row matched.
    pub async fn soft_delete(&self, id: i32) -> Result<bool> {
        let Some(model) = Self::live()
            .filter(users::Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query user for delete")?
        else {
            return Ok(false);
        };

        let now = chrono::Utc::now().to_rfc3339();
        let mut active: users::ActiveModel = model.into();
        active.deleted_at = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(true)
    }

    /// Single existence query covering both uniqueness domains.
    pub async fn exists_by_username_or_email(&self, username: &str, email: &str) -> Result<bool> {
        let count = Self::live()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(username))
                    .add(users::Column::Email.eq(email)),
            )
            .count(&self.conn)
            .await
            .context("Failed to check user existence")?;

        Ok(count > 0)
    }
}

/// Hash a password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Constant-time verification. Malformed digests, empty input and plain
/// mismatches all return false; this never errors outward.
#[must_use]
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("hunter2!").unwrap();
        assert!(verify_password(&hash, "hunter2!"));
        assert!(!verify_password(&hash, "hunter3!"));
    }

    #[test]
    fn test_verify_never_errors() {
        assert!(!verify_password("", "anything"));
        assert!(!verify_password("not-a-phc-string", "anything"));
        let hash = hash_password("secret").unwrap();
        assert!(!verify_password(&hash, ""));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }
}
