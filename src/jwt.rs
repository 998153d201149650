//! Stateless bearer-token issuance and verification.
//!
//! Tokens are HS256-signed over a process-wide secret loaded at startup and
//! expire 24 hours after issuance. Verification here checks signature and
//! expiry only; whether the account still exists and is active is re-checked
//! at the auth gate on every request.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::Account;
use crate::models::Role;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, set to the username
    pub sub: String,
    pub user_id: i32,
    pub username: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

pub struct JwtIssuer {
    secret: String,
}

impl JwtIssuer {
    #[must_use]
    pub const fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Sign a token for the account, returning it with its expiry instant.
    pub fn issue(&self, account: &Account) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(chrono::Duration::hours(TOKEN_TTL_HOURS))
            .context("Invalid expiry timestamp")?;

        let claims = Claims {
            sub: account.username.clone(),
            user_id: account.id,
            username: account.username.clone(),
            role: account.role,
            iat: usize::try_from(now.timestamp()).unwrap_or(0),
            exp: usize::try_from(expires_at.timestamp()).unwrap_or(0),
        };

        debug!(
            "Issuing token for user {} ({}), expires at {}",
            account.username, account.id, expires_at
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign token")?;

        Ok((token, expires_at))
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account() -> Account {
        Account {
            id: 7,
            username: "testuser".to_string(),
            email: "testuser@example.com".to_string(),
            role: Role::User,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = JwtIssuer::new("a-test-secret-that-is-long-enough!!".to_string());
        let account = test_account();

        let (token, expires_at) = issuer.issue(&account).unwrap();
        assert!(!token.is_empty());
        assert!(expires_at > Utc::now());

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id, account.id);
        assert_eq!(claims.username, account.username);
        assert_eq!(claims.sub, account.username);
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let issuer = JwtIssuer::new("a-test-secret-that-is-long-enough!!".to_string());
        assert!(issuer.verify("not.a.token").is_err());
        assert!(issuer.verify("").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtIssuer::new("a-test-secret-that-is-long-enough!!".to_string());
        let other = JwtIssuer::new("a-different-secret-equally-long!!!!".to_string());
        let (token, _) = issuer.issue(&test_account()).unwrap();

        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = JwtIssuer::new("a-test-secret-that-is-long-enough!!".to_string());
        let (token, _) = issuer.issue(&test_account()).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(issuer.verify(&tampered).is_err());
    }

    #[test]
    fn test_admin_role_survives_roundtrip() {
        let issuer = JwtIssuer::new("a-test-secret-that-is-long-enough!!".to_string());
        let mut account = test_account();
        account.role = Role::Admin;

        let (token, _) = issuer.issue(&account).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.role, Role::Admin);
    }
}
