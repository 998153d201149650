use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::jwt::JwtIssuer;
use crate::rate_limit::RateLimiter;
use crate::services::{
    AccountService, SeaOrmAccountService, SeaOrmTicketService, TicketService,
};

/// Process-wide wiring: config, database, token issuer, domain services and
/// the rate limiter, built once at startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub jwt: Arc<JwtIssuer>,

    pub account_service: Arc<dyn AccountService>,

    pub ticket_service: Arc<dyn TicketService>,

    pub rate_limiter: Arc<RateLimiter>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let jwt = Arc::new(JwtIssuer::new(config.auth.jwt_secret.clone()));

        let account_service = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            jwt.clone(),
            config.auth.bootstrap_admin_password.clone(),
        )) as Arc<dyn AccountService>;

        let ticket_service =
            Arc::new(SeaOrmTicketService::new(store.clone())) as Arc<dyn TicketService>;

        let rate_limiter = RateLimiter::new(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );

        Ok(Self {
            config,
            store,
            jwt,
            account_service,
            ticket_service,
            rate_limiter,
        })
    }
}
