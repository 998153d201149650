use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::rate_limit;
use crate::state::SharedState;

mod accounts;
pub mod auth;
mod error;
mod system;
mod tickets;
mod types;

pub use error::ApiError;
pub use types::*;

use crate::services::{AccountService, TicketService};

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountService> {
        &self.shared.account_service
    }

    #[must_use]
    pub fn tickets(&self) -> &Arc<dyn TicketService> {
        &self.shared.ticket_service
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<crate::rate_limit::RateLimiter> {
        &self.shared.rate_limiter
    }
}

pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    // Admin surface sits behind both gates; the role check runs after the
    // token check.
    let admin_routes = Router::new()
        .route(
            "/auth/users",
            post(accounts::create_user).get(accounts::list_users),
        )
        .route(
            "/auth/users/{id}",
            get(accounts::get_user)
                .patch(accounts::update_user)
                .delete(accounts::delete_user),
        )
        .route("/support-requests", get(tickets::list_support_requests))
        .route(
            "/support-requests/{id}",
            get(tickets::get_support_request)
                .patch(tickets::update_support_request)
                .delete(tickets::delete_support_request),
        )
        .route_layer(middleware::from_fn(auth::require_admin));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/password", axum::routing::patch(auth::change_password))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Only the public intake endpoint is rate limited.
    let intake_routes = Router::new()
        .route("/support-request", post(tickets::create_support_request))
        .route_layer(middleware::from_fn_with_state(
            state.limiter().clone(),
            rate_limit::rate_limit_middleware,
        ));

    let api_router = Router::new()
        .merge(protected_routes)
        .merge(intake_routes)
        .route("/auth/login", post(auth::login));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/health", get(system::health))
        .nest("/api/v1", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
