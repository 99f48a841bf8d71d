use std::sync::Arc;

use axum::{
    routing::{get, head},
    Router,
};
use threethings_core::ThreeThingsConfig;
use threethings_mail::Mailer;
use threethings_users::Store;

use crate::http::{health, mailgun, mandrill};

/// Central shared state, passed as `Arc<AppState>` to all Axum handlers.
pub struct AppState {
    pub config: ThreeThingsConfig,
    pub store: Arc<Store>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: ThreeThingsConfig, store: Arc<Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config,
            store,
            mailer,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/mailgun/", get(mailgun::landing))
        .route(
            "/mailgun/receive",
            head(crate::http::head_ok).post(mailgun::receive),
        )
        .route("/mandrill/", get(mandrill::landing))
        .route(
            "/mandrill/receive",
            head(crate::http::head_ok).post(mandrill::receive),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
