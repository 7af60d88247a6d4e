//! Club booking service: event eligibility, pricing and payment hand-off.

pub mod booking;
pub mod cache;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

use axum::{extract::State, routing::get, Json, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::booking::{BookingGateway, MemberDirectory};
use crate::cache::{AppCache, CacheStats};
use crate::config::Config;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: AppCache,
    pub config: Arc<Config>,
    pub directory: Arc<dyn MemberDirectory>,
    pub gateway: Arc<dyn BookingGateway>,
}

/// Full application router with middleware
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(booking::router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe with cache sizes
async fn health(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}
