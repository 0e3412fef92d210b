use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod responses;

#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<RwLock<AppState>>,
    pub config_path: PathBuf,
}

pub fn router(context: ApiContext) -> Router {
    Router::new()
        .route("/api/roads", get(handlers::get_roads))
        .route("/api/alert", get(handlers::get_alert))
        .route("/api/alert/dismiss", post(handlers::dismiss_alert))
        .route("/api/health", get(handlers::get_health))
        .route(
            "/api/config/feed",
            get(handlers::get_feed_config).put(handlers::put_feed_config),
        )
        .with_state(context)
}
