// API module - HTTP endpoints

pub mod admin;
pub mod health;
pub mod middleware;
pub mod passes;
pub mod verification;

use axum::{routing::get, Router};

use middleware::session::AppState;

/// Every page and endpoint; the caller adds the session layer and state
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(passes::router())
        .merge(admin::router())
        .merge(verification::router())
}
