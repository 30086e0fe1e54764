pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tailor::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Tailor API: POST only, everything else gets the JSON 405
        .route(
            "/api/tailor",
            post(handlers::handle_tailor).fallback(handlers::handle_method_not_allowed),
        )
        .with_state(state)
}
