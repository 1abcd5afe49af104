//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Session lifecycle
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/:id",
            get(get_session_handler).delete(close_session_handler),
        )
        .route("/sessions/:id/rotate", post(rotate_handler))
        .route("/sessions/:id/revealed", get(revealed_handler))
        // Games
        .route("/sessions/:id/dice", post(dice_handler))
        .route("/sessions/:id/plinko", post(plinko_handler))
        .route(
            "/sessions/:id/blackjack",
            get(blackjack_view_handler).post(blackjack_start_handler),
        )
        .route("/sessions/:id/blackjack/action", post(blackjack_action_handler))
        .route("/sessions/:id/blackjack/abandon", post(blackjack_abandon_handler))
        // Third-party verification
        .route("/verify", post(verify_handler))
        .with_state(state)
}
