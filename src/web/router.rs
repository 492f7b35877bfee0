//! Route definitions for the web server.

use axum::{
    routing::{get, post},
    Router,
};

use super::api::{accounts, institutions, queues, swaps, tokens};
use super::AppState;

/// Create the API router.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/signup", post(accounts::signup))
        .route("/auth/login", post(accounts::login))
        // Directory
        .route("/institutions", get(institutions::list_institutions))
        .route(
            "/institutions/:id/dashboard",
            get(institutions::institution_dashboard),
        )
        // Queues (staff)
        .route("/queues", post(queues::create_queue))
        .route("/queues/:id/close", post(queues::close_queue))
        .route("/queues/:id/call-next", post(queues::call_next))
        // Tokens
        .route("/tokens/book", post(tokens::book_token))
        .route("/tokens/:id/manage", post(tokens::manage_token))
        .route("/tokens/:id/confirm", post(tokens::confirm_token))
        .route("/tokens/:id/snooze", post(tokens::snooze_token))
        .route("/me/dashboard", get(tokens::my_dashboard))
        // Swaps
        .route("/swaps/:id/accept", post(swaps::accept_swap))
        .route("/swaps/:id/reject", post(swaps::reject_swap))
}

/// Create the full app router.
pub fn create_app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_api_router())
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
