use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: health, the auth entry points, and the
/// notice and event boards.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Auth ---
        .route("/auth/login", post(handlers::login))
        // Creates the auth user and its resident profile.
        .route("/auth/signup", post(handlers::signup))
        // Always 204; revocation failures are only logged.
        .route("/auth/logout", post(handlers::logout))
        // --- Boards ---
        .route("/notices", get(handlers::list_notices))
        .route("/events", get(handlers::list_events))
        // GET /navigation
        // Links depend on the caller's role when credentials are present, but the
        // route itself never rejects.
        .route("/navigation", get(handlers::navigation))
}
