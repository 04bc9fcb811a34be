use crate::{AppState, handlers};
use axum::{
    Router,
    routing::get,
};

/// Members Router Module
///
/// Routes for any signed-in member. The router built here is wrapped in the members gate,
/// so every handler receives a resolved `AuthUser`.
pub fn member_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Dashboard view: profile, role heading and navigation links.
        .route("/me", get(handlers::get_me))
        // GET/POST /complaints
        // Residents list and submit their own complaints; admins list everyone's.
        .route(
            "/complaints",
            get(handlers::list_complaints).post(handlers::create_complaint),
        )
}
