use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Management routes for the `admin` role. Nested under `/admin` and wrapped in the admin
/// gate, which redirects residents and anonymous callers to the login page.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/residents
        // The full resident roster, newest first.
        .route("/residents", get(handlers::list_residents))
        // GET/POST /admin/finances
        // Ledger entries with totals; recording a new income or expense line.
        .route(
            "/finances",
            get(handlers::get_finances).post(handlers::create_finance),
        )
        .route("/notices", post(handlers::create_notice))
        .route("/events", post(handlers::create_event))
        // PUT /admin/complaints/{id}/status
        .route(
            "/complaints/{id}/status",
            put(handlers::update_complaint_status),
        )
}
