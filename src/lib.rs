use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// HTTP surface.
pub mod auth;
pub mod handlers;
pub mod routes;

// Shared domain and infrastructure.
pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod profiles;
pub mod provider;
pub mod repository;

// Client-side session tracking.
pub mod manager;
pub mod session;

use auth::AuthUser;
use gate::GateDecision;
use models::Role;
use routes::{admin, members, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use manager::{AuthSnapshot, SessionHandle, SessionManager};
pub use profiles::ProfileResolver;
pub use provider::{AuthProviderState, MockAuthProvider, SupabaseAuthClient};
pub use repository::{PostgresRepository, RepositoryState};
pub use session::SessionStore;

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::signup, handlers::logout,
        handlers::list_notices, handlers::list_events, handlers::navigation,
        handlers::get_me, handlers::list_complaints, handlers::create_complaint,
        handlers::list_residents, handlers::get_finances, handlers::create_finance,
        handlers::create_notice, handlers::create_event, handlers::update_complaint_status,
    ),
    components(
        schemas(
            models::Role, models::Profile, models::SessionUser, models::Session,
            models::Resident, models::Notice, models::Event, models::ComplaintStatus,
            models::Complaint, models::FinanceType, models::FinanceEntry,
            models::FinanceSummary, models::Credentials, models::CreateNoticeRequest,
            models::CreateEventRequest, models::CreateComplaintRequest,
            models::UpdateComplaintStatusRequest, models::CreateFinanceRequest,
            models::AuthResponse, models::NavLink, models::DashboardView,
            models::FinanceReport,
        )
    ),
    tags(
        (name = "community-portal", description = "Community Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single immutable container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Table store (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Hosted auth service.
    pub auth: AuthProviderState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AuthProviderState {
    fn from_ref(app_state: &AppState) -> AuthProviderState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for ProfileResolver {
    fn from_ref(app_state: &AppState) -> ProfileResolver {
        ProfileResolver::new(app_state.repo.clone())
    }
}

/// admit
///
/// Applies the role gate to a request. A server request is never "loading": by the time
/// the extractor returns, the profile either resolved or it did not. On `Render` the
/// resolved `AuthUser` is stored in the request extensions so handlers do not look it up
/// a second time.
async fn admit(
    required: &[Role],
    auth: Result<AuthUser, StatusCode>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = auth.ok();
    let profile = user.as_ref().map(AuthUser::profile);

    match gate::decide(required, profile.as_ref(), false) {
        GateDecision::Render => {
            if let Some(user) = user {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        GateDecision::Redirect { to } => {
            tracing::debug!(
                path = %request.uri().path(),
                role = profile.as_ref().map(|p| p.role.as_str()),
                "gate redirect"
            );
            Redirect::to(to).into_response()
        }
        // Unreachable with `loading = false`.
        GateDecision::Wait => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn members_gate(
    auth: Result<AuthUser, StatusCode>,
    request: Request,
    next: Next,
) -> Response {
    admit(gate::MEMBERS, auth, request, next).await
}

async fn admin_gate(
    auth: Result<AuthUser, StatusCode>,
    request: Request,
    next: Next,
) -> Response {
    admit(gate::ADMINS, auth, request, next).await
}

/// create_router
///
/// Assembles the routing structure, applies the role gates and the global observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Members: resident or admin.
        .merge(
            members::member_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), members_gate)),
        )
        // Admin: nested under '/admin', admin only.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate)),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, correlated by the `x-request-id` set above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
