use crate::{
    AppState,
    auth::{AuthUser, bearer_token},
    error::{AuthError, RepoError},
    gate,
    models::{
        AuthResponse, Complaint, CreateComplaintRequest, CreateEventRequest, CreateFinanceRequest,
        CreateNoticeRequest, Credentials, DashboardView, Event, FinanceEntry, FinanceReport,
        FinanceSummary, NavLink, Notice, Resident, Role, UpdateComplaintStatusRequest,
    },
    profiles::ProfileResolver,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

// --- Auth ---

/// login
///
/// [Public Route] Password login against the auth service. The profile is resolved
/// alongside so the client can route straight to the right dashboard; it is `null` when
/// the profile row does not exist (yet).
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 502, description = "Auth service failure")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    State(profiles): State<ProfileResolver>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthResponse>, AuthError> {
    let session = state
        .auth
        .sign_in_with_password(&credentials.email, &credentials.password)
        .await?;
    let profile = profiles.fetch(session.user.id).await.ok();

    tracing::info!(user_id = %session.user.id, has_profile = profile.is_some(), "login");
    Ok(Json(AuthResponse {
        user: session.user.clone(),
        session: Some(session),
        profile,
    }))
}

/// signup
///
/// [Public Route] Creates the auth user and its `resident` profile. The profile is written
/// before the session is handed out, so the first authenticated request always finds it.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = Credentials,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 409, description = "Email already registered"),
        (status = 502, description = "Auth service failure")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    State(profiles): State<ProfileResolver>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let registration = state
        .auth
        .sign_up(&credentials.email, &credentials.password)
        .await?;
    let profile = profiles
        .create(registration.user.id, Role::Resident)
        .await?;

    tracing::info!(
        user_id = %registration.user.id,
        confirmed = registration.session.is_some(),
        "signup"
    );
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: registration.user,
            session: registration.session,
            profile: Some(profile),
        }),
    ))
}

/// logout
///
/// [Public Route] Revokes the bearer token at the auth service. Always answers 204: a
/// failed revocation is logged, and the client drops its session either way.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        if let Err(e) = state.auth.sign_out(token).await {
            tracing::warn!(error = %e, "provider sign-out failed");
        }
    }
    StatusCode::NO_CONTENT
}

// --- Public Content ---

#[utoipa::path(
    get,
    path = "/notices",
    responses((status = 200, description = "Notices, newest first", body = [Notice]))
)]
pub async fn list_notices(State(state): State<AppState>) -> Json<Vec<Notice>> {
    Json(state.repo.list_notices().await)
}

#[utoipa::path(
    get,
    path = "/events",
    responses((status = 200, description = "Events, soonest first", body = [Event]))
)]
pub async fn list_events(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.repo.list_events().await)
}

/// navigation
///
/// [Public Route] Navigation bar entries for the caller. Anonymous callers, and callers
/// whose credentials do not resolve to a profile, get the public set.
#[utoipa::path(
    get,
    path = "/navigation",
    responses((status = 200, description = "Navigation links", body = [NavLink]))
)]
pub async fn navigation(auth: Result<AuthUser, StatusCode>) -> Json<Vec<NavLink>> {
    let profile = auth.ok().map(|user| user.profile());
    Json(gate::nav_links(profile.as_ref()))
}

// --- Members ---

/// get_me
///
/// [Member Route] The dashboard for the signed-in user: profile, heading and links.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 303, description = "Not signed in; redirected to /login")
    )
)]
pub async fn get_me(user: AuthUser) -> Json<DashboardView> {
    let profile = user.profile();
    Json(DashboardView {
        heading: gate::dashboard_heading(profile.role).to_string(),
        links: gate::nav_links(Some(&profile)),
        profile,
    })
}

/// list_complaints
///
/// [Member Route] Admins see every complaint; residents see only their own.
#[utoipa::path(
    get,
    path = "/complaints",
    responses((status = 200, description = "Complaints, newest first", body = [Complaint]))
)]
pub async fn list_complaints(user: AuthUser, State(state): State<AppState>) -> Json<Vec<Complaint>> {
    let submitted_by = if user.is_admin() { None } else { Some(user.id) };
    Json(state.repo.list_complaints(submitted_by).await)
}

#[utoipa::path(
    post,
    path = "/complaints",
    request_body = CreateComplaintRequest,
    responses((status = 201, description = "Submitted", body = Complaint))
)]
pub async fn create_complaint(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateComplaintRequest>,
) -> Result<(StatusCode, Json<Complaint>), RepoError> {
    let complaint = state.repo.create_complaint(payload, user.id).await?;
    tracing::info!(complaint_id = %complaint.id, user_id = %user.id, "complaint submitted");
    Ok((StatusCode::CREATED, Json(complaint)))
}

// --- Admin ---

#[utoipa::path(
    get,
    path = "/admin/residents",
    responses((status = 200, description = "Resident roster", body = [Resident]))
)]
pub async fn list_residents(State(state): State<AppState>) -> Json<Vec<Resident>> {
    Json(state.repo.list_residents().await)
}

/// get_finances
///
/// [Admin Route] The ledger with its income, expense and balance totals.
#[utoipa::path(
    get,
    path = "/admin/finances",
    responses((status = 200, description = "Finance report", body = FinanceReport))
)]
pub async fn get_finances(State(state): State<AppState>) -> Json<FinanceReport> {
    let entries = state.repo.list_finances().await;
    Json(FinanceReport {
        summary: FinanceSummary::from_entries(&entries),
        entries,
    })
}

#[utoipa::path(
    post,
    path = "/admin/finances",
    request_body = CreateFinanceRequest,
    responses(
        (status = 201, description = "Recorded", body = FinanceEntry),
        (status = 400, description = "Amount is negative or not a number")
    )
)]
pub async fn create_finance(
    State(state): State<AppState>,
    Json(payload): Json<CreateFinanceRequest>,
) -> Result<(StatusCode, Json<FinanceEntry>), RepoError> {
    if !payload.amount.is_finite() || payload.amount < 0.0 {
        return Err(RepoError::Invalid(
            "Amount must be a non-negative number.".to_string(),
        ));
    }
    let entry = state.repo.create_finance(payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    post,
    path = "/admin/notices",
    request_body = CreateNoticeRequest,
    responses((status = 201, description = "Published", body = Notice))
)]
pub async fn create_notice(
    State(state): State<AppState>,
    Json(payload): Json<CreateNoticeRequest>,
) -> Result<(StatusCode, Json<Notice>), RepoError> {
    let notice = state.repo.create_notice(payload).await?;
    Ok((StatusCode::CREATED, Json(notice)))
}

#[utoipa::path(
    post,
    path = "/admin/events",
    request_body = CreateEventRequest,
    responses((status = 201, description = "Scheduled", body = Event))
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), RepoError> {
    let event = state.repo.create_event(payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// update_complaint_status
///
/// [Admin Route] Moves a complaint through its workflow. 404 if the id is unknown.
#[utoipa::path(
    put,
    path = "/admin/complaints/{id}/status",
    params(("id" = Uuid, Path, description = "Complaint ID")),
    request_body = UpdateComplaintStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Complaint),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_complaint_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateComplaintStatusRequest>,
) -> Result<Response, RepoError> {
    match state.repo.set_complaint_status(id, payload.status).await? {
        Some(complaint) => {
            tracing::info!(complaint_id = %id, status = ?complaint.status, "complaint status updated");
            Ok(Json(complaint).into_response())
        }
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}
