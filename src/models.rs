use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity & Authorization ---

/// Role
///
/// The authorization role carried by a profile. Stored as the Postgres enum `user_role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
    Default,
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    Resident,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::Admin => "admin",
        }
    }
}

/// Profile
///
/// The application-level user record in `public.profiles`, one per auth user.
/// `id` is both the primary key and the auth service's user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub role: Role,
}

/// SessionUser
///
/// The user half of an auth session, as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}

/// Session
///
/// Proof of authentication issued by the auth service. Mirrored locally, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

/// Registration
///
/// Result of a signup. `session` is absent when the project requires email
/// confirmation before the first login.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Registration {
    pub user: SessionUser,
    pub session: Option<Session>,
}

// --- Domain Records ---

/// Resident
///
/// A roster row read from `public.profiles` for the admin residents page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Resident {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Notice
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Event
///
/// A community event. Listed by `event_date`, soonest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub event_date: DateTime<Utc>,
    pub location: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ComplaintStatus
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "complaint_status", rename_all = "snake_case")]
pub enum ComplaintStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

/// Complaint
///
/// A complaint submitted by a resident. `user_id` is the submitter's profile id.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Complaint {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: ComplaintStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// FinanceType
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "finance_type", rename_all = "lowercase")]
pub enum FinanceType {
    #[default]
    Income,
    Expense,
}

/// FinanceEntry
///
/// One ledger line from `public.finances`. `type` is a reserved keyword in Rust, so the
/// column is read into `kind` and serialized back as `type`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct FinanceEntry {
    pub id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: FinanceType,
    pub amount: f64,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// FinanceSummary
///
/// Totals shown above the finance ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FinanceSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
}

impl FinanceSummary {
    pub fn from_entries(entries: &[FinanceEntry]) -> Self {
        let (total_income, total_expense) =
            entries
                .iter()
                .fold((0.0, 0.0), |(income, expense), entry| match entry.kind {
                    FinanceType::Income => (income + entry.amount, expense),
                    FinanceType::Expense => (income, expense + entry.amount),
                });
        Self {
            total_income,
            total_expense,
            balance: total_income - total_expense,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// Credentials
///
/// Login and signup payload. The password is passed straight through to the auth
/// service and never persisted or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateNoticeRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub event_date: DateTime<Utc>,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateComplaintRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateComplaintStatusRequest {
    pub status: ComplaintStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateFinanceRequest {
    #[serde(rename = "type")]
    pub kind: FinanceType,
    pub amount: f64,
    pub description: String,
}

// --- Responses (Output Schemas) ---

/// AuthResponse
///
/// Returned by login and signup. The profile is absent if it could not be resolved yet;
/// the session is absent after a signup that still needs email confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthResponse {
    pub user: SessionUser,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
}

/// NavLink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NavLink {
    pub href: String,
    /// Localization key of the link label.
    pub label: String,
}

/// DashboardView
///
/// Everything the dashboard page needs for the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardView {
    pub profile: Profile,
    pub heading: String,
    pub links: Vec<NavLink>,
}

/// FinanceReport
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FinanceReport {
    pub summary: FinanceSummary,
    pub entries: Vec<FinanceEntry>,
}
