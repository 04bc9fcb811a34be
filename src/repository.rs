use crate::{
    error::RepoError,
    models::{
        Complaint, ComplaintStatus, CreateComplaintRequest, CreateEventRequest,
        CreateFinanceRequest, CreateNoticeRequest, Event, FinanceEntry, Notice, Profile, Resident,
    },
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The table-store boundary. Handlers, the profile resolver and the session manager only
/// ever see `Arc<dyn Repository>`, so tests swap in an in-memory store.
///
/// List reads never fail: a store error is logged and the caller gets an empty list,
/// which the pages render as "no items". Writes and the profile lookup report errors.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profiles ---
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError>;
    // Fails with `RepoError::Conflict` if a profile already exists for `id`.
    async fn insert_profile(&self, profile: Profile) -> Result<Profile, RepoError>;
    // Roster for the admin residents page, newest first.
    async fn list_residents(&self) -> Vec<Resident>;

    // --- Notices & Events ---
    async fn list_notices(&self) -> Vec<Notice>;
    async fn create_notice(&self, req: CreateNoticeRequest) -> Result<Notice, RepoError>;
    // Ordered by event date, soonest first.
    async fn list_events(&self) -> Vec<Event>;
    async fn create_event(&self, req: CreateEventRequest) -> Result<Event, RepoError>;

    // --- Complaints ---
    // `submitted_by = None` lists every complaint (admin view).
    async fn list_complaints(&self, submitted_by: Option<Uuid>) -> Vec<Complaint>;
    async fn create_complaint(
        &self,
        req: CreateComplaintRequest,
        user_id: Uuid,
    ) -> Result<Complaint, RepoError>;
    async fn set_complaint_status(
        &self,
        id: Uuid,
        status: ComplaintStatus,
    ) -> Result<Option<Complaint>, RepoError>;

    // --- Finances ---
    async fn list_finances(&self) -> Vec<FinanceEntry>;
    async fn create_finance(&self, req: CreateFinanceRequest) -> Result<FinanceEntry, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        sqlx::query_as::<_, Profile>("SELECT id, full_name, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::from)
    }

    /// insert_profile
    ///
    /// Plain INSERT, no `ON CONFLICT`: a second profile for the same user must surface as
    /// `Conflict` so signup can report the duplicate.
    async fn insert_profile(&self, profile: Profile) -> Result<Profile, RepoError> {
        sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (id, full_name, role) VALUES ($1, $2, $3) RETURNING id, full_name, role",
        )
        .bind(profile.id)
        .bind(profile.full_name)
        .bind(profile.role)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::classify)
    }

    async fn list_residents(&self) -> Vec<Resident> {
        sqlx::query_as::<_, Resident>(
            "SELECT id, full_name, address, phone, role, created_at FROM profiles ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_residents error: {:?}", e);
            vec![]
        })
    }

    async fn list_notices(&self) -> Vec<Notice> {
        sqlx::query_as::<_, Notice>(
            "SELECT id, title, content, created_at FROM notices ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_notices error: {:?}", e);
            vec![]
        })
    }

    async fn create_notice(&self, req: CreateNoticeRequest) -> Result<Notice, RepoError> {
        sqlx::query_as::<_, Notice>(
            "INSERT INTO notices (id, title, content, created_at) VALUES ($1, $2, $3, NOW()) RETURNING id, title, content, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.title)
        .bind(req.content)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::classify)
    }

    async fn list_events(&self) -> Vec<Event> {
        sqlx::query_as::<_, Event>(
            "SELECT id, title, description, event_date, location, created_at FROM events ORDER BY event_date ASC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_events error: {:?}", e);
            vec![]
        })
    }

    async fn create_event(&self, req: CreateEventRequest) -> Result<Event, RepoError> {
        sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (id, title, description, event_date, location, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, title, description, event_date, location, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.title)
        .bind(req.description)
        .bind(req.event_date)
        .bind(req.location)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::classify)
    }

    /// list_complaints
    ///
    /// The server talks to Postgres directly, bypassing row-level security, so the
    /// "residents only see their own complaints" rule is applied here.
    async fn list_complaints(&self, submitted_by: Option<Uuid>) -> Vec<Complaint> {
        let query = match submitted_by {
            Some(user_id) => sqlx::query_as::<_, Complaint>(
                "SELECT id, user_id, title, description, status, created_at FROM complaints WHERE user_id = $1 ORDER BY created_at DESC",
            )
            .bind(user_id),
            None => sqlx::query_as::<_, Complaint>(
                "SELECT id, user_id, title, description, status, created_at FROM complaints ORDER BY created_at DESC",
            ),
        };

        query.fetch_all(&self.pool).await.unwrap_or_else(|e| {
            tracing::error!("list_complaints error: {:?}", e);
            vec![]
        })
    }

    async fn create_complaint(
        &self,
        req: CreateComplaintRequest,
        user_id: Uuid,
    ) -> Result<Complaint, RepoError> {
        sqlx::query_as::<_, Complaint>(
            r#"
            INSERT INTO complaints (id, user_id, title, description, status, created_at)
            VALUES ($1, $2, $3, $4, 'pending', NOW())
            RETURNING id, user_id, title, description, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.title)
        .bind(req.description)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::classify)
    }

    async fn set_complaint_status(
        &self,
        id: Uuid,
        status: ComplaintStatus,
    ) -> Result<Option<Complaint>, RepoError> {
        sqlx::query_as::<_, Complaint>(
            "UPDATE complaints SET status = $1 WHERE id = $2 RETURNING id, user_id, title, description, status, created_at",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from)
    }

    async fn list_finances(&self) -> Vec<FinanceEntry> {
        sqlx::query_as::<_, FinanceEntry>(
            "SELECT id, type, amount, description, created_at FROM finances ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("list_finances error: {:?}", e);
            vec![]
        })
    }

    async fn create_finance(&self, req: CreateFinanceRequest) -> Result<FinanceEntry, RepoError> {
        sqlx::query_as::<_, FinanceEntry>(
            r#"
            INSERT INTO finances (id, type, amount, description, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, type, amount, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.kind)
        .bind(req.amount)
        .bind(req.description)
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::classify)
    }
}

