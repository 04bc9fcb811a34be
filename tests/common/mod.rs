#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use community_portal::{
    AppState,
    auth::Claims,
    config::{AppConfig, Env},
    error::RepoError,
    models::{
        Complaint, ComplaintStatus, CreateComplaintRequest, CreateEventRequest,
        CreateFinanceRequest, CreateNoticeRequest, Event, FinanceEntry, Notice, Profile, Resident,
        Role,
    },
    provider::{AuthProviderState, MockAuthProvider},
    repository::{Repository, RepositoryState},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

// --- In-Memory Repository ---

/// Table store double. Lists come back newest first, like the Postgres queries.
#[derive(Default)]
pub struct InMemoryRepo {
    residents: Mutex<Vec<Resident>>,
    notices: Mutex<Vec<Notice>>,
    events: Mutex<Vec<Event>>,
    complaints: Mutex<Vec<Complaint>>,
    finances: Mutex<Vec<FinanceEntry>>,
    // Per-user latency injected into `get_profile`.
    fetch_delays: Mutex<HashMap<Uuid, Duration>>,
    fail_profile_reads: AtomicBool,
    // `get_profile` calls that ran to completion.
    completed_fetches: AtomicUsize,
}

impl InMemoryRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_profile(&self, id: Uuid, role: Role) {
        self.residents.lock().unwrap().insert(
            0,
            Resident {
                id,
                role,
                created_at: Utc::now(),
                ..Resident::default()
            },
        );
    }

    pub fn profile_count(&self, id: Uuid) -> usize {
        self.residents
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.id == id)
            .count()
    }

    pub fn set_role(&self, id: Uuid, role: Role) {
        for resident in self.residents.lock().unwrap().iter_mut() {
            if resident.id == id {
                resident.role = role;
            }
        }
    }

    pub fn delay_fetch(&self, id: Uuid, delay: Duration) {
        self.fetch_delays.lock().unwrap().insert(id, delay);
    }

    pub fn completed_fetches(&self) -> usize {
        self.completed_fetches.load(Ordering::SeqCst)
    }

    pub fn fail_profile_reads(&self) {
        self.fail_profile_reads.store(true, Ordering::SeqCst);
    }

    pub fn seed_finance(&self, entry: FinanceEntry) {
        self.finances.lock().unwrap().insert(0, entry);
    }

    pub fn seed_complaint(&self, user_id: Uuid, title: &str) -> Complaint {
        let complaint = Complaint {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            description: format!("{title} details"),
            status: ComplaintStatus::Pending,
            created_at: Utc::now(),
        };
        self.complaints.lock().unwrap().insert(0, complaint.clone());
        complaint
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        let delay = self.fetch_delays.lock().unwrap().get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.completed_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_profile_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .residents
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| Profile {
                id: r.id,
                full_name: r.full_name.clone(),
                role: r.role,
            }))
    }

    async fn insert_profile(&self, profile: Profile) -> Result<Profile, RepoError> {
        let mut residents = self.residents.lock().unwrap();
        if residents.iter().any(|r| r.id == profile.id) {
            return Err(RepoError::Conflict);
        }
        residents.insert(
            0,
            Resident {
                id: profile.id,
                full_name: profile.full_name.clone(),
                role: profile.role,
                created_at: Utc::now(),
                ..Resident::default()
            },
        );
        Ok(profile)
    }

    async fn list_residents(&self) -> Vec<Resident> {
        self.residents.lock().unwrap().clone()
    }

    async fn list_notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    async fn create_notice(&self, req: CreateNoticeRequest) -> Result<Notice, RepoError> {
        let notice = Notice {
            id: Uuid::new_v4(),
            title: req.title,
            content: req.content,
            created_at: Utc::now(),
        };
        self.notices.lock().unwrap().insert(0, notice.clone());
        Ok(notice)
    }

    async fn list_events(&self) -> Vec<Event> {
        let mut events = self.events.lock().unwrap().clone();
        events.sort_by_key(|e| e.event_date);
        events
    }

    async fn create_event(&self, req: CreateEventRequest) -> Result<Event, RepoError> {
        let event = Event {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            event_date: req.event_date,
            location: req.location,
            created_at: Utc::now(),
        };
        self.events.lock().unwrap().push(event.clone());
        Ok(event)
    }

    async fn list_complaints(&self, submitted_by: Option<Uuid>) -> Vec<Complaint> {
        self.complaints
            .lock()
            .unwrap()
            .iter()
            .filter(|c| submitted_by.is_none_or(|id| c.user_id == id))
            .cloned()
            .collect()
    }

    async fn create_complaint(
        &self,
        req: CreateComplaintRequest,
        user_id: Uuid,
    ) -> Result<Complaint, RepoError> {
        let complaint = Complaint {
            id: Uuid::new_v4(),
            user_id,
            title: req.title,
            description: req.description,
            status: ComplaintStatus::Pending,
            created_at: Utc::now(),
        };
        self.complaints.lock().unwrap().insert(0, complaint.clone());
        Ok(complaint)
    }

    async fn set_complaint_status(
        &self,
        id: Uuid,
        status: ComplaintStatus,
    ) -> Result<Option<Complaint>, RepoError> {
        let mut complaints = self.complaints.lock().unwrap();
        Ok(complaints.iter_mut().find(|c| c.id == id).map(|c| {
            c.status = status;
            c.clone()
        }))
    }

    async fn list_finances(&self) -> Vec<FinanceEntry> {
        self.finances.lock().unwrap().clone()
    }

    async fn create_finance(&self, req: CreateFinanceRequest) -> Result<FinanceEntry, RepoError> {
        let entry = FinanceEntry {
            id: Uuid::new_v4(),
            kind: req.kind,
            amount: req.amount,
            description: req.description,
            created_at: Utc::now(),
        };
        self.finances.lock().unwrap().insert(0, entry.clone());
        Ok(entry)
    }
}

// --- App State & Tokens ---

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

pub fn create_app_state(env: Env, repo: Arc<InMemoryRepo>, auth: Arc<MockAuthProvider>) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState {
        repo: repo as RepositoryState,
        auth: auth as AuthProviderState,
        config,
    }
}

/// A token signed with `TEST_JWT_SECRET`. Negative offsets produce expired tokens.
pub fn create_token(user_id: Uuid, exp_offset: i64, audience: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
        aud: audience.to_string(),
        email: Some("resident@example.com".to_string()),
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}
