//! Runs `PostgresRepository` against a real Supabase Postgres (the `auth` schema must
//! exist). Ignored by default: `DATABASE_URL=... cargo test -- --ignored`.

use chrono::{Duration, Utc};
use community_portal::{
    error::RepoError,
    models::{
        CreateComplaintRequest, CreateEventRequest, CreateFinanceRequest, FinanceType, Profile,
        Role,
    },
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Inserts the auth user a profile row hangs off.
async fn create_auth_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO auth.users (id, email) VALUES ($1, $2)")
        .bind(id)
        .bind(format!("{}@test.com", id))
        .execute(pool)
        .await
        .expect("Failed to create auth user");
    id
}

async fn create_resident(repo: &PostgresRepository, pool: &PgPool) -> Uuid {
    let id = create_auth_user(pool).await;
    repo.insert_profile(Profile {
        id,
        full_name: Some("Test Resident".to_string()),
        role: Role::Resident,
    })
    .await
    .expect("Failed to create profile");
    id
}

// --- Tests ---

#[tokio::test]
#[ignore = "needs a Supabase Postgres at DATABASE_URL"]
async fn test_second_profile_for_same_user_conflicts() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = create_resident(&repo, &ctx.pool).await;

    let duplicate = repo
        .insert_profile(Profile {
            id,
            full_name: None,
            role: Role::Admin,
        })
        .await;

    assert!(matches!(duplicate, Err(RepoError::Conflict)));
    let stored = repo.get_profile(id).await.unwrap().expect("profile exists");
    assert_eq!(stored.role, Role::Resident);
    assert_eq!(stored.full_name.as_deref(), Some("Test Resident"));
}

#[tokio::test]
#[ignore = "needs a Supabase Postgres at DATABASE_URL"]
async fn test_missing_profile_is_none() {
    let ctx = DbTestContext::setup().await;

    let profile = ctx.repository().get_profile(Uuid::new_v4()).await.unwrap();

    assert_eq!(profile, None);
}

#[tokio::test]
#[ignore = "needs a Supabase Postgres at DATABASE_URL"]
async fn test_complaints_filtered_by_submitter() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let alice = create_resident(&repo, &ctx.pool).await;
    let bob = create_resident(&repo, &ctx.pool).await;

    for (user_id, title) in [(alice, "Streetlight out"), (alice, "Pothole"), (bob, "Noise")] {
        repo.create_complaint(
            CreateComplaintRequest {
                title: title.to_string(),
                description: "Near block C".to_string(),
            },
            user_id,
        )
        .await
        .expect("Failed to create complaint");
    }

    let own = repo.list_complaints(Some(alice)).await;
    assert_eq!(own.len(), 2);
    assert!(own.iter().all(|c| c.user_id == alice));

    let all = repo.list_complaints(None).await;
    assert!(all.iter().any(|c| c.user_id == bob));
    assert_eq!(all.iter().filter(|c| c.user_id == alice).count(), 2);
}

#[tokio::test]
#[ignore = "needs a Supabase Postgres at DATABASE_URL"]
async fn test_events_ordered_soonest_first() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let tag = Uuid::new_v4().to_string();
    let now = Utc::now();

    for (title, offset) in [("later", 30), ("soon", 2), ("middle", 10)] {
        repo.create_event(CreateEventRequest {
            title: title.to_string(),
            description: tag.clone(),
            event_date: now + Duration::days(offset),
            location: "Community Hall".to_string(),
        })
        .await
        .expect("Failed to create event");
    }

    let ours: Vec<String> = repo
        .list_events()
        .await
        .into_iter()
        .filter(|e| e.description == tag)
        .map(|e| e.title)
        .collect();
    assert_eq!(ours, ["soon", "middle", "later"]);
}

#[tokio::test]
#[ignore = "needs a Supabase Postgres at DATABASE_URL"]
async fn test_finance_entry_round_trip() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let created = repo
        .create_finance(CreateFinanceRequest {
            kind: FinanceType::Expense,
            amount: 1250.5,
            description: "Gate repair".to_string(),
        })
        .await
        .expect("Failed to record finance entry");
    assert_eq!(created.kind, FinanceType::Expense);

    let listed = repo
        .list_finances()
        .await
        .into_iter()
        .find(|f| f.id == created.id)
        .expect("entry listed");
    assert_eq!(listed.kind, FinanceType::Expense);
    assert_eq!(listed.amount, 1250.5);
    assert_eq!(listed.description, "Gate repair");
}

#[tokio::test]
#[ignore = "needs a Supabase Postgres at DATABASE_URL"]
async fn test_negative_amount_rejected_by_check_constraint() {
    let ctx = DbTestContext::setup().await;

    let result = ctx
        .repository()
        .create_finance(CreateFinanceRequest {
            kind: FinanceType::Income,
            amount: -1.0,
            description: "Bad entry".to_string(),
        })
        .await;

    assert!(matches!(result, Err(RepoError::Invalid(_))));
}
