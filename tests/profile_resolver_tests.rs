mod common;

use common::InMemoryRepo;
use community_portal::{
    error::FetchError,
    models::Role,
    profiles::ProfileResolver,
    repository::RepositoryState,
};
use uuid::Uuid;

fn resolver(repo: &std::sync::Arc<InMemoryRepo>) -> ProfileResolver {
    ProfileResolver::new(repo.clone() as RepositoryState)
}

#[tokio::test]
async fn test_fetch_missing_profile_is_not_found() {
    let repo = InMemoryRepo::new();

    let result = resolver(&repo).fetch(Uuid::new_v4()).await;

    assert_eq!(result, Err(FetchError::NotFound));
}

#[tokio::test]
async fn test_fetch_existing_profile() {
    let repo = InMemoryRepo::new();
    let id = Uuid::new_v4();
    repo.seed_profile(id, Role::Admin);

    let profile = resolver(&repo).fetch(id).await.unwrap();

    assert_eq!(profile.id, id);
    assert_eq!(profile.role, Role::Admin);
}

#[tokio::test]
async fn test_fetch_store_failure_is_unexpected() {
    let repo = InMemoryRepo::new();
    let id = Uuid::new_v4();
    repo.seed_profile(id, Role::Resident);
    repo.fail_profile_reads();

    let result = resolver(&repo).fetch(id).await;

    assert!(matches!(result, Err(FetchError::Unexpected(_))));
}

#[tokio::test]
async fn test_create_then_duplicate() {
    let repo = InMemoryRepo::new();
    let profiles = resolver(&repo);
    let id = Uuid::new_v4();

    let created = profiles.create(id, Role::Resident).await.unwrap();
    assert_eq!(created.role, Role::Resident);
    assert_eq!(created.full_name, None);

    let again = profiles.create(id, Role::Admin).await;
    assert_eq!(again, Err(FetchError::AlreadyExists));
    assert_eq!(repo.profile_count(id), 1);
    assert_eq!(profiles.fetch(id).await.unwrap().role, Role::Resident);
}
