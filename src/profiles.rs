use uuid::Uuid;

use crate::{
    error::{FetchError, RepoError},
    models::{Profile, Role},
    repository::RepositoryState,
};

/// ProfileResolver
///
/// Fetches and creates the single role record each user has. Cheap to clone; shared by
/// the `AuthUser` extractor, the signup handler and the session manager.
#[derive(Clone)]
pub struct ProfileResolver {
    repo: RepositoryState,
}

impl ProfileResolver {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// fetch
    ///
    /// `NotFound` is an expected outcome (the profile insert of a fresh signup may not have
    /// landed yet) and is not logged as an error. Every other failure is logged here and
    /// returned as `Unexpected`.
    pub async fn fetch(&self, user_id: Uuid) -> Result<Profile, FetchError> {
        match self.repo.get_profile(user_id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => {
                tracing::debug!(%user_id, "no profile row yet");
                Err(FetchError::NotFound)
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "profile fetch failed");
                Err(FetchError::Unexpected(e.to_string()))
            }
        }
    }

    /// create
    ///
    /// Inserts the profile for a newly registered user. Not idempotent: a second call for
    /// the same `user_id` is rejected by the store and reported as `AlreadyExists`.
    pub async fn create(&self, user_id: Uuid, role: Role) -> Result<Profile, FetchError> {
        let profile = Profile {
            id: user_id,
            full_name: None,
            role,
        };

        match self.repo.insert_profile(profile).await {
            Ok(created) => {
                tracing::info!(%user_id, role = created.role.as_str(), "profile created");
                Ok(created)
            }
            Err(RepoError::Conflict) => {
                tracing::warn!(%user_id, "profile already exists");
                Err(FetchError::AlreadyExists)
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "profile creation failed");
                Err(FetchError::Unexpected(e.to_string()))
            }
        }
    }
}
