use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::{Profile, Role},
    profiles::ProfileResolver,
};

/// Claims
///
/// The subset of a Supabase access token's payload this service relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the auth user id, which is also the `profiles` primary key.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    /// Audience: `authenticated` for signed-in users of a Supabase project.
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// AuthUser
///
/// The resolved identity of a request: the token's subject joined with its profile row.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub full_name: Option<String>,
}

impl AuthUser {
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            full_name: self.full_name.clone(),
            role: self.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Profile> for AuthUser {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            role: profile.role,
            full_name: profile.full_name,
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 1. An `AuthUser` already placed in the request extensions by the role gate.
/// 2. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing profile.
/// 3. A Bearer JWT signed with the project secret, whose subject has a profile row.
///
/// Rejection: `401 Unauthorized` on any failure, including a valid token for a user whose
/// profile has not been created yet.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    ProfileResolver: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let profiles = ProfileResolver::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());
            if let Some(user_id) = bypass {
                if let Ok(profile) = profiles.fetch(user_id).await {
                    tracing::debug!(%user_id, "authenticated through local x-user-id bypass");
                    return Ok(profile.into());
                }
            }
        }

        let token = bearer_token(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.set_audience(&[config.jwt_audience.as_str()]);

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("expired access token"),
                kind => tracing::debug!(?kind, "rejected access token"),
            }
            StatusCode::UNAUTHORIZED
        })?;

        let user_id = token_data.claims.sub;
        // The resolver logs anything other than a missing row.
        profiles
            .fetch(user_id)
            .await
            .map(AuthUser::from)
            .map_err(|_| StatusCode::UNAUTHORIZED)
    }
}
