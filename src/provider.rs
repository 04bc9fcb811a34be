use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{Registration, Session, SessionUser},
};

// 1. AuthProvider Contract
/// AuthProvider
///
/// The boundary to the hosted auth service. The server calls it statelessly per request;
/// the client-side `SessionStore` wraps it to keep a current session.
///
/// Implementations: `SupabaseAuthClient` (GoTrue over HTTP) and `MockAuthProvider`
/// (in-memory, for tests).
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Password login. Wrong email or password is `AuthError::InvalidCredentials`.
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, AuthError>;

    /// Creates the auth user. An email that is already registered is `AuthError::AlreadyExists`.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Registration, AuthError>;

    /// Exchanges a refresh token for a new session of the same user. A revoked or unknown
    /// token is `AuthError::InvalidCredentials`. `email` is the current session's address,
    /// kept when the refreshed user comes back without one.
    async fn refresh_session(&self, refresh_token: &str, email: &str)
    -> Result<Session, AuthError>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// AuthProviderState
///
/// The concrete type used to share the auth provider across the application state.
pub type AuthProviderState = Arc<dyn AuthProvider>;

/// normalize_email
///
/// Trims and lowercases an email, rejecting anything without a single `@` between
/// two non-empty parts.
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

// 2. The Real Implementation (Supabase GoTrue)

/// GoTrue error body. Older servers answer with `error`/`error_description`, newer ones
/// with `error_code`/`msg`; some proxies only set `message`.
#[derive(Debug, Default, Deserialize)]
pub struct GoTrueError {
    error_code: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

impl GoTrueError {
    pub fn code(&self) -> &str {
        self.error_code
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    // Present on signup responses. Empty when GoTrue hides an existing account behind a
    // fake user (email confirmation enabled).
    #[serde(default)]
    identities: Option<Vec<Value>>,
}

impl GoTrueUser {
    fn into_session_user(self, fallback_email: &str) -> SessionUser {
        SessionUser {
            id: self.id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    user: GoTrueUser,
}

impl GoTrueSession {
    fn into_session(self, fallback_email: &str) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
            user: self.user.into_session_user(fallback_email),
        }
    }
}

/// Maps a failed password-grant response to an `AuthError`.
pub fn classify_sign_in_failure(status: StatusCode, body: &GoTrueError) -> AuthError {
    let credential_rejection = matches!(body.code(), "invalid_credentials" | "invalid_grant")
        || body.message().contains("Invalid login credentials");

    if (status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED)
        && credential_rejection
    {
        AuthError::InvalidCredentials
    } else {
        AuthError::Unexpected(format!("{}: {}", status, body.message()))
    }
}

/// Maps a failed signup response to an `AuthError`.
pub fn classify_sign_up_failure(status: StatusCode, body: &GoTrueError) -> AuthError {
    let message = body.message().to_ascii_lowercase();
    if matches!(body.code(), "user_already_exists" | "email_exists")
        || message.contains("already registered")
        || message.contains("already exists")
    {
        AuthError::AlreadyExists
    } else {
        AuthError::Unexpected(format!("{}: {}", status, body.message()))
    }
}

/// Interprets a successful signup body. GoTrue returns a full session when email
/// confirmation is off, and a bare user object otherwise.
pub fn parse_sign_up(body: Value, email: &str) -> Result<Registration, AuthError> {
    if body.get("access_token").is_some() {
        let session = serde_json::from_value::<GoTrueSession>(body)
            .map_err(|e| AuthError::Unexpected(format!("malformed signup session: {e}")))?
            .into_session(email);
        return Ok(Registration {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user_value = match body.get("user") {
        Some(user) if user.is_object() => user.clone(),
        _ => body,
    };
    let user = serde_json::from_value::<GoTrueUser>(user_value)
        .map_err(|e| AuthError::Unexpected(format!("malformed signup user: {e}")))?;

    if user.identities.as_ref().is_some_and(Vec::is_empty) {
        return Err(AuthError::AlreadyExists);
    }

    Ok(Registration {
        user: user.into_session_user(email),
        session: None,
    })
}

/// SupabaseAuthClient
///
/// `AuthProvider` over the Supabase GoTrue REST API (`{SUPABASE_URL}/auth/v1`).
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuthClient {
    pub fn new(supabase_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }

    fn unexpected(e: reqwest::Error) -> AuthError {
        AuthError::Unexpected(e.to_string())
    }

    async fn error_body(response: reqwest::Response) -> GoTrueError {
        response.json::<GoTrueError>().await.unwrap_or_default()
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let email = email.trim();
        let response = self
            .http
            .post(format!("{}/token?grant_type=password", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(Self::unexpected)?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::debug!(%status, code = body.code(), "password grant rejected");
            return Err(classify_sign_in_failure(status, &body));
        }

        let session = response
            .json::<GoTrueSession>()
            .await
            .map_err(Self::unexpected)?;
        Ok(session.into_session(email))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Registration, AuthError> {
        let email = email.trim();
        let response = self
            .http
            .post(format!("{}/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(Self::unexpected)?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::debug!(%status, code = body.code(), "signup rejected");
            return Err(classify_sign_up_failure(status, &body));
        }

        let body = response.json::<Value>().await.map_err(Self::unexpected)?;
        parse_sign_up(body, email)
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
        email: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(format!("{}/token?grant_type=refresh_token", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(Self::unexpected)?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            tracing::debug!(%status, code = body.code(), "refresh grant rejected");
            return Err(if status == StatusCode::BAD_REQUEST {
                AuthError::InvalidCredentials
            } else {
                AuthError::Unexpected(format!("{}: {}", status, body.message()))
            });
        }

        let session = response
            .json::<GoTrueSession>()
            .await
            .map_err(Self::unexpected)?;
        Ok(session.into_session(email))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(Self::unexpected)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = Self::error_body(response).await;
            Err(AuthError::Unexpected(format!("{}: {}", status, body.message())))
        }
    }
}

// 3. The Mock Implementation (For Tests)

#[derive(Clone)]
struct MockAccount {
    id: Uuid,
    password: String,
}

/// MockAuthProvider
///
/// In-memory `AuthProvider`. Accounts are keyed by normalized email; every signup returns
/// a session, as a project with email confirmation disabled would.
#[derive(Default)]
pub struct MockAuthProvider {
    accounts: Mutex<HashMap<String, MockAccount>>,
    // access token -> user id
    tokens: Mutex<HashMap<String, Uuid>>,
    // refresh token -> user
    refresh_tokens: Mutex<HashMap<String, SessionUser>>,
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Number of sessions issued and not yet signed out.
    pub fn active_sessions(&self) -> usize {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn issue(&self, user: SessionUser) -> Session {
        let access_token = format!("mock-access-{}", Uuid::new_v4());
        let refresh_token = format!("mock-refresh-{}", Uuid::new_v4());
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(access_token.clone(), user.id);
        self.refresh_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(refresh_token.clone(), user.clone());
        Session {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at: None,
            user,
        }
    }

    fn simulated_failure(&self) -> Result<(), AuthError> {
        if self.should_fail {
            Err(AuthError::Unexpected(
                "Mock Auth Error: Simulation requested".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.simulated_failure()?;
        let email = normalize_email(email).ok_or(AuthError::InvalidCredentials)?;

        let account = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&email)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        if account.password != password {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.issue(SessionUser {
            id: account.id,
            email,
        }))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Registration, AuthError> {
        self.simulated_failure()?;
        let email = normalize_email(email)
            .ok_or_else(|| AuthError::Unexpected("Unable to validate email address".to_string()))?;

        let id = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            if accounts.contains_key(&email) {
                return Err(AuthError::AlreadyExists);
            }
            let id = Uuid::new_v4();
            accounts.insert(
                email.clone(),
                MockAccount {
                    id,
                    password: password.to_string(),
                },
            );
            id
        };

        let user = SessionUser { id, email };
        let session = self.issue(user.clone());
        Ok(Registration {
            user,
            session: Some(session),
        })
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
        _email: &str,
    ) -> Result<Session, AuthError> {
        self.simulated_failure()?;
        // Refresh tokens are single use.
        let user = self
            .refresh_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(refresh_token)
            .ok_or(AuthError::InvalidCredentials)?;
        Ok(self.issue(user))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.simulated_failure()?;
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(access_token)
            .map(|_| ())
            .ok_or_else(|| AuthError::Unexpected("session not found".to_string()))
    }
}
