//! Client-side mirror of the hosted auth session.
//!
//! `SessionStore` wraps an `AuthProvider`, keeps the current session and publishes every
//! change on a broadcast channel. Each change gets the next generation number, assigned
//! under the same lock that swaps the session, so subscribers see events in generation
//! order.

use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::{
    error::AuthError,
    models::{Registration, Session},
    provider::AuthProviderState,
};

const EVENT_CAPACITY: usize = 16;

/// SessionEvent
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn { generation: u64, session: Session },
    /// Same user, new tokens.
    TokenRefreshed { generation: u64, session: Session },
    SignedOut { generation: u64 },
}

impl SessionEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SessionEvent::SignedIn { generation, .. }
            | SessionEvent::TokenRefreshed { generation, .. }
            | SessionEvent::SignedOut { generation } => *generation,
        }
    }
}

/// Subscription
///
/// A registration for session-change notifications. Dropping it deregisters.
pub struct Subscription {
    rx: broadcast::Receiver<SessionEvent>,
}

impl Subscription {
    /// Next event in arrival order. `Lagged` means events were dropped and the subscriber
    /// should resynchronize from `SessionStore::current`.
    pub async fn recv(&mut self) -> Result<SessionEvent, broadcast::error::RecvError> {
        self.rx.recv().await
    }
}

#[derive(Default)]
struct StoreState {
    generation: u64,
    current: Option<Session>,
}

/// SessionStore
pub struct SessionStore {
    provider: AuthProviderState,
    state: Mutex<StoreState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(provider: AuthProviderState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            state: Mutex::new(StoreState::default()),
            events,
        }
    }

    /// The current generation and session, read atomically.
    pub fn current(&self) -> (u64, Option<Session>) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (state.generation, state.current.clone())
    }

    pub fn get_session(&self) -> Option<Session> {
        self.current().1
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.events.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Password login. On failure nothing changes and no event is published.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<u64, AuthError> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        Ok(self.establish(session))
    }

    /// Creates the auth user only. The caller decides when to `establish` the returned
    /// session, so the profile row can be written before anyone resolves it.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Registration, AuthError> {
        self.provider.sign_up(email, password).await
    }

    /// Makes `session` current and announces it.
    pub fn establish(&self, session: Session) -> u64 {
        let announced = session.clone();
        self.commit(Some(session), move |generation| SessionEvent::SignedIn {
            generation,
            session: announced,
        })
    }

    /// Exchanges the current refresh token for a new session. Fails without changes when
    /// there is no session or the provider rejects the token.
    pub async fn refresh(&self) -> Result<u64, AuthError> {
        let current = self.get_session().ok_or(AuthError::InvalidCredentials)?;
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        let session = self
            .provider
            .refresh_session(refresh_token, &current.user.email)
            .await?;
        let announced = session.clone();
        Ok(self.commit(Some(session), move |generation| {
            SessionEvent::TokenRefreshed {
                generation,
                session: announced,
            }
        }))
    }

    /// Revokes the session at the provider and clears it locally. Provider failures are
    /// logged; the local session is cleared regardless.
    pub async fn sign_out(&self) -> u64 {
        if let Some(session) = self.get_session() {
            if let Err(e) = self.provider.sign_out(&session.access_token).await {
                tracing::warn!(user_id = %session.user.id, error = %e, "provider sign-out failed");
            }
        }
        self.commit(None, |generation| SessionEvent::SignedOut { generation })
    }

    fn commit<F>(&self, session: Option<Session>, event: F) -> u64
    where
        F: FnOnce(u64) -> SessionEvent,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        state.current = session;
        let generation = state.generation;
        // No subscribers is fine; the new state is still readable through `current`.
        let _ = self.events.send(event(generation));
        generation
    }
}
