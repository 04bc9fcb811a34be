//! Auth Session Manager: the actor that owns the current user/profile pair.
//!
//! The manager task consumes `SessionEvent`s in arrival order. Each event that changes who
//! is signed in starts a new identity epoch and spawns a profile fetch tagged with it; a
//! fetch that completes after its epoch was superseded is discarded. Fetch tasks belong
//! to the manager and are aborted with it. Readers get `AuthSnapshot`s through a watch
//! channel via `SessionHandle`.

use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use crate::{
    error::{AuthError, FetchError},
    gate::{self, GateDecision},
    models::{NavLink, Profile, Role, Session, SessionUser},
    profiles::ProfileResolver,
    session::{SessionEvent, SessionStore, Subscription},
};

/// AuthSnapshot
///
/// What the UI reads: the signed-in user, their profile, whether identity is still
/// resolving, and the session generation this snapshot reflects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<SessionUser>,
    pub profile: Option<Profile>,
    pub loading: bool,
    pub generation: u64,
}

impl AuthSnapshot {
    pub fn gate(&self, required: &[Role]) -> GateDecision {
        gate::decide(required, self.profile.as_ref(), self.loading)
    }

    pub fn navigate(&self, path: &str) -> GateDecision {
        gate::navigate(path, self.profile.as_ref(), self.loading)
    }

    /// Signed-out links until the profile is resolved.
    pub fn nav_links(&self) -> Vec<NavLink> {
        if self.loading {
            gate::nav_links(None)
        } else {
            gate::nav_links(self.profile.as_ref())
        }
    }
}

struct Resolution {
    epoch: u64,
    user_id: Uuid,
    result: Result<Profile, FetchError>,
}

/// SessionManager
pub struct SessionManager {
    store: Arc<SessionStore>,
    profiles: ProfileResolver,
    state: watch::Sender<AuthSnapshot>,
    // In-flight profile fetches. Dropping the manager aborts them.
    fetches: JoinSet<Resolution>,
    // Generation of the last applied event.
    generation: u64,
    // Generation of the event that established the current identity. Token refreshes
    // advance `generation` but not the epoch, so an in-flight fetch stays valid.
    epoch: u64,
}

impl SessionManager {
    /// Starts the manager task and returns the handle to it. The session-change
    /// subscription is taken before the current session is read, so no change can slip
    /// between the two.
    pub fn spawn(store: Arc<SessionStore>, profiles: ProfileResolver) -> SessionHandle {
        let subscription = store.subscribe();
        let (state, state_rx) = watch::channel(AuthSnapshot {
            loading: true,
            ..AuthSnapshot::default()
        });

        let manager = SessionManager {
            store: store.clone(),
            profiles: profiles.clone(),
            state,
            fetches: JoinSet::new(),
            generation: 0,
            epoch: 0,
        };
        let task = tokio::spawn(manager.run(subscription));

        SessionHandle {
            store,
            profiles,
            state: state_rx,
            _task: Arc::new(TaskGuard(task)),
        }
    }

    async fn run(mut self, mut subscription: Subscription) {
        let (generation, session) = self.store.current();
        self.resync(generation, session);

        loop {
            tokio::select! {
                event = subscription.recv() => match event {
                    Ok(event) => self.on_event(event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session events dropped, resynchronizing");
                        let (generation, session) = self.store.current();
                        self.resync(generation, session);
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(joined) = self.fetches.join_next() => match joined {
                    Ok(resolution) => self.on_resolution(resolution),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => tracing::error!(error = %e, "profile fetch task failed"),
                },
            }
        }
        tracing::debug!("session manager stopped");
    }

    fn resync(&mut self, generation: u64, session: Option<Session>) {
        if generation < self.generation {
            return;
        }
        match session {
            Some(session) => {
                let same_user = self.state.borrow().user.as_ref() == Some(&session.user);
                if same_user && generation == self.generation {
                    return;
                }
                self.begin(generation, session.user);
            }
            None => self.clear(generation),
        }
    }

    fn on_event(&mut self, event: SessionEvent) {
        if event.generation() <= self.generation {
            tracing::debug!(generation = event.generation(), "ignoring already-applied session event");
            return;
        }

        match event {
            SessionEvent::SignedIn {
                generation,
                session,
            } => self.begin(generation, session.user),
            SessionEvent::TokenRefreshed {
                generation,
                session,
            } => {
                let same_user = self.state.borrow().user.as_ref() == Some(&session.user);
                if same_user {
                    self.generation = generation;
                    self.state.send_modify(|s| s.generation = generation);
                } else {
                    self.begin(generation, session.user);
                }
            }
            SessionEvent::SignedOut { generation } => self.clear(generation),
        }
    }

    /// A new identity: publish it as loading and resolve its profile off-task. Fetches for
    /// earlier identities are cancelled.
    fn begin(&mut self, generation: u64, user: SessionUser) {
        self.generation = generation;
        self.epoch = generation;
        self.fetches.abort_all();
        let user_id = user.id;

        self.state.send_replace(AuthSnapshot {
            user: Some(user),
            profile: None,
            loading: true,
            generation,
        });

        let profiles = self.profiles.clone();
        self.fetches.spawn(async move {
            Resolution {
                epoch: generation,
                user_id,
                result: profiles.fetch(user_id).await,
            }
        });
    }

    fn clear(&mut self, generation: u64) {
        self.generation = generation;
        self.epoch = generation;
        self.fetches.abort_all();
        self.state.send_replace(AuthSnapshot {
            user: None,
            profile: None,
            loading: false,
            generation,
        });
    }

    fn on_resolution(&mut self, resolution: Resolution) {
        if resolution.epoch != self.epoch {
            tracing::debug!(
                user_id = %resolution.user_id,
                epoch = resolution.epoch,
                current = self.epoch,
                "discarding profile of a superseded session"
            );
            return;
        }

        // NotFound and store failures both leave the profile empty; the resolver has
        // already logged anything unexpected.
        let profile = resolution.result.ok();
        self.state.send_modify(|s| {
            s.profile = profile;
            s.loading = false;
        });
    }
}

struct TaskGuard(JoinHandle<()>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// SessionHandle
///
/// Cloneable access to a running `SessionManager`. The manager task, and with it the
/// session-change subscription, lives until the last handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    store: Arc<SessionStore>,
    profiles: ProfileResolver,
    state: watch::Receiver<AuthSnapshot>,
    _task: Arc<TaskGuard>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.clone()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Waits until the initial session and its profile are resolved.
    pub async fn ready(&self) -> AuthSnapshot {
        match self.settled(0).await {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Waits for a snapshot at or past `generation` that is no longer loading.
    async fn settled(&self, generation: u64) -> Result<AuthSnapshot, AuthError> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| s.generation >= generation && !s.loading)
            .await
            .map(|s| s.clone())
            .map_err(|_| AuthError::Unexpected("session manager stopped".to_string()))
    }

    /// login
    ///
    /// On success, returns once the new session's profile has been resolved. On failure
    /// the session and profile are left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSnapshot, AuthError> {
        let generation = self.store.sign_in_with_password(email, password).await?;
        tracing::info!(generation, "login succeeded");
        self.settled(generation).await
    }

    /// signup
    ///
    /// Creates the auth user, then its `resident` profile, and only then establishes the
    /// session, so profile resolution never races the insert. A duplicate email, whether
    /// reported by the provider or by the profile store, is `AlreadyExists`.
    pub async fn signup(&self, email: &str, password: &str) -> Result<AuthSnapshot, AuthError> {
        let registration = self.store.sign_up(email, password).await?;

        self.profiles
            .create(registration.user.id, Role::Resident)
            .await?;

        match registration.session {
            Some(session) => {
                let generation = self.store.establish(session);
                self.settled(generation).await
            }
            None => {
                tracing::info!(user_id = %registration.user.id, "signup awaiting email confirmation");
                Ok(self.snapshot())
            }
        }
    }

    /// logout
    ///
    /// Always ends with user and profile cleared. Provider failures are logged by the store.
    pub async fn logout(&self) -> AuthSnapshot {
        let generation = self.store.sign_out().await;
        match self.settled(generation).await {
            Ok(snapshot) => snapshot,
            Err(_) => AuthSnapshot {
                generation,
                ..AuthSnapshot::default()
            },
        }
    }

    /// Rotates the session tokens. The profile is kept.
    pub async fn refresh(&self) -> Result<AuthSnapshot, AuthError> {
        let generation = self.store.refresh().await?;
        self.settled(generation).await
    }
}
