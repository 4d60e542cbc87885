//! Authenticated-session state and its mutators.
//!
//! [`SessionStore`] is the single source of truth for who is logged in. It is
//! an explicit container: construct one per client (or per test) and hand
//! clones to whatever needs it. State is published through a
//! [`tokio::sync::watch`] channel so views can re-render on change.
//!
//! # Restore and revalidation
//!
//! [`check_auth`](SessionStore::check_auth) restores a snapshot from durable
//! storage and confirms it with the backend. Every mutation that replaces the
//! session bumps a generation counter; the revalidation result is applied only
//! if the counter still holds the value captured before the request, so a
//! logout (or a fresh login) that lands while revalidation is in flight always
//! wins.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use reqwest::Method;
use tokio::sync::watch;

use crate::config::RestorePolicy;
use crate::endpoints;
use crate::error::Error;
use crate::forms::RegistrationForm;
use crate::gateway::ApiGateway;
use crate::types::{AuthResponse, User};

/// Snapshot of the session: identity plus the initial-restore flag.
///
/// Authentication is derived from the identity, so an authenticated state
/// without an identity cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    user: Option<User>,
    loading: bool,
}

impl SessionState {
    /// State at process start: nobody logged in, restore pending.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }

    /// The same state with the restore finished.
    #[must_use]
    pub fn settled(mut self) -> Self {
        self.loading = false;
        self
    }

    /// The same state with `user` logged in.
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// Logged-in identity, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Whether the initial restore is still running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(serde::Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

struct Inner {
    gateway: Arc<ApiGateway>,
    restore_policy: RestorePolicy,
    state: watch::Sender<SessionState>,
    /// Bumped by every session replacement. Only touched inside `state`'s
    /// modify closures, which serializes it with the state itself.
    generation: AtomicU64,
    restore_started: AtomicBool,
}

impl Inner {
    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Drop the in-memory session. Storage is the caller's business.
    fn clear_state(&self, reason: &'static str) {
        self.state.send_if_modified(|state| {
            self.bump();
            let had_user = state.user.take().is_some();
            if had_user {
                tracing::info!(reason, "Session cleared");
            }
            had_user
        });
    }
}

/// Holds the current identity and exposes the only legitimate mutators.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Create a store and subscribe it to the gateway's unauthorized callback.
    ///
    /// The gateway only holds a weak reference, so dropping every store clone
    /// ends the subscription's effect.
    #[must_use]
    pub fn new(gateway: Arc<ApiGateway>, restore_policy: RestorePolicy) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        let inner = Arc::new(Inner {
            gateway,
            restore_policy,
            state,
            generation: AtomicU64::new(0),
            restore_started: AtomicBool::new(false),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.gateway.on_unauthorized(move || {
            if let Some(inner) = weak.upgrade() {
                inner.clear_state("unauthorized response");
            }
        });

        Self { inner }
    }

    /// Gateway the store sends through.
    #[must_use]
    pub fn gateway(&self) -> &Arc<ApiGateway> {
        &self.inner.gateway
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Logged-in identity, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Whether the initial restore is still running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Propagates the gateway error (bad credentials surface as
    /// [`Error::Api`]) or a storage error. State is untouched on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        let body = LoginRequest { email, password };
        let auth: AuthResponse = self.inner.gateway.post(endpoints::auth::LOGIN, &body).await?;
        self.establish(auth)
    }

    /// Create an account and log into it.
    ///
    /// The form is sent as given; validate it first.
    ///
    /// # Errors
    ///
    /// As [`login`](Self::login).
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, Error> {
        let auth: AuthResponse = self
            .inner
            .gateway
            .post(endpoints::auth::REGISTER, form)
            .await?;
        self.establish(auth)
    }

    /// Tear the session down locally. Idempotent, never fails.
    pub fn logout(&self) {
        let storage = self.inner.gateway.storage();
        self.inner.state.send_if_modified(|state| {
            self.inner.bump();
            storage.clear_logged();
            state.user.take().is_some()
        });
        tracing::info!("Logged out");
    }

    /// Tell the backend the session is over, then [`logout`](Self::logout).
    ///
    /// The notice is best-effort: its failure is logged and the local
    /// teardown happens regardless.
    pub async fn sign_out(&self) {
        if self.is_authenticated() {
            if let Err(e) = self
                .inner
                .gateway
                .send_empty::<()>(Method::POST, endpoints::auth::LOGOUT, None)
                .await
            {
                tracing::warn!(error = %e, "Logout notice failed");
            }
        }
        self.logout();
    }

    /// Restore the session from durable storage and revalidate it.
    ///
    /// Runs once per store; later calls return immediately. `loading` is set
    /// to false exactly once, whichever branch is taken. A snapshot the
    /// backend rejects is dropped silently.
    pub async fn check_auth(&self) {
        if self.inner.restore_started.swap(true, Ordering::AcqRel) {
            tracing::debug!("Session restore already ran");
            return;
        }

        let storage = self.inner.gateway.storage();
        let (Some(_), Some(snapshot)) = (storage.credential(), storage.snapshot()) else {
            tracing::debug!("No persisted session");
            self.finish_loading();
            return;
        };
        let user: User = match serde_json::from_str(&snapshot) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session snapshot");
                storage.clear_logged();
                self.finish_loading();
                return;
            }
        };

        match self.inner.restore_policy {
            RestorePolicy::Optimistic => {
                let generation = self.adopt(user);
                self.finish_loading();
                if let Err(e) = self.revalidate().await {
                    self.revert(generation, &e);
                }
            }
            RestorePolicy::Strict => {
                let generation = self.inner.generation.load(Ordering::Acquire);
                match self.revalidate().await {
                    Ok(()) => self.confirm(generation, user),
                    Err(e) => self.revert(generation, &e),
                }
                self.finish_loading();
            }
        }
    }

    /// Replace the identity and re-persist its snapshot. The credential is
    /// left alone. Without an active session this is a no-op, so a profile
    /// update completing after logout cannot resurrect anything.
    ///
    /// # Errors
    ///
    /// Returns a storage error; state is untouched in that case.
    pub fn update_user(&self, user: User) -> Result<(), Error> {
        let storage = self.inner.gateway.storage();
        let mut result = Ok(());
        self.inner.state.send_if_modified(|state| {
            if state.user.is_none() {
                tracing::debug!(user_id = %user.id, "Ignoring profile update without a session");
                return false;
            }
            result = storage.persist_user(&user);
            if result.is_err() {
                return false;
            }
            state.user = Some(user);
            true
        });
        result
    }

    fn establish(&self, auth: AuthResponse) -> Result<User, Error> {
        let storage = self.inner.gateway.storage();
        let user = auth.user;
        let mut result = Ok(());
        self.inner.state.send_if_modified(|state| {
            result = storage.persist(&auth.token, &user);
            if result.is_err() {
                return false;
            }
            self.inner.bump();
            state.user = Some(user.clone());
            true
        });
        result?;
        tracing::info!(user_id = %user.id, role = %user.role, "Session established");
        Ok(user)
    }

    /// Phase one of an optimistic restore. Returns the generation the
    /// revalidation result must match.
    fn adopt(&self, user: User) -> u64 {
        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            generation = self.inner.bump();
            tracing::debug!(user_id = %user.id, "Adopted persisted session");
            state.user = Some(user);
        });
        generation
    }

    async fn revalidate(&self) -> Result<(), Error> {
        self.inner
            .gateway
            .send_empty::<()>(Method::GET, endpoints::auth::ME, None)
            .await
    }

    /// Strict restore succeeded: adopt the snapshot unless superseded.
    fn confirm(&self, generation: u64, user: User) {
        let applied = self.inner.state.send_if_modified(|state| {
            if !self.inner.is_current(generation) {
                return false;
            }
            self.inner.bump();
            state.user = Some(user);
            true
        });
        if applied {
            tracing::info!("Persisted session confirmed");
        } else {
            tracing::debug!("Session changed during revalidation, discarding result");
        }
    }

    /// Revalidation failed: drop the restored session unless superseded.
    fn revert(&self, generation: u64, error: &Error) {
        let storage = self.inner.gateway.storage();
        let mut reverted = false;
        self.inner.state.send_if_modified(|state| {
            if !self.inner.is_current(generation) {
                return false;
            }
            self.inner.bump();
            storage.clear_logged();
            reverted = true;
            state.user.take().is_some()
        });
        if reverted {
            tracing::info!(error = %error, "Persisted session rejected, signed out");
        } else {
            tracing::debug!(error = %error, "Session changed during revalidation, discarding failure");
        }
    }

    fn finish_loading(&self) {
        self.inner.state.send_if_modified(|state| {
            let was_loading = state.loading;
            state.loading = false;
            was_loading
        });
    }
}
