//! Session store: the single owner of `AuthState`.
//!
//! The store mirrors the token into a `TokenStorage` slot and publishes every
//! state change on a `watch` channel. Mutations run under one lock covering
//! both the storage write and the state publication, and that lock is never
//! held across an `.await`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::models::{AuthToken, UserMe};

use super::state::AuthState;
use super::storage::TokenStorage;

/// Identity operations the store needs from the API layer.
pub trait AuthApi: Send + Sync {
    /// Fetch the profile for whatever token the client currently sends.
    fn fetch_me(&self) -> impl Future<Output = Result<UserMe>> + Send;

    /// Fetch the profile for an explicit token, ignoring the session.
    fn fetch_me_as(&self, token: &str) -> impl Future<Output = Result<UserMe>> + Send;

    fn login(&self, username: &str, password: &str)
        -> impl Future<Output = Result<AuthToken>> + Send;
}

pub struct SessionStore {
    storage: Arc<dyn TokenStorage>,
    storage_key: String,
    state: watch::Sender<AuthState>,
    write_lock: Mutex<()>,
    init_started: AtomicBool,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn TokenStorage>, storage_key: impl Into<String>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            storage,
            storage_key: storage_key.into(),
            state,
            write_lock: Mutex::new(()),
            init_started: AtomicBool::new(false),
        }
    }

    /// Persist `token` and mark the session authenticated as `user`.
    pub fn set_auth(&self, token: impl Into<String>, user: UserMe) -> Result<()> {
        let token = token.into();
        anyhow::ensure!(!token.is_empty(), "Refusing to store an empty token");

        let _guard = self.lock();
        self.storage.set(&self.storage_key, &token)?;
        debug!(user = %user.email, "Session authenticated");
        self.state.send_replace(AuthState::authenticated(token, user));
        Ok(())
    }

    /// Forget the token and reset to signed-out. Safe to call repeatedly.
    ///
    /// The in-memory state is reset even when removing the stored token
    /// fails; the storage error is still returned.
    pub fn clear_auth(&self) -> Result<()> {
        let _guard = self.lock();
        let removed = self.storage.remove(&self.storage_key);
        self.state.send_replace(AuthState::cleared());
        debug!("Session cleared");
        removed
    }

    pub fn set_loading(&self, loading: bool) {
        let _guard = self.lock();
        self.state.send_modify(|state| state.loading = loading);
    }

    /// Restore the session persisted by a previous run.
    ///
    /// Returns the verified token, or `None` when there is no usable session.
    /// A failed verification of any kind clears the session; only storage
    /// errors are returned. The sequence runs once per store; later calls
    /// return the current token without contacting the server.
    pub async fn init_auth<A: AuthApi>(&self, api: &A) -> Result<Option<String>> {
        if self.init_started.swap(true, Ordering::SeqCst) {
            debug!("Session initialization already ran");
            return Ok(self.token());
        }

        self.set_loading(true);

        let stored = match self.storage.get(&self.storage_key) {
            Ok(stored) => stored,
            Err(e) => {
                self.set_loading(false);
                self.init_started.store(false, Ordering::SeqCst);
                return Err(e.context("Failed to read stored token"));
            }
        };

        let Some(token) = stored.filter(|t| !t.is_empty()) else {
            self.update(|state| {
                state.loading = false;
                state.initialized = true;
            });
            debug!("No stored session");
            return Ok(None);
        };

        // Optimistic: requests issued from here on carry the stored token
        self.update(|state| {
            state.token = Some(token.clone());
            state.is_authenticated = true;
        });

        match api.fetch_me().await {
            Ok(user) => {
                let mut current = false;
                self.update(|state| {
                    current = state.token.as_deref() == Some(token.as_str());
                    if current {
                        state.user = Some(user);
                    }
                    state.loading = false;
                    state.initialized = true;
                });
                if !current {
                    debug!("Session changed while verifying stored token");
                    return Ok(self.token());
                }
                info!("Restored stored session");
                Ok(Some(token))
            }
            Err(e) => {
                error!(error = %e, "Failed to verify stored token");
                self.clear_auth()?;
                Ok(None)
            }
        }
    }

    /// Exchange credentials for a token and start an authenticated session.
    ///
    /// The state is untouched when any step fails.
    pub async fn login<A: AuthApi>(&self, api: &A, username: &str, password: &str) -> Result<UserMe> {
        let tokens = api.login(username, password).await?;
        let user = api.fetch_me_as(&tokens.access).await?;
        self.set_auth(tokens.access, user.clone())?;
        info!(user = %user.email, "Signed in");
        Ok(user)
    }

    pub fn logout(&self) -> Result<()> {
        self.clear_auth()?;
        info!("Signed out");
        Ok(())
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.state.subscribe(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut AuthState)) {
        let _guard = self.lock();
        self.state.send_modify(f);
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded section only publishes whole values, so a panic
        // elsewhere cannot leave the state half-written.
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Observer handle on the session state. Dropping it unsubscribes.
///
/// Notifications coalesce: a slow observer wakes once and sees the latest
/// state rather than every intermediate value.
pub struct Subscription {
    rx: watch::Receiver<AuthState>,
}

impl Subscription {
    pub fn current(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<AuthState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
