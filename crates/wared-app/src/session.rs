//! Session store: single source of truth for "who is logged in"
//!
//! The token is the one piece of durable shared state: only this store
//! writes it, every other component reads it. The user profile is always
//! re-derived from the network and never persisted.
//!
//! Async completions (profile fetches) are guarded by an epoch counter: a
//! logout or a new login bumps the epoch, and a completion whose captured
//! epoch no longer matches is discarded instead of resurrecting stale
//! authenticated state.

use crate::storage::DurableStorage;
use async_trait::async_trait;
use futures_signals::signal::{Mutable, Signal};
use parking_lot::RwLock;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use wared_client::{ApiClient, CredentialSource};
use wared_core::{Result, UserProfile, WaredError};

/// Storage key for the durably persisted session token
pub const TOKEN_STORAGE_KEY: &str = "session_token";

/// Path of the authentication endpoint, relative to the API base
pub const LOGIN_PATH: &str = "auth/login";

/// Path of the current-user profile endpoint
pub const PROFILE_PATH: &str = "auth/profile";

/// The authenticated actor.
///
/// `user` may be absent while authenticated: immediately after a token is
/// restored, the profile fetch has not yet resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Opaque bearer token, present iff authenticated
    pub token: Option<String>,
    /// Profile of the authenticated user, once fetched
    pub user: Option<UserProfile>,
}

impl Session {
    /// True iff a token is present
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Hook run to completion inside every logout, before it returns
pub type LogoutHook = Box<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Owner of the authentication token and current user identity
pub struct SessionStore {
    state: Mutable<Session>,
    storage: Arc<dyn DurableStorage>,
    epoch: AtomicU64,
    logout_hooks: RwLock<Vec<LogoutHook>>,
}

impl SessionStore {
    /// Create an empty, logged-out store
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            state: Mutable::new(Session::default()),
            storage,
            epoch: AtomicU64::new(0),
            logout_hooks: RwLock::new(Vec::new()),
        }
    }

    /// Current session value
    pub fn snapshot(&self) -> Session {
        self.state.get_cloned()
    }

    /// Signal firing on every session change
    pub fn signal(&self) -> impl Signal<Item = Session> {
        self.state.signal_cloned()
    }

    /// True iff a token is present
    pub fn is_authenticated(&self) -> bool {
        self.state.lock_ref().is_authenticated()
    }

    /// Current user profile, if the profile fetch has resolved
    pub fn user(&self) -> Option<UserProfile> {
        self.state.lock_ref().user.clone()
    }

    /// Register a hook awaited inside every logout.
    ///
    /// Used by the permission cache to clear its codes and erase its
    /// durable snapshot before a forced logout surfaces to the caller.
    pub fn register_logout_hook(&self, hook: LogoutHook) {
        self.logout_hooks.write().push(hook);
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Store a token and mark the session authenticated.
    ///
    /// Persists the token durably; does not fetch the profile (callers
    /// compose that separately, see [`Self::restore_session`]).
    pub async fn login_with_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.set(Session {
            token: Some(token.clone()),
            user: None,
        });
        if let Err(e) = self.storage.store(TOKEN_STORAGE_KEY, token).await {
            warn!(error = %e, "failed to persist session token");
        }
    }

    /// Clear token and user, erase the durable token, run logout hooks
    pub async fn logout(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.set(Session::default());
        if let Err(e) = self.storage.remove(TOKEN_STORAGE_KEY).await {
            warn!(error = %e, "failed to erase persisted session token");
        }
        let hooks: Vec<_> = self.logout_hooks.read().iter().map(|hook| hook()).collect();
        for hook in hooks {
            hook.await;
        }
    }

    /// Authenticate with username and password.
    ///
    /// On success the token is stored (durably) and the profile fetched.
    /// Invalid credentials surface as the `Http` error the endpoint
    /// returned; the session is left logged out in that case.
    pub async fn authenticate(
        &self,
        client: &ApiClient,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let response = client
            .post_json(
                LOGIN_PATH,
                &serde_json::json!({ "username": username, "password": password }),
            )
            .await?;
        let token = extract_token(&response)?;
        self.login_with_token(token).await;
        self.fetch_profile_guarded(client).await
    }

    /// Restore a previously persisted session, best effort.
    ///
    /// Invoked once at process start. Absent token: the session stays
    /// logged out. Present token: it is applied immediately so dependent
    /// components start optimistically, then the profile is fetched; any
    /// failure transitions back to logged out and discards the durable
    /// token. Never returns an error to the caller.
    pub async fn restore_session(&self, client: &ApiClient) {
        let stored = match self.storage.load(TOKEN_STORAGE_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "failed to read persisted session token");
                None
            }
        };
        let Some(token) = stored else {
            if self.is_authenticated() {
                self.logout().await;
            }
            return;
        };

        self.state.set(Session {
            token: Some(token),
            user: None,
        });

        if let Err(e) = self.fetch_profile_guarded(client).await {
            warn!(error = %e, "session restoration failed, discarding token");
            self.logout().await;
        }
    }

    /// Fetch the profile and apply it, unless the session moved on.
    ///
    /// Captures the epoch before the network call; if a logout or new login
    /// happens while the call is in flight, the resolution is discarded.
    async fn fetch_profile_guarded(&self, client: &ApiClient) -> Result<()> {
        let epoch = self.current_epoch();
        let result = client.get(PROFILE_PATH).await.and_then(|value| {
            serde_json::from_value::<UserProfile>(value).map_err(WaredError::from)
        });

        if self.current_epoch() != epoch {
            debug!("discarding profile fetch that resolved after session change");
            return Ok(());
        }

        let profile = result?;
        let current = self.snapshot();
        if current.is_authenticated() {
            self.state.set(Session {
                token: current.token,
                user: Some(profile),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.state.lock_ref().token.clone()
    }

    async fn handle_unauthorized(&self) {
        warn!("authentication expired, session forced logged out");
        self.logout().await;
    }
}

/// Extract the bearer token from a login response.
///
/// Tolerated shapes, in priority order: a bare string, `{"token": "..."}`,
/// `{"data": {"token": "..."}}`.
fn extract_token(value: &serde_json::Value) -> Result<String> {
    let token = value
        .as_str()
        .or_else(|| value.get("token").and_then(|t| t.as_str()))
        .or_else(|| {
            value
                .get("data")
                .and_then(|d| d.get("token"))
                .and_then(|t| t.as_str())
        });
    match token {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(WaredError::invalid("login response carried no token")),
    }
}
