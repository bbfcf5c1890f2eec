//! Application core: construction and wiring
//!
//! Everything is built once at process start and injected explicitly: the
//! session store, permission cache, and gate are plain values handed to
//! their consumers, never global singletons, so tests substitute fakes at
//! the transport and storage seams.

use crate::gate::PermissionGate;
use crate::permissions::{Freshness, PermissionCache};
use crate::realtime::{RealtimeBinding, RealtimeChannel};
use crate::session::SessionStore;
use crate::storage::{DurableStorage, FsDurableStorage};
use std::sync::Arc;
use tracing::info;
use wared_client::{ApiClient, HttpTransport, ReqwestTransport};
use wared_core::{AppConfig, Result};

/// Composite authentication phase, as observed by frontends.
///
/// Derived from the session and the permission snapshot; there is no
/// terminal phase, the cycle repeats for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    /// No token present
    Unauthenticated,
    /// Token present, profile or permissions still pending
    Authenticating,
    /// Permissions are fresh
    Authenticated,
    /// Authenticated, but the last permission refresh failed
    AuthenticatedDegraded,
}

/// Wired client core for one process
pub struct AppCore {
    config: AppConfig,
    client: ApiClient,
    session: Arc<SessionStore>,
    permissions: Arc<PermissionCache>,
    gate: PermissionGate,
    realtime: Option<RealtimeBinding>,
}

impl AppCore {
    /// Wire a core from explicit transport, storage, and optional realtime
    /// channel implementations.
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn DurableStorage>,
        realtime: Option<Arc<dyn RealtimeChannel>>,
    ) -> Self {
        let session = Arc::new(SessionStore::new(storage.clone()));
        let permissions = Arc::new(PermissionCache::new(storage));

        // A forced logout (401) must empty the codes in the same turn and
        // leave no grant list behind on disk.
        {
            let permissions = permissions.clone();
            session.register_logout_hook(Box::new(move || {
                let permissions = permissions.clone();
                Box::pin(async move {
                    permissions.clear();
                    permissions.erase_durable().await;
                })
            }));
        }

        let client = ApiClient::new(config.api_base_url.clone(), transport, session.clone());
        let gate = PermissionGate::new(permissions.clone());
        let realtime = realtime.map(RealtimeBinding::new);

        Self {
            config,
            client,
            session,
            permissions,
            gate,
            realtime,
        }
    }

    /// Wire a core with the production transport and filesystem storage
    pub fn with_defaults(config: AppConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout_secs)?);
        let storage = Arc::new(FsDurableStorage::new(config.storage_dir.clone()));
        Ok(Self::new(config, transport, storage, None))
    }

    /// Restore the previous session, best effort, then bring the
    /// permission cache in line. Invoked once before the UI is ready.
    pub async fn start(&self) {
        self.session.restore_session(&self.client).await;
        if self.session.is_authenticated() {
            // Fill the gap before the first fetch resolves.
            self.permissions.preload().await;
            info!("session restored from durable token");
        }
        self.permissions.refresh(&self.client, &self.session).await;
        self.sync_realtime().await;
    }

    /// Authenticate with credentials, then refresh permissions.
    ///
    /// Invalid credentials surface as the `Http` error from the auth
    /// endpoint; the session stays logged out in that case.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let outcome = self.session.authenticate(&self.client, username, password).await;
        self.permissions.refresh(&self.client, &self.session).await;
        self.sync_realtime().await;
        outcome
    }

    /// Log out and clear both stores
    pub async fn logout(&self) {
        self.session.logout().await;
        self.permissions.refresh(&self.client, &self.session).await;
        self.sync_realtime().await;
    }

    /// Current composite authentication phase
    pub fn auth_phase(&self) -> AuthPhase {
        if !self.session.is_authenticated() {
            return AuthPhase::Unauthenticated;
        }
        // A token without a resolved profile is still mid-flight, whatever
        // the permission cache says.
        if self.session.user().is_none() {
            return AuthPhase::Authenticating;
        }
        match self.permissions.snapshot().freshness() {
            Freshness::Ready => AuthPhase::Authenticated,
            Freshness::StaleFallback => AuthPhase::AuthenticatedDegraded,
            Freshness::Uninitialized | Freshness::Loading => AuthPhase::Authenticating,
        }
    }

    async fn sync_realtime(&self) {
        if let Some(binding) = &self.realtime {
            binding.sync_with(&self.session.snapshot()).await;
        }
    }

    /// The configuration this core was built with
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The authenticated API client; all endpoint calls go through it
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The session store
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// The permission cache
    pub fn permissions(&self) -> &Arc<PermissionCache> {
        &self.permissions
    }

    /// The authorization gate
    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }
}
