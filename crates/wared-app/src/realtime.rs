//! Realtime notification binding
//!
//! The transport (socket, polling) is entirely external; the core's only
//! obligations are to hand the user id to the channel once it is known, to
//! avoid re-joining for the same user, and to tear the channel down on
//! logout. Delivery of events never blocks the core.

use crate::session::Session;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};
use wared_core::Result;

/// External publish/subscribe channel scoped to one user
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Join the channel for the given user id
    async fn join_user(&self, user_id: i64) -> Result<()>;

    /// Leave the currently joined channel
    async fn leave(&self) -> Result<()>;
}

/// Keeps the realtime channel in step with the session.
///
/// Joins exactly once per user id; a repeated sync with the same user is a
/// no-op, and a logout (or user change) leaves the old channel first.
pub struct RealtimeBinding {
    channel: Arc<dyn RealtimeChannel>,
    joined: Mutex<Option<i64>>,
}

impl RealtimeBinding {
    /// Create a binding over the given channel
    pub fn new(channel: Arc<dyn RealtimeChannel>) -> Self {
        Self {
            channel,
            joined: Mutex::new(None),
        }
    }

    /// The user id currently joined, if any
    pub fn joined_user(&self) -> Option<i64> {
        *self.joined.lock()
    }

    /// Reconcile the channel with the current session, best effort.
    ///
    /// Channel failures are logged, never propagated; the next sync retries.
    pub async fn sync_with(&self, session: &Session) {
        let target = session.user.as_ref().map(|user| user.id);
        let current = *self.joined.lock();
        if target == current {
            return;
        }

        if current.is_some() {
            if let Err(e) = self.channel.leave().await {
                warn!(error = %e, "failed to leave realtime channel");
            }
            *self.joined.lock() = None;
        }

        if let Some(user_id) = target {
            match self.channel.join_user(user_id).await {
                Ok(()) => {
                    debug!(user_id, "joined realtime channel");
                    *self.joined.lock() = Some(user_id);
                }
                Err(e) => {
                    warn!(error = %e, user_id, "failed to join realtime channel");
                }
            }
        }
    }
}
