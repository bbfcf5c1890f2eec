//! Permission cache with stale-while-revalidate semantics
//!
//! Answers "can the current session do X" synchronously, backed by an
//! asynchronously-refreshed permission-codes fetch. A failed refresh
//! degrades to the last successful snapshot instead of blanking out;
//! losing authentication clears the cache unconditionally.

use crate::session::SessionStore;
use crate::storage::DurableStorage;
use futures_signals::signal::{Mutable, Signal};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use wared_client::ApiClient;

/// Storage key for the best-effort durable permission snapshot
pub const PERMISSIONS_STORAGE_KEY: &str = "permission_codes";

/// Path of the permission-codes endpoint, relative to the API base
pub const PERMISSIONS_PATH: &str = "auth/permissions";

/// How current the cached codes are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No session resolved yet, or the session is unauthenticated
    Uninitialized,
    /// A fetch is in flight; codes retain their previous value
    Loading,
    /// Codes reflect the last successful fetch
    Ready,
    /// The last fetch failed; codes are a previous snapshot
    StaleFallback,
}

/// The set of capability codes granted to the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSnapshot {
    codes: HashSet<String>,
    freshness: Freshness,
}

impl PermissionSnapshot {
    /// The empty, unresolved snapshot
    pub fn empty() -> Self {
        Self {
            codes: HashSet::new(),
            freshness: Freshness::Uninitialized,
        }
    }

    /// A snapshot with the given codes and freshness
    pub fn new<I, S>(codes: I, freshness: Freshness) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            freshness,
        }
    }

    /// Pure membership test against the cached codes
    pub fn has(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// True iff every element is a member (vacuously true for empty input)
    pub fn has_all<I, S>(&self, codes: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        codes.into_iter().all(|code| self.has(code.as_ref()))
    }

    /// Freshness of this snapshot
    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    /// Number of granted codes
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// True iff no codes are granted
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for PermissionSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Owner of the resolved permission codes for the current session.
///
/// Single writer: only the cache's own refresh logic replaces the snapshot.
/// Overlapping refreshes are sequenced by a counter so an older, slower
/// fetch never clobbers a newer applied result.
pub struct PermissionCache {
    snapshot: Mutable<PermissionSnapshot>,
    storage: Arc<dyn DurableStorage>,
    refresh_seq: AtomicU64,
}

impl PermissionCache {
    /// Create an empty cache
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            snapshot: Mutable::new(PermissionSnapshot::empty()),
            storage,
            refresh_seq: AtomicU64::new(0),
        }
    }

    /// Current snapshot value
    pub fn snapshot(&self) -> PermissionSnapshot {
        self.snapshot.get_cloned()
    }

    /// Signal firing on every snapshot change
    pub fn signal(&self) -> impl Signal<Item = PermissionSnapshot> {
        self.snapshot.signal_cloned()
    }

    /// Synchronous membership test, no network access
    pub fn has(&self, code: &str) -> bool {
        self.snapshot.lock_ref().has(code)
    }

    /// True iff every element is a granted code
    pub fn has_all<I, S>(&self, codes: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.snapshot.lock_ref().has_all(codes)
    }

    /// Clear the in-memory snapshot and invalidate in-flight refreshes.
    ///
    /// Runs synchronously, so a 401-forced logout empties the codes in the
    /// same turn. Pair with [`Self::erase_durable`] so no stale grant list
    /// outlives the session on disk.
    pub fn clear(&self) {
        self.refresh_seq.fetch_add(1, Ordering::SeqCst);
        self.snapshot.set(PermissionSnapshot::empty());
    }

    /// Remove the durable snapshot, best effort
    pub async fn erase_durable(&self) {
        if let Err(e) = self.storage.remove(PERMISSIONS_STORAGE_KEY).await {
            warn!(error = %e, "failed to erase durable permission snapshot");
        }
    }

    /// Pre-populate from the durable snapshot of a prior run, if present.
    ///
    /// Called at startup after the session token is restored, before the
    /// first fetch resolves, so protected content is not blanked out in the
    /// gap. A preloaded snapshot is stale by definition.
    pub async fn preload(&self) {
        let stored = match self.storage.load(PERMISSIONS_STORAGE_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "failed to read durable permission snapshot");
                return;
            }
        };
        let Some(raw) = stored else { return };
        let codes: HashSet<String> = match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(codes) => codes.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "durable permission snapshot is malformed, ignoring");
                return;
            }
        };

        // Only fill the gap before the first resolution; never overwrite a
        // fetched snapshot.
        let current = self.snapshot.lock_ref().freshness();
        if current == Freshness::Uninitialized {
            self.snapshot.set(PermissionSnapshot {
                codes,
                freshness: Freshness::StaleFallback,
            });
        }
    }

    /// Refresh the cache for the current authentication state.
    ///
    /// Reads the session's flag at call time. Unauthenticated: codes are
    /// cleared and the durable snapshot erased. Authenticated: a fetch
    /// runs; success replaces the codes and rewrites the durable snapshot,
    /// failure degrades to `StaleFallback` with the codes retained.
    /// Idempotent and safe to call repeatedly.
    pub async fn refresh(&self, client: &ApiClient, session: &SessionStore) {
        let seq = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;

        if !session.is_authenticated() {
            self.snapshot.set(PermissionSnapshot::empty());
            self.erase_durable().await;
            return;
        }

        {
            let previous = self.snapshot.get_cloned();
            self.snapshot.set(PermissionSnapshot {
                codes: previous.codes,
                freshness: Freshness::Loading,
            });
        }

        let result = client.get(PERMISSIONS_PATH).await;

        // A newer refresh, a clear, or a logout superseded this one.
        if self.refresh_seq.load(Ordering::SeqCst) != seq {
            debug!("discarding permission fetch that resolved after a newer refresh");
            return;
        }

        match result {
            Ok(value) => {
                let codes = normalize_codes(&value);
                let encoded =
                    serde_json::to_string(&codes).unwrap_or_else(|_| "[]".to_string());
                self.snapshot.set(PermissionSnapshot {
                    codes: codes.into_iter().collect(),
                    freshness: Freshness::Ready,
                });
                if let Err(e) = self.storage.store(PERMISSIONS_STORAGE_KEY, encoded).await {
                    warn!(error = %e, "failed to write durable permission snapshot");
                }
            }
            Err(e) => {
                warn!(error = %e, "permission refresh failed, keeping previous codes");
                let previous = self.snapshot.get_cloned();
                self.snapshot.set(PermissionSnapshot {
                    codes: previous.codes,
                    freshness: Freshness::StaleFallback,
                });
            }
        }
    }
}

/// Unwrap the permission-codes payload into a flat code list.
///
/// Tolerated shapes, in priority order: a bare array, `{"codes": [...]}`,
/// `{"data": {"codes": [...]}}`. Anything else degrades to an empty list
/// for this refresh cycle; it is never an error to the caller.
pub fn normalize_codes(value: &serde_json::Value) -> Vec<String> {
    let list = value
        .as_array()
        .or_else(|| value.get("codes").and_then(|c| c.as_array()))
        .or_else(|| {
            value
                .get("data")
                .and_then(|d| d.get("codes"))
                .and_then(|c| c.as_array())
        });
    match list {
        Some(list) => list
            .iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .collect(),
        None => {
            warn!("unrecognized permission payload shape, treating as empty");
            Vec::new()
        }
    }
}
