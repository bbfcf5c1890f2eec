//! Declarative authorization gate
//!
//! A [`Policy`] states what a piece of protected content requires; the gate
//! decides against the current permission snapshot whether that content is
//! exposed. Evaluation is pure and synchronous; the gate never touches the
//! network.
//!
//! Uniform loading policy: a gate denies while the snapshot is
//! `Uninitialized`. While `Loading`, it evaluates against the retained
//! codes: the durable preload at startup, else the previous snapshot, else
//! empty (so a first-ever load still denies).

use crate::permissions::{Freshness, PermissionCache, PermissionSnapshot};
use futures_signals::signal::{Signal, SignalExt};
use std::sync::Arc;

/// A declarative permission requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// A single code must be granted
    RequireOne(String),
    /// At least one of the codes must be granted (false when empty)
    RequireAny(Vec<String>),
    /// Every code must be granted (vacuously true when empty)
    RequireAll(Vec<String>),
}

impl Policy {
    /// Require a single code
    pub fn one(code: impl Into<String>) -> Self {
        Self::RequireOne(code.into())
    }

    /// Require any of the codes
    pub fn any<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RequireAny(codes.into_iter().map(Into::into).collect())
    }

    /// Require all of the codes
    pub fn all<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RequireAll(codes.into_iter().map(Into::into).collect())
    }
}

/// Pure policy evaluation against a snapshot
pub fn evaluate(policy: &Policy, snapshot: &PermissionSnapshot) -> bool {
    match policy {
        Policy::RequireOne(code) => snapshot.has(code),
        Policy::RequireAny(codes) => codes.iter().any(|code| snapshot.has(code)),
        Policy::RequireAll(codes) => codes.iter().all(|code| snapshot.has(code)),
    }
}

fn gate_allows(policy: &Policy, snapshot: &PermissionSnapshot) -> bool {
    if snapshot.freshness() == Freshness::Uninitialized {
        return false;
    }
    evaluate(policy, snapshot)
}

/// Presentation guard over the permission cache.
///
/// Consumes the cache only; re-evaluation on snapshot changes comes from
/// [`PermissionGate::watch`], so nested gates stay live without capturing a
/// one-time value.
#[derive(Clone)]
pub struct PermissionGate {
    cache: Arc<PermissionCache>,
}

impl PermissionGate {
    /// Create a gate over the given cache
    pub fn new(cache: Arc<PermissionCache>) -> Self {
        Self { cache }
    }

    /// Decide a policy against the current snapshot
    pub fn allows(&self, policy: &Policy) -> bool {
        gate_allows(policy, &self.cache.snapshot())
    }

    /// Render protected content, or the fallback when the policy fails.
    ///
    /// The default fallback is nothing (`None`).
    pub fn render<T>(&self, policy: &Policy, content: T, fallback: Option<T>) -> Option<T> {
        if self.allows(policy) {
            Some(content)
        } else {
            fallback
        }
    }

    /// Signal of the policy decision, re-evaluated on every snapshot change
    pub fn watch(&self, policy: Policy) -> impl Signal<Item = bool> {
        self.cache
            .signal()
            .map(move |snapshot| gate_allows(&policy, &snapshot))
            .dedupe()
    }
}
