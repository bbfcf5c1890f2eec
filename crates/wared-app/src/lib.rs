//! Portable headless client core for Wared.
//!
//! Wared is an institutional incoming/outgoing correspondence system; this
//! crate is the authorization and session model its frontends build on:
//!
//! - [`session::SessionStore`]: single source of truth for "who is logged
//!   in", with durable token continuity across restarts
//! - [`permissions::PermissionCache`]: synchronous permission-code
//!   membership queries backed by an asynchronously-refreshed source, with
//!   stale-while-revalidate fallback
//! - [`gate::PermissionGate`]: declarative policy gating for protected
//!   content, re-evaluated whenever the underlying snapshot changes
//! - [`realtime::RealtimeBinding`]: joins the user-scoped notification
//!   channel once the user id is known
//! - [`core::AppCore`]: constructs and wires the above once at startup
//!
//! All state is exposed through `futures-signals` so frontends subscribe
//! rather than poll; writes are whole-value replacements, so observers
//! never see a half-updated snapshot.

pub mod core;
pub mod gate;
pub mod permissions;
pub mod prelude;
pub mod realtime;
pub mod session;
pub mod storage;

pub use crate::core::{AppCore, AuthPhase};
pub use gate::{evaluate, PermissionGate, Policy};
pub use permissions::{Freshness, PermissionCache, PermissionSnapshot};
pub use realtime::{RealtimeBinding, RealtimeChannel};
pub use session::{LogoutHook, Session, SessionStore};
pub use storage::{DurableStorage, FsDurableStorage, MemoryStorage};
