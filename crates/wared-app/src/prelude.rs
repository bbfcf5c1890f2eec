//! Convenience re-exports for frontend crates

pub use crate::core::{AppCore, AuthPhase};
pub use crate::gate::{evaluate, PermissionGate, Policy};
pub use crate::permissions::{Freshness, PermissionCache, PermissionSnapshot};
pub use crate::realtime::{RealtimeBinding, RealtimeChannel};
pub use crate::session::{Session, SessionStore};
pub use crate::storage::{DurableStorage, FsDurableStorage, MemoryStorage};
pub use wared_client::{ApiClient, CredentialSource, HttpTransport, Method, RequestBody};
pub use wared_core::{AppConfig, Result, UserProfile, WaredError};
