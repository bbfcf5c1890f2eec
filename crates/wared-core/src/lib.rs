//! Shared foundation for the Wared client core.
//!
//! This crate carries the domain types, the unified error type, and the
//! application configuration used by every other Wared crate. It has no
//! runtime or transport dependencies.

pub mod config;
pub mod errors;
pub mod types;

pub use config::AppConfig;
pub use errors::{Result, WaredError};
pub use types::{DepartmentRef, UserProfile};
