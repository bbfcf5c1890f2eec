//! Unified error system for the Wared client core
//!
//! A single error type shared by the transport, session, and permission
//! layers. The one cross-cutting rule lives here: an `Http` error with
//! status 401 is an authentication failure and forces the session into a
//! logged-out state wherever it surfaces.

use serde::{Deserialize, Serialize};

/// Unified error type for all Wared operations
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum WaredError {
    /// Transport failure, no response was received
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the transport failure
        message: String,
    },

    /// Non-2xx HTTP response
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code of the response
        status: u16,
        /// Response body, as text, for contextual display at the call site
        body: String,
    },

    /// Durable storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },
}

impl WaredError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an HTTP error from a response status and body
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// True iff this error is an HTTP 401 authentication failure.
    ///
    /// 401 is the only error that affects state outside its call site:
    /// the session is forced logged-out and the permission cache cleared.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }
}

impl From<serde_json::Error> for WaredError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Standard Result type for Wared operations
pub type Result<T> = std::result::Result<T, WaredError>;
