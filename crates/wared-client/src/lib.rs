//! Authenticated HTTP client adapter for the Wared API.
//!
//! Every outbound call in the client core goes through [`ApiClient`], which
//! attaches the bearer token supplied by a [`CredentialSource`] and applies
//! the one cross-cutting error rule: an HTTP 401 forces the session into a
//! logged-out state before the error is propagated to the caller.
//!
//! The wire is behind the [`HttpTransport`] trait so tests substitute a
//! scripted fake; [`ReqwestTransport`] is the production implementation.

pub mod client;
pub mod transport;

pub use client::{ApiClient, CredentialSource};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MultipartPart, RequestBody,
    ReqwestTransport,
};
