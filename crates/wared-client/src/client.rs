//! Single outbound-request path for the Wared API
//!
//! [`ApiClient`] joins relative paths to the configured base address,
//! attaches the bearer credential read from a [`CredentialSource`], and
//! centralizes authentication-expiry handling: any 401 response forces the
//! credential source into a logged-out state before the error propagates.
//! No retries happen at this layer; retries, if any, belong to callers.

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, MultipartPart, RequestBody};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use wared_core::{Result, WaredError};

/// Read side of the session, as seen by the client adapter.
///
/// The session store is the single writer of the token; the adapter only
/// reads it, and reports observed authentication expiry back through
/// `handle_unauthorized`.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Current bearer token, if the session holds one
    fn bearer_token(&self) -> Option<String>;

    /// Called when a response carries HTTP 401; forces a logout
    async fn handle_unauthorized(&self);
}

/// Authenticated client for the Wared REST API
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialSource>,
}

impl ApiClient {
    /// Create a client for the given API base address
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            credentials,
        }
    }

    /// Dispatch a request and parse the JSON response body.
    ///
    /// An empty 2xx body parses as `Value::Null`. A 401 response forces a
    /// logout through the credential source and then surfaces as
    /// `WaredError::Http { status: 401, .. }`; every other non-2xx status
    /// propagates unmodified.
    pub async fn request(&self, method: Method, path: &str, body: RequestBody) -> Result<Value> {
        let request = HttpRequest {
            method,
            url: join_url(&self.base_url, path),
            bearer: self.credentials.bearer_token(),
            body,
        };

        let response = self.transport.execute(request).await?;
        self.parse_response(path, response).await
    }

    /// GET a JSON resource
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::Get, path, RequestBody::Empty).await
    }

    /// POST a JSON payload
    pub async fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<Value> {
        let value = serde_json::to_value(payload)?;
        self.request(Method::Post, path, RequestBody::Json(value))
            .await
    }

    /// PUT a JSON payload
    pub async fn put_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<Value> {
        let value = serde_json::to_value(payload)?;
        self.request(Method::Put, path, RequestBody::Json(value))
            .await
    }

    /// DELETE a resource
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(Method::Delete, path, RequestBody::Empty).await
    }

    /// POST a multipart payload (file attachments and their fields)
    pub async fn post_multipart(&self, path: &str, parts: Vec<MultipartPart>) -> Result<Value> {
        self.request(Method::Post, path, RequestBody::Multipart(parts))
            .await
    }

    async fn parse_response(&self, path: &str, response: HttpResponse) -> Result<Value> {
        if response.status == 401 {
            warn!(path, "unauthorized response, forcing logout");
            self.credentials.handle_unauthorized().await;
            return Err(WaredError::http(401, response.body));
        }

        if !response.is_success() {
            return Err(WaredError::http(response.status, response.body));
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(Into::into)
    }
}

/// Join a relative path onto the base address
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport fake that records requests and replays scripted responses
    struct ScriptedTransport {
        seen: Mutex<Vec<HttpRequest>>,
        responses: Mutex<Vec<Result<HttpResponse>>>,
    }

    impl ScriptedTransport {
        fn replying(responses: Vec<Result<HttpResponse>>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().push(request);
            self.responses.lock().remove(0)
        }
    }

    struct FixedCredentials {
        token: Option<String>,
        logouts: AtomicUsize,
    }

    impl FixedCredentials {
        fn with_token(token: &str) -> Self {
            Self {
                token: Some(token.to_string()),
                logouts: AtomicUsize::new(0),
            }
        }

        fn anonymous() -> Self {
            Self {
                token: None,
                logouts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CredentialSource for FixedCredentials {
        fn bearer_token(&self) -> Option<String> {
            self.token.clone()
        }

        async fn handle_unauthorized(&self) {
            self.logouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ok(status: u16, body: &str) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    #[tokio::test]
    async fn test_bearer_attached_when_present() {
        let transport = Arc::new(ScriptedTransport::replying(vec![ok(200, "{}")]));
        let creds = Arc::new(FixedCredentials::with_token("tok123"));
        let client = ApiClient::new("https://w.example/api/", transport.clone(), creds);

        client.get("/departments").await.unwrap();

        let seen = transport.seen.lock();
        assert_eq!(seen[0].bearer.as_deref(), Some("tok123"));
        assert_eq!(seen[0].url, "https://w.example/api/departments");
    }

    #[tokio::test]
    async fn test_no_bearer_when_logged_out() {
        let transport = Arc::new(ScriptedTransport::replying(vec![ok(200, "[]")]));
        let creds = Arc::new(FixedCredentials::anonymous());
        let client = ApiClient::new("https://w.example/api", transport.clone(), creds);

        client.get("departments").await.unwrap();
        assert!(transport.seen.lock()[0].bearer.is_none());
    }

    #[tokio::test]
    async fn test_401_forces_logout_then_propagates() {
        let transport = Arc::new(ScriptedTransport::replying(vec![ok(401, "expired")]));
        let creds = Arc::new(FixedCredentials::with_token("tok123"));
        let client = ApiClient::new("https://w.example/api", transport, creds.clone());

        let err = client.get("incoming").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(creds.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_errors_do_not_touch_session() {
        let transport = Arc::new(ScriptedTransport::replying(vec![ok(422, "bad subject")]));
        let creds = Arc::new(FixedCredentials::with_token("tok123"));
        let client = ApiClient::new("https://w.example/api", transport, creds.clone());

        let err = client
            .post_json("incoming", &serde_json::json!({ "subject": "" }))
            .await
            .unwrap_err();
        assert!(matches!(err, WaredError::Http { status: 422, .. }));
        assert_eq!(creds.logouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_network_error_propagates_untouched() {
        let transport = Arc::new(ScriptedTransport::replying(vec![Err(WaredError::network(
            "connection refused",
        ))]));
        let creds = Arc::new(FixedCredentials::with_token("tok123"));
        let client = ApiClient::new("https://w.example/api", transport, creds.clone());

        let err = client.get("audit").await.unwrap_err();
        assert!(matches!(err, WaredError::Network { .. }));
        assert_eq!(creds.logouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_body_parses_as_null() {
        let transport = Arc::new(ScriptedTransport::replying(vec![ok(204, "")]));
        let creds = Arc::new(FixedCredentials::anonymous());
        let client = ApiClient::new("https://w.example/api", transport, creds);

        let value = client.delete("incoming/9").await.unwrap();
        assert!(value.is_null());
    }
}
