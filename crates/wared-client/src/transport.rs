//! Wire-level transport seam
//!
//! [`HttpTransport`] is the narrow boundary between the client adapter and
//! the actual network. The production implementation wraps a
//! builder-configured `reqwest::Client`; tests implement the trait with a
//! scripted fake. Only transport failures surface as errors here; a
//! response with a non-2xx status is still an `Ok(HttpResponse)`, and the
//! status policy lives one layer up in [`crate::ApiClient`].

use async_trait::async_trait;
use std::time::Duration;
use wared_core::{Result, WaredError};

/// HTTP method for an outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Method name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// One part of a multipart payload.
///
/// A part may carry its own content type; the multipart envelope itself
/// never does, since the transport negotiates the boundary.
#[derive(Debug, Clone)]
pub struct MultipartPart {
    /// Form field name
    pub name: String,
    /// Original file name, for file parts
    pub filename: Option<String>,
    /// Content type of this part, if known
    pub content_type: Option<String>,
    /// Raw part bytes
    pub data: Vec<u8>,
}

impl MultipartPart {
    /// A plain text form field
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    /// A file field with an optional content type
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type,
            data,
        }
    }
}

/// Body of an outbound request
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON payload
    Json(serde_json::Value),
    /// Multipart payload
    Multipart(Vec<MultipartPart>),
}

/// A fully-resolved outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Bearer credential to attach, if the session holds one
    pub bearer: Option<String>,
    /// Request body
    pub body: RequestBody,
}

/// Status and body of a received response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// True iff the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Boundary between the client adapter and the network
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Dispatch a request and return the response.
    ///
    /// Errors only on transport failure (no response received); any
    /// received status, including errors, is an `Ok`.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Production transport backed by `reqwest`
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| WaredError::invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    let mut p = reqwest::multipart::Part::bytes(part.data);
                    if let Some(filename) = part.filename {
                        p = p.file_name(filename);
                    }
                    if let Some(content_type) = &part.content_type {
                        p = p.mime_str(content_type).map_err(|e| {
                            WaredError::invalid(format!("bad part content type: {e}"))
                        })?;
                    }
                    form = form.part(part.name, p);
                }
                // No Content-Type on the envelope; reqwest sets the boundary.
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| WaredError::network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| WaredError::network(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
