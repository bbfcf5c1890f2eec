//! Shared fakes for integration tests: a scripted HTTP transport matched
//! by path, with optional per-response gating to hold a request in flight.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use wared_client::{HttpRequest, HttpResponse, HttpTransport};
use wared_core::{Result, WaredError};

pub const BASE_URL: &str = "https://wared.example/api";

struct Route {
    path_suffix: String,
    gate: Option<Arc<Semaphore>>,
    response: Result<HttpResponse>,
}

#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one response for the next request whose URL ends in `path`
    pub fn respond(&self, path: &str, response: Result<HttpResponse>) {
        self.routes.lock().push(Route {
            path_suffix: path.to_string(),
            gate: None,
            response,
        });
    }

    /// Script a response that is held until the semaphore gets a permit
    pub fn respond_gated(&self, path: &str, gate: Arc<Semaphore>, response: Result<HttpResponse>) {
        self.routes.lock().push(Route {
            path_suffix: path.to_string(),
            gate: Some(gate),
            response,
        });
    }

    /// All requests dispatched so far
    pub fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }

    /// Number of dispatched requests whose URL ends in `path`
    pub fn calls_to(&self, path: &str) -> usize {
        self.seen
            .lock()
            .iter()
            .filter(|request| request.url.ends_with(path))
            .count()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        self.seen.lock().push(request);

        let route = {
            let mut routes = self.routes.lock();
            match routes.iter().position(|route| url.ends_with(&route.path_suffix)) {
                Some(index) => routes.remove(index),
                None => {
                    return Err(WaredError::network(format!(
                        "no scripted response for {url}"
                    )))
                }
            }
        };

        if let Some(gate) = &route.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| WaredError::network("gate closed"))?;
            permit.forget();
        }
        route.response
    }
}

pub fn ok(status: u16, body: serde_json::Value) -> Result<HttpResponse> {
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

pub fn network_error() -> Result<HttpResponse> {
    Err(WaredError::network("connection refused"))
}

pub fn profile_json() -> serde_json::Value {
    serde_json::json!({
        "id": 7,
        "fullName": "Ali",
        "username": "ali",
        "department": null,
        "roles": ["CLERK"]
    })
}
