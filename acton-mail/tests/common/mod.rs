//! In-process fake of the Resend emails endpoint

#![allow(dead_code)]

use std::sync::Arc;

use acton_mail::ResendSettings;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use parking_lot::Mutex;
use serde_json::Value;

/// One request received by the fake server
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

struct Shared {
    status: StatusCode,
    response: String,
    requests: Mutex<Vec<CapturedRequest>>,
}

/// Fake Resend server bound to an ephemeral local port
pub struct FakeResend {
    endpoint: String,
    shared: Arc<Shared>,
}

impl FakeResend {
    /// Start a server that accepts every request
    pub async fn accepting() -> Self {
        Self::start(StatusCode::OK, r#"{"id":"49a3999c-0ce1-4ea6-ab68-afcd6dc2e794"}"#).await
    }

    /// Start a server that answers every request with `status` and `response`
    pub async fn start(status: StatusCode, response: &str) -> Self {
        let shared = Arc::new(Shared {
            status,
            response: response.to_string(),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/emails", post(emails))
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake resend server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            endpoint: format!("http://{addr}/emails"),
            shared,
        }
    }

    /// Settings pointing a client at this server
    pub fn settings(&self, api_key: &str) -> ResendSettings {
        ResendSettings {
            api_key: api_key.to_string(),
            endpoint: self.endpoint.clone(),
            timeout_ms: 5_000,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.shared.requests.lock().len()
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.shared.requests.lock().clone()
    }

    /// The only request received; panics unless exactly one arrived
    pub fn single_request(&self) -> CapturedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().expect("one request")
    }
}

async fn emails(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };

    shared.requests.lock().push(CapturedRequest {
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    (shared.status, shared.response.clone())
}
