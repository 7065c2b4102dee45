use std::sync::{Arc, OnceLock};

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};

/// Write-once status cell shared through request extensions.
///
/// The first recorded status wins; later records are ignored.
#[derive(Debug, Clone, Default)]
pub struct StatusCapture(Arc<OnceLock<StatusCode>>);

impl StatusCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call set the status
    pub fn record(&self, status: StatusCode) -> bool {
        self.0.set(status).is_ok()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.0.get().copied()
    }
}

/// What the observer logs once the wrapped handler is done
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOutcome {
    pub status: Option<StatusCode>,
    pub method: Method,
    pub path: String,
}

impl ResponseOutcome {
    pub fn status_label(&self) -> String {
        match self.status {
            Some(status) => status.as_u16().to_string(),
            None => "unset".to_string(),
        }
    }
}

// Logs on drop, so a request abandoned mid-flight still gets its line
struct OutcomeLogger {
    capture: StatusCapture,
    method: Method,
    path: String,
}

impl OutcomeLogger {
    fn outcome(&self) -> ResponseOutcome {
        ResponseOutcome {
            status: self.capture.status(),
            method: self.method.clone(),
            path: self.path.clone(),
        }
    }
}

impl Drop for OutcomeLogger {
    fn drop(&mut self) {
        let outcome = self.outcome();
        tracing::info!(
            method = %outcome.method,
            path = %outcome.path,
            status = %outcome.status_label(),
            "response"
        );
    }
}

/// Observe the status of every response without touching headers or body
pub async fn response_observer_middleware(mut request: Request, next: Next) -> Response {
    let capture = StatusCapture::new();
    request.extensions_mut().insert(capture.clone());

    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let _logger = OutcomeLogger {
        capture: capture.clone(),
        method: request.method().clone(),
        path,
    };

    let response = next.run(request).await;
    capture.record(response.status());

    response
}
