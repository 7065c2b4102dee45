use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::PipelineError;

/// Correlation header, propagated from upstream proxies when present
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id attached to request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh correlation ids
pub trait RequestIdGenerator: Send + Sync {
    fn generate(&self) -> Result<String, PipelineError>;
}

/// Random (v4) UUIDs, 122 bits of entropy
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl RequestIdGenerator for UuidGenerator {
    fn generate(&self) -> Result<String, PipelineError> {
        Ok(Uuid::new_v4().to_string())
    }
}

/// Make sure `headers` carries an `x-request-id`.
///
/// A non-empty inbound value is kept as is. Otherwise a new id is generated
/// and inserted; generation failures leave the headers untouched.
pub fn assign_request_id(
    headers: &mut HeaderMap,
    generator: &dyn RequestIdGenerator,
) -> Result<RequestId, PipelineError> {
    if let Some(existing) = headers
        .get(REQUEST_ID_HEADER)
        .filter(|value| !value.as_bytes().is_empty())
    {
        return Ok(RequestId(String::from_utf8_lossy(existing.as_bytes()).into_owned()));
    }

    let id = generator.generate()?;
    let value = HeaderValue::from_str(&id)
        .map_err(|e| PipelineError::CorrelationGenerationFailed(e.to_string()))?;
    headers.insert(REQUEST_ID_HEADER, value);

    Ok(RequestId(id))
}

/// First middleware inside each API tree.
///
/// Everything logged further down the chain runs inside a span carrying the
/// request id. The id is echoed on the response.
pub async fn request_id_middleware(
    State(generator): State<Arc<dyn RequestIdGenerator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = match assign_request_id(request.headers_mut(), generator.as_ref()) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "continuing without request id: {}",
                e
            );
            None
        }
    };

    let span_id = request_id.as_ref().map(|id| id.0.clone()).unwrap_or_default();
    let span = tracing::info_span!("request", request_id = %span_id);

    // Echo the header bytes as received; `RequestId` may be a lossy rendering
    let echo = match &request_id {
        Some(id) => {
            request.extensions_mut().insert(id.clone());
            request.headers().get(REQUEST_ID_HEADER).cloned()
        }
        None => None,
    };

    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = echo {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
