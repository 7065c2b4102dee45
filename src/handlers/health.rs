// handlers/health.rs - GET {base}/health, served by both API trees

use axum::extract::State;
use serde::Serialize;

use crate::api::ApiVersion;
use crate::middleware::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub api: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub async fn health(State(version): State<ApiVersion>) -> ApiResponse<HealthStatus> {
    ApiResponse::success(HealthStatus {
        status: "ok",
        api: version.as_str(),
        timestamp: chrono::Utc::now(),
    })
}
