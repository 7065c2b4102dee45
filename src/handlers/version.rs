// handlers/version.rs - GET {base}/version, build information for either tree

use axum::extract::State;
use serde::Serialize;

use crate::api::ApiVersion;
use crate::middleware::ApiResponse;

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub api: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
    pub branch: &'static str,
    pub build_date: &'static str,
}

impl BuildInfo {
    pub fn current(version: ApiVersion) -> Self {
        Self {
            api: version.as_str(),
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("GIT_COMMIT").unwrap_or("unknown"),
            branch: option_env!("GIT_BRANCH").unwrap_or("unknown"),
            build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        }
    }
}

pub async fn version(State(version): State<ApiVersion>) -> ApiResponse<BuildInfo> {
    ApiResponse::success(BuildInfo::current(version))
}
