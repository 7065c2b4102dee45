// handlers/mod.rs - Endpoints the edge serves itself on each API tree.
//
// Business endpoints live behind the same base paths in their own services;
// anything this crate does not know answers 404.

pub mod health;
pub mod version;

use axum::{routing::get, Router};

use crate::api::ApiVersion;
use crate::error::ApiError;

pub use health::health;
pub use version::version;

/// Routes for one API tree, rooted at `base_path`
pub fn tree_routes(api: ApiVersion, base_path: &str) -> Router {
    let base = base_path.trim_end_matches('/');

    Router::new()
        .route(&format!("{}/health", base), get(health))
        .route(&format!("{}/version", base), get(version))
        .fallback(|| async { ApiError::not_found("Resource not found") })
        .with_state(api)
}
