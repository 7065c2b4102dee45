use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    Router,
};
use tower::ServiceExt;

use crate::error::{ApiError, PipelineError};

/// The two independently versioned API surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
        }
    }
}

/// One API tree and the path prefix it owns
#[derive(Clone)]
pub struct ApiTree {
    pub version: ApiVersion,
    pub base_path: String,
    pub handler: Router,
}

impl ApiTree {
    pub fn new(version: ApiVersion, base_path: impl Into<String>, handler: Router) -> Self {
        Self {
            version,
            base_path: base_path.into(),
            handler,
        }
    }
}

/// Sends each request to the first tree whose base path prefixes it.
///
/// Exactly one tree handles a request, even when base paths overlap.
#[derive(Clone)]
pub struct VersionRouter {
    trees: Vec<ApiTree>,
}

impl VersionRouter {
    pub fn new(trees: Vec<ApiTree>) -> Self {
        for (i, first) in trees.iter().enumerate() {
            for second in &trees[i + 1..] {
                if first.base_path.starts_with(&second.base_path)
                    || second.base_path.starts_with(&first.base_path)
                {
                    tracing::warn!(
                        first = %first.base_path,
                        second = %second.base_path,
                        "API base paths overlap; {} wins for shared prefixes",
                        first.version.as_str()
                    );
                }
            }
        }

        Self { trees }
    }

    pub fn select(&self, path: &str) -> Result<&ApiTree, PipelineError> {
        self.trees
            .iter()
            .find(|tree| path.starts_with(&tree.base_path))
            .ok_or_else(|| PipelineError::RoutingMiss(path.to_string()))
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let tree = match self.select(request.uri().path()) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::debug!(method = %request.method(), "{}", e);
                return ApiError::from(e).into_response();
            }
        };

        tracing::trace!(api = tree.version.as_str(), path = %request.uri().path(), "routing request");

        match tree.handler.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    /// Wrap as a router so outer layers can be applied
    pub fn into_router(self) -> Router {
        Router::new().fallback(dispatch).with_state(self)
    }
}

async fn dispatch(State(router): State<VersionRouter>, request: Request) -> Response {
    router.dispatch(request).await
}
