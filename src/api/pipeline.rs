use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use super::router::{ApiTree, ApiVersion, VersionRouter};
use crate::auth::Authenticator;
use crate::config::EdgeConfig;
use crate::middleware::{
    cors_layer, identity_bootstrap_middleware, origin_guard_middleware, request_id_middleware,
    response_observer_middleware, IdentityBootstrap, OriginPolicy, RequestIdGenerator,
};
use crate::services::{EventLog, IdentityService};

/// Everything the pipeline needs, built once at startup
#[derive(Clone)]
pub struct EdgeDependencies {
    pub config: EdgeConfig,
    pub authenticator: Arc<dyn Authenticator>,
    pub identities: Arc<dyn IdentityService>,
    pub events: Arc<dyn EventLog>,
    pub request_ids: Arc<dyn RequestIdGenerator>,
}

/// Shared middleware stack for one API tree.
///
/// Execution order: request id, response observer, identity bootstrap,
/// then the tree's own handlers. Layers added last run first.
pub fn wrap_tree(tree: Router, deps: &EdgeDependencies) -> Router {
    let bootstrap = Arc::new(IdentityBootstrap::new(
        deps.authenticator.clone(),
        deps.identities.clone(),
        deps.events.clone(),
    ));

    tree.layer(middleware::from_fn_with_state(bootstrap, identity_bootstrap_middleware))
        .layer(middleware::from_fn(response_observer_middleware))
        .layer(middleware::from_fn_with_state(
            deps.request_ids.clone(),
            request_id_middleware,
        ))
}

/// Compose the full edge entry point.
///
/// The origin guard sits outside the router so denied cross-origin calls
/// never reach a tree or touch identity state.
pub fn build_pipeline(deps: &EdgeDependencies, v1: Router, v2: Router) -> Router {
    let router = VersionRouter::new(vec![
        ApiTree::new(ApiVersion::V1, deps.config.api.v1_base_path.clone(), wrap_tree(v1, deps)),
        ApiTree::new(ApiVersion::V2, deps.config.api.v2_base_path.clone(), wrap_tree(v2, deps)),
    ]);

    let policy = Arc::new(OriginPolicy::from_config(&deps.config));

    router
        .into_router()
        .layer(cors_layer(policy.clone()))
        .layer(middleware::from_fn_with_state(policy, origin_guard_middleware))
        .layer(TraceLayer::new_for_http())
}
