use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use crate::api::{build_pipeline, ApiVersion, EdgeDependencies};
use crate::auth::JwtAuthenticator;
use crate::config::EdgeConfig;
use crate::handlers::tree_routes;
use crate::middleware::UuidGenerator;
use crate::services::{InMemoryEventLog, InMemoryIdentityStore};

#[derive(Args, Debug)]
pub struct ServerArgs {
    #[arg(long, help = "Port to listen on (overrides EDGE_PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Accept every origin; for local development only")]
    pub local: bool,
}

pub async fn handle(args: ServerArgs) -> anyhow::Result<()> {
    let mut config = EdgeConfig::from_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.local {
        config.cors.local_mode = true;
    }
    config.validate()?;

    tracing::info!("Name            : {}", env!("CARGO_PKG_NAME"));
    tracing::info!("Version         : {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment     : {:?}", config.environment);
    tracing::info!("Local mode      : {}", config.cors.local_mode);
    tracing::info!("Allowed origins : {:?}", config.cors.allowed_origins);
    tracing::info!("v1 base path    : {}", config.api.v1_base_path);
    tracing::info!("v2 base path    : {}", config.api.v2_base_path);
    tracing::info!("Port            : {}", config.server.port);

    let authenticator = JwtAuthenticator::from_config(&config.auth)
        .context("unable to set up bearer token authenticator")?;

    let deps = EdgeDependencies {
        config: config.clone(),
        authenticator: Arc::new(authenticator),
        identities: Arc::new(InMemoryIdentityStore::new()),
        events: Arc::new(InMemoryEventLog::new()),
        request_ids: Arc::new(UuidGenerator),
    };

    let app = build_pipeline(
        &deps,
        tree_routes(ApiVersion::V1, &config.api.v1_base_path),
        tree_routes(ApiVersion::V2, &config.api.v2_base_path),
    );

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
