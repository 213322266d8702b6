use std::{net::SocketAddr, process, sync::Arc};

use anyhow::{Context, Result};
use idp_broker::{
    HandlerContext, IdentityGateway, config::BrokerConfig, http, telemetry::init_tracing,
};
use tokio::signal;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(error) = run().await {
        tracing::error!("broker shut down with error: {error:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = BrokerConfig::from_env()?;
    tracing::info!(
        component = "broker",
        tenant = %config.tenant_key,
        development = config.development,
        "identity broker starting up"
    );

    let store = config.build_store()?;
    let gateway = Arc::new(IdentityGateway::new(store, config.gateway_options())?);

    // Initialization failures are retried lazily by the first request.
    if let Err(err) = gateway.init(&config.tenant_key).await {
        tracing::warn!(tenant = %config.tenant_key, "gateway not ready at startup: {err}");
    }

    let context = HandlerContext {
        gateway,
        tenant_key: config.tenant_key.clone(),
        password_reset: config.password_reset.clone(),
        expose_error_details: config.development,
    };
    let router = http::router(context, config.request_timeout);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(?addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
