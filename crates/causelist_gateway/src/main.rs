use std::sync::Arc;

use anyhow::{Context, Result};
use causelist_gateway::{router, Forwarder, GatewayConfig, ReqwestForwarder};
use causelist_logging::{cl_info, LogDestination};
use log::LevelFilter;

#[tokio::main]
async fn main() -> Result<()> {
    causelist_logging::initialize(LogDestination::Terminal, LevelFilter::Info);

    let config = GatewayConfig::from_env().context("Failed to load gateway configuration")?;
    let forwarder: Arc<dyn Forwarder> = Arc::new(
        ReqwestForwarder::new(&config.upstream_origin).context("Failed to build forwarder")?,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    cl_info!(
        "Gateway listening on {}, forwarding /proxy to {}",
        config.bind_addr,
        config.upstream_origin
    );

    axum::serve(listener, router(forwarder))
        .await
        .context("Server error")?;
    Ok(())
}
