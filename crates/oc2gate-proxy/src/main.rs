use oc2gate_proxy::{build_state, server, HttpCommandChannel, ProxyConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("oc2gate_proxy=info,info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ProxyConfig::from_env()?;
    info!(
        addr = %config.listen_addr,
        actuator_url = %config.actuator_url,
        timeout_ms = config.actuator_timeout.as_millis() as u64,
        "Starting oc2gate proxy"
    );

    let channel = Arc::new(HttpCommandChannel::new(
        config.actuator_url.clone(),
        config.actuator_timeout,
    )?);
    let state = build_state(channel)?;

    match config.pending_ttl {
        Some(ttl) => {
            info!(ttl_secs = ttl.as_secs(), interval_secs = config.sweep_interval.as_secs(), "Pending command expiry enabled");
            state
                .controller
                .clone()
                .spawn_pending_sweeper(ttl, config.sweep_interval);
        }
        None => info!("Pending commands never expire"),
    }

    let listener = TcpListener::bind(config.listen_addr).await?;
    server::serve(listener, state).await?;

    Ok(())
}
