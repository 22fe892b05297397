use oc2gate_actuator::{build_controller, server, ActuatorConfig, InMemoryCloud};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("oc2gate_actuator=info,info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ActuatorConfig::from_env()?;
    info!(addr = %config.listen_addr, "Starting oc2gate actuator");

    let cloud = Arc::new(InMemoryCloud::new(config.region));
    info!(region = %cloud.region(), "In-memory cloud ready");
    let controller = build_controller(cloud);

    let listener = TcpListener::bind(config.listen_addr).await?;
    server::serve(listener, controller).await?;

    Ok(())
}
