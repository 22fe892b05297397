pub mod config;
pub mod features;
pub mod server;
pub mod shared;

pub use config::ProxyConfig;
pub use features::command_channel::repo::{ChannelError, CommandChannel, HttpCommandChannel};
pub use features::correlation::controller::CorrelationController;
pub use features::correlation::repo::{
    InMemoryInstanceStatusRepository, InMemoryPendingCommandRepository,
};
pub use features::correlation::service::{CorrelationService, Reconciliation};
pub use features::observability::controller::ObservabilityController;
pub use shared::error::{ProxyError, ProxyResult};

use std::sync::Arc;

/// Wire the proxy stack with in-memory state on top of `channel`
pub fn build_state(
    channel: Arc<dyn CommandChannel>,
) -> Result<server::AppState, Box<dyn std::error::Error + Send + Sync>> {
    let observability = Arc::new(ObservabilityController::with_registry()?);
    let service = CorrelationService::new(
        Arc::new(InMemoryPendingCommandRepository::new()),
        Arc::new(InMemoryInstanceStatusRepository::new()),
        channel,
        observability.clone(),
    );

    Ok(server::AppState {
        controller: Arc::new(CorrelationController::new(Arc::new(service))),
        observability,
    })
}
