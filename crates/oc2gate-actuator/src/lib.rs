pub mod config;
pub mod features;
pub mod server;
pub mod shared;

pub use config::ActuatorConfig;
pub use features::command_dispatch::controller::DispatchController;
pub use features::command_dispatch::repo::{CloudCapability, CloudError, InMemoryCloud};
pub use features::command_dispatch::service::DispatchService;
pub use shared::error::{ActuatorError, ActuatorResult};

use std::sync::Arc;

/// Wire the dispatch stack on top of a cloud capability
pub fn build_controller(cloud: Arc<dyn CloudCapability>) -> Arc<DispatchController> {
    let service = Arc::new(DispatchService::new(cloud));
    Arc::new(DispatchController::new(service))
}
