use crate::features::command_dispatch::repo::CloudCapability;
use crate::shared::error::{ActuatorError, ActuatorResult};
use oc2gate_core::{route_allows, Action, Command, Method, Response};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maps OpenC2 commands onto cloud capability calls
pub struct DispatchService {
    cloud: Arc<dyn CloudCapability>,
}

impl DispatchService {
    pub fn new(cloud: Arc<dyn CloudCapability>) -> Self {
        Self { cloud }
    }

    /// Execute `command` received with `method`.
    ///
    /// Always yields a well-formed response carrying the command's correlation
    /// id; every failure is folded into a 400-class response.
    pub async fn dispatch(&self, method: Method, command: &Command) -> Response {
        match self.execute(method, command).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    correlation_id = %command.correlation_id,
                    action = %command.action,
                    %method,
                    error = %error,
                    "Command failed"
                );
                error.into_response(command.correlation_id.clone())
            }
        }
    }

    async fn execute(&self, method: Method, command: &Command) -> ActuatorResult<Response> {
        if !route_allows(method, command.action) {
            return Err(ActuatorError::UnsupportedOperation(format!(
                "{} {}",
                method, command.action
            )));
        }

        let correlation_id = command.correlation_id.clone();

        match command.action {
            Action::Create => {
                let image = command.target.require_image()?;
                let instance_id = self.cloud.create_instance(image).await?;
                info!(%correlation_id, %image, %instance_id, "Instance created");

                Ok(Response::ok(instance_id.clone(), correlation_id).with_instance(instance_id))
            }
            Action::Start => {
                let instance_id = command.target.require_instance()?;
                self.cloud.start_instance(instance_id).await?;
                info!(%correlation_id, %instance_id, "Instance started");

                Ok(Response::ok("", correlation_id))
            }
            Action::Stop => {
                let instance_id = command.target.require_instance()?;
                let was_running = self.cloud.stop_instance(instance_id).await?;
                info!(%correlation_id, %instance_id, was_running, "Instance stopped");

                Ok(Response::ok("", correlation_id))
            }
            Action::Delete => {
                let instance_id = command.target.require_instance()?;
                self.cloud.terminate_instance(instance_id).await?;
                info!(%correlation_id, %instance_id, "Instance terminated");

                Ok(Response::ok("", correlation_id))
            }
            Action::Query => {
                let instance_id = command.target.require_instance()?;
                match self.cloud.describe_instance(instance_id).await? {
                    Some(state) => {
                        debug!(%correlation_id, %instance_id, %state, "Instance described");
                        Ok(Response::ok(state, correlation_id))
                    }
                    None => {
                        debug!(%correlation_id, %instance_id, "Instance not found");
                        Ok(Response::not_found(correlation_id))
                    }
                }
            }
        }
    }
}
