use crate::features::command_dispatch::service::DispatchService;
use crate::shared::error::{ActuatorError, ActuatorResult};
use oc2gate_core::{CorrelationId, Method, Response};
use oc2gate_proto::{decode_command, ProtoError};
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point for inbound OpenC2 requests, independent of the HTTP framework
pub struct DispatchController {
    service: Arc<DispatchService>,
}

impl DispatchController {
    pub fn new(service: Arc<DispatchService>) -> Self {
        Self { service }
    }

    /// Handle one inbound request.
    ///
    /// Fails only with [`ActuatorError::MissingCorrelation`]; every later
    /// failure is reported as an OpenC2 response carrying the request id.
    pub async fn handle_request(
        &self,
        method: Method,
        request_id: Option<&str>,
        body: &[u8],
    ) -> ActuatorResult<Response> {
        let correlation_id = request_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(CorrelationId::from)
            .ok_or(ActuatorError::MissingCorrelation)?;

        debug!(%correlation_id, %method, body = %String::from_utf8_lossy(body), "Received OpenC2 command");

        let command = match decode_command(body, correlation_id.clone()) {
            Ok(command) => command,
            Err(ProtoError::Core(error)) => {
                return Ok(ActuatorError::from(error).into_response(correlation_id));
            }
            Err(error) => {
                return Ok(ActuatorError::MalformedCommand(error.to_string())
                    .into_response(correlation_id));
            }
        };

        info!(%correlation_id, %method, action = %command.action, "Dispatching command");

        Ok(self.service.dispatch(method, &command).await)
    }
}
