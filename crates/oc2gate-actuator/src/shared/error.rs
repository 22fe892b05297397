use crate::features::command_dispatch::repo::CloudError;
use oc2gate_core::{CoreError, CorrelationId, Response, STATUS_BAD_REQUEST};
use thiserror::Error;

/// Actuator specific errors
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// Answered at the transport layer; no OpenC2 response can be built
    #[error("missing X-Request-ID header")]
    MissingCorrelation,
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("malformed command: {0}")]
    MalformedCommand(String),
    #[error("{0}")]
    Provider(#[from] CloudError),
}

impl ActuatorError {
    pub fn status_code(&self) -> u16 {
        STATUS_BAD_REQUEST
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ActuatorError::MissingCorrelation => "MISSING_CORRELATION",
            ActuatorError::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            ActuatorError::MalformedCommand(_) => "MALFORMED_COMMAND",
            ActuatorError::Provider(_) => "PROVIDER_ERROR",
        }
    }

    /// Failure response for the command identified by `correlation_id`
    pub fn into_response(self, correlation_id: CorrelationId) -> Response {
        Response::new(self.status_code(), self.to_string(), correlation_id)
    }
}

impl From<CoreError> for ActuatorError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownAction(_) => {
                ActuatorError::UnsupportedOperation(err.to_string())
            }
            CoreError::MissingTargetSpecifier(_) => ActuatorError::MalformedCommand(err.to_string()),
        }
    }
}

pub type ActuatorResult<T> = std::result::Result<T, ActuatorError>;
