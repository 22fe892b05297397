use crate::features::command_channel::repo::ChannelError;
use oc2gate_core::{CorrelationId, ErrorResponse};
use std::collections::HashMap;
use thiserror::Error;

/// Proxy specific errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Unknown correlation id: {0}")]
    UnknownCorrelation(CorrelationId),
    #[error("Command {correlation_id} not answered: {source}")]
    Channel {
        correlation_id: CorrelationId,
        #[source]
        source: ChannelError,
    },
    #[error("Malformed response for {correlation_id}: {reason}")]
    MalformedResponse {
        correlation_id: CorrelationId,
        reason: String,
    },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl ProxyError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ProxyError::UnknownCorrelation(_) => "UNKNOWN_CORRELATION",
            ProxyError::Channel { .. } => "CHANNEL_ERROR",
            ProxyError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            ProxyError::InvalidRequest(_) => "INVALID_REQUEST",
            ProxyError::StorageError(_) => "STORAGE_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ProxyError::UnknownCorrelation(_) => 409,
            ProxyError::Channel { .. } | ProxyError::MalformedResponse { .. } => 502,
            ProxyError::InvalidRequest(_) => 400,
            ProxyError::StorageError(_) => 500,
        }
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            ProxyError::UnknownCorrelation(id)
            | ProxyError::Channel {
                correlation_id: id, ..
            }
            | ProxyError::MalformedResponse {
                correlation_id: id, ..
            } => Some(id),
            ProxyError::InvalidRequest(_) | ProxyError::StorageError(_) => None,
        }
    }
}

impl From<ProxyError> for ErrorResponse {
    fn from(err: ProxyError) -> Self {
        let response = ErrorResponse::new(err.error_code(), err.to_string());
        match err.correlation_id() {
            Some(id) => {
                let mut details = HashMap::new();
                details.insert("correlation_id".to_string(), id.to_string());
                response.with_details(details)
            }
            None => response,
        }
    }
}

pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_correlation_conversion() {
        let err = ProxyError::UnknownCorrelation(CorrelationId::from("abc"));
        assert_eq!(err.http_status(), 409);

        let response: ErrorResponse = err.into();
        assert_eq!(response.error_code, "UNKNOWN_CORRELATION");
        assert_eq!(response.message, "Unknown correlation id: abc");
        assert_eq!(
            response.details.unwrap().get("correlation_id").map(String::as_str),
            Some("abc")
        );
    }

    #[test]
    fn test_channel_error_names_correlation_id() {
        let err = ProxyError::Channel {
            correlation_id: CorrelationId::from("req-1"),
            source: ChannelError::Transport("connection refused".to_string()),
        };
        assert_eq!(err.error_code(), "CHANNEL_ERROR");
        assert_eq!(err.http_status(), 502);
        assert!(err.to_string().contains("req-1"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_invalid_request_has_no_details() {
        let response: ErrorResponse = ProxyError::InvalidRequest("image is empty".to_string()).into();
        assert_eq!(response.error_code, "INVALID_REQUEST");
        assert_eq!(response.message, "Invalid request: image is empty");
        assert!(response.details.is_none());
    }

    #[test]
    fn test_storage_error_status() {
        let err = ProxyError::StorageError("Lock poisoned".to_string());
        assert_eq!(err.http_status(), 500);
        assert!(err.to_string().contains("Storage error"));
    }
}
