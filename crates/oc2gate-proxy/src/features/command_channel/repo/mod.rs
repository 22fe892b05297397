use async_trait::async_trait;
use oc2gate_core::{Command, CorrelationId, Method, Response};
use oc2gate_proto::{
    decode_response, encode_command, ProtoError, OPENC2_COMMAND_CONTENT_TYPE, REQUEST_ID_HEADER,
};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failures while exchanging one command with the actuator
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("actuator rejected request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("reply is missing the X-Request-ID header")]
    MissingRequestId,
    #[error("reply carries X-Request-ID {actual}, expected {expected}")]
    CorrelationMismatch {
        expected: CorrelationId,
        actual: String,
    },
    #[error("undecodable reply: {0}")]
    Decode(#[from] ProtoError),
}

impl From<reqwest::Error> for ChannelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChannelError::Timeout
        } else {
            ChannelError::Transport(err.to_string())
        }
    }
}

/// Carries a command to the actuator and returns its matching response
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn send(&self, method: Method, command: &Command) -> Result<Response, ChannelError>;
}

/// OpenC2-over-HTTP channel
pub struct HttpCommandChannel {
    client: Client,
    endpoint: String,
}

impl HttpCommandChannel {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CommandChannel for HttpCommandChannel {
    async fn send(&self, method: Method, command: &Command) -> Result<Response, ChannelError> {
        let body = encode_command(command)?;
        let request_id = HeaderValue::from_str(command.correlation_id.as_str())
            .map_err(|e| ChannelError::Transport(format!("invalid correlation id: {e}")))?;

        let http_method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        debug!(
            correlation_id = %command.correlation_id,
            %method,
            endpoint = %self.endpoint,
            body = %String::from_utf8_lossy(&body),
            "Sending OpenC2 command"
        );

        let reply = self
            .client
            .request(http_method, &self.endpoint)
            .header(CONTENT_TYPE, OPENC2_COMMAND_CONTENT_TYPE)
            .header(REQUEST_ID_HEADER, request_id)
            .body(body)
            .send()
            .await?;

        let status = reply.status().as_u16();
        let echoed = reply
            .headers()
            .get(REQUEST_ID_HEADER)
            .map(|value| value.to_str().unwrap_or_default().to_string());
        let payload = reply.bytes().await?;

        let echoed = match echoed {
            Some(id) => id,
            // The actuator only omits the header when it could not read ours
            None if !(200..300).contains(&status) => {
                return Err(ChannelError::Rejected {
                    status,
                    body: String::from_utf8_lossy(&payload).into_owned(),
                });
            }
            None => return Err(ChannelError::MissingRequestId),
        };

        if echoed != command.correlation_id.as_str() {
            return Err(ChannelError::CorrelationMismatch {
                expected: command.correlation_id.clone(),
                actual: echoed,
            });
        }

        debug!(
            correlation_id = %command.correlation_id,
            http_status = status,
            body = %String::from_utf8_lossy(&payload),
            "Received OpenC2 response"
        );

        Ok(decode_response(&payload, command.correlation_id.clone())?)
    }
}
