pub mod routing;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub use routing::{route_allows, Method, ROUTING_TABLE};

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;

/// Status text of a query that matched no instance
pub const INSTANCE_NOT_FOUND_TEXT: &str = "instance not found";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Missing target specifier: {0}")]
    MissingTargetSpecifier(&'static str),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Cloud lifecycle operation carried by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Start,
    Stop,
    Delete,
    Query,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Start,
        Action::Stop,
        Action::Delete,
        Action::Query,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Delete => "delete",
            Action::Query => "query",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| CoreError::UnknownAction(s.to_string()))
    }
}

/// Opaque token tying a command to its response
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Fresh random id; uniqueness against pending commands is the caller's concern
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Target specifiers recognised by the gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpecifiers {
    pub image: Option<String>,
    pub instance: Option<String>,
}

impl TargetSpecifiers {
    pub fn image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            instance: None,
        }
    }

    pub fn instance(instance: impl Into<String>) -> Self {
        Self {
            image: None,
            instance: Some(instance.into()),
        }
    }

    pub fn require_image(&self) -> Result<&str> {
        self.image
            .as_deref()
            .ok_or(CoreError::MissingTargetSpecifier("image"))
    }

    pub fn require_instance(&self) -> Result<&str> {
        self.instance
            .as_deref()
            .ok_or(CoreError::MissingTargetSpecifier("instance"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub target: TargetSpecifiers,
    pub correlation_id: CorrelationId,
}

impl Command {
    pub fn new(action: Action, target: TargetSpecifiers, correlation_id: CorrelationId) -> Self {
        Self {
            action,
            target,
            correlation_id,
        }
    }

    /// Transport method this command must travel with
    pub fn method(&self) -> Method {
        Method::for_action(self.action)
    }
}

/// Structured results attached to a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseResults {
    pub instance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub results: Option<ResponseResults>,
    pub correlation_id: CorrelationId,
}

impl Response {
    pub fn new(status: u16, status_text: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            results: None,
            correlation_id,
        }
    }

    pub fn ok(status_text: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self::new(STATUS_OK, status_text, correlation_id)
    }

    pub fn not_found(correlation_id: CorrelationId) -> Self {
        Self::new(STATUS_NOT_FOUND, INSTANCE_NOT_FOUND_TEXT, correlation_id)
    }

    pub fn bad_request(status_text: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self::new(STATUS_BAD_REQUEST, status_text, correlation_id)
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.results = Some(ResponseResults {
            instance: Some(instance.into()),
        });
        self
    }

    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    pub fn result_instance(&self) -> Option<&str> {
        self.results.as_ref().and_then(|r| r.instance.as_deref())
    }
}

pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    pub details: Option<HashMap<String, String>>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: HashMap<String, String>) -> Self {
        self.details = Some(details);
        self
    }
}
