// OpenC2 wire documents exchanged between the proxy and the actuator.
// The correlation id is not part of either document; it travels in the
// X-Request-ID header in both directions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Version: 1.0

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";
pub const OPENC2_COMMAND_CONTENT_TYPE: &str = "application/openc2-cmd+json;version=1.0";
pub const OPENC2_RESPONSE_CONTENT_TYPE: &str = "application/openc2-rsp+json;version=1.0";

/// Name of the custom target/results extension carrying instance specifiers
pub const NEWCONTEXT_AWS: &str = "x-newcontext:aws";

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Malformed OpenC2 document: {0}")]
    Malformed(String),
    #[error("Failed to encode OpenC2 document: {0}")]
    Encode(String),
    #[error(transparent)]
    Core(#[from] oc2gate_core::CoreError),
}

pub type ProtoResult<T> = std::result::Result<T, ProtoError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandDocument {
    pub action: String,
    #[serde(default)]
    pub target: TargetDocument,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetDocument {
    #[serde(rename = "x-newcontext:aws", default)]
    pub newcontext: AwsSpecifiers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AwsSpecifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseDocument {
    pub status: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultsDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsDocument {
    #[serde(rename = "x-newcontext:aws")]
    pub newcontext: AwsSpecifiers,
}
