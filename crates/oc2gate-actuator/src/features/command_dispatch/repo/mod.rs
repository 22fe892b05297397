pub mod in_memory;

use async_trait::async_trait;
use thiserror::Error;

pub use in_memory::InMemoryCloud;

/// Failure surfaced by a cloud compute provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudError {
    /// The provider rejected the call (malformed id, permissions, throttling, ...)
    #[error("{code}: {message}")]
    Provider { code: String, message: String },
    #[error("internal provider failure: {0}")]
    Internal(String),
}

impl CloudError {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type CloudResult<T> = std::result::Result<T, CloudError>;

/// Instance lifecycle operations of a cloud compute provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudCapability: Send + Sync {
    /// Launch one instance from `image`, returning its instance id
    async fn create_instance(&self, image: &str) -> CloudResult<String>;

    async fn start_instance(&self, instance_id: &str) -> CloudResult<()>;

    /// Returns whether the instance was running before the call
    async fn stop_instance(&self, instance_id: &str) -> CloudResult<bool>;

    async fn terminate_instance(&self, instance_id: &str) -> CloudResult<()>;

    /// Current state name, or `None` if no instance matches
    async fn describe_instance(&self, instance_id: &str) -> CloudResult<Option<String>>;
}
