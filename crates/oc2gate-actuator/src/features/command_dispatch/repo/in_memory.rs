use super::{CloudCapability, CloudError, CloudResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Running,
    Stopped,
    Terminated,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Running => "running",
            InstanceState::Stopped => "stopped",
            InstanceState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct InstanceRecord {
    image: String,
    state: InstanceState,
}

/// In-process compute provider with EC2-shaped ids, states and error codes
#[derive(Clone)]
pub struct InMemoryCloud {
    region: String,
    instances: Arc<RwLock<HashMap<String, InstanceRecord>>>,
}

impl InMemoryCloud {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            instances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn generate_instance_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("i-{}", &hex[..17])
    }

    fn validate_image(image: &str) -> CloudResult<()> {
        match image.strip_prefix("ami-") {
            Some(rest) if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Ok(())
            }
            _ => Err(CloudError::provider(
                "InvalidAMIID.Malformed",
                format!("Invalid id: \"{image}\" (expecting \"ami-...\")"),
            )),
        }
    }

    fn validate_instance_id(instance_id: &str) -> CloudResult<()> {
        match instance_id.strip_prefix("i-") {
            Some(rest) if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Ok(())
            }
            _ => Err(CloudError::provider(
                "InvalidInstanceID.Malformed",
                format!("Invalid id: \"{instance_id}\""),
            )),
        }
    }

    fn not_found(instance_id: &str) -> CloudError {
        CloudError::provider(
            "InvalidInstanceID.NotFound",
            format!("The instance ID '{instance_id}' does not exist"),
        )
    }

    fn incorrect_state(instance_id: &str, state: InstanceState, operation: &str) -> CloudError {
        CloudError::provider(
            "IncorrectInstanceState",
            format!("The instance '{instance_id}' is not in a state from which it can be {operation}: {state}"),
        )
    }

    /// Applies `transition` to an existing instance under the write lock
    fn transition<T>(
        &self,
        instance_id: &str,
        transition: impl FnOnce(&mut InstanceRecord) -> CloudResult<T>,
    ) -> CloudResult<T> {
        Self::validate_instance_id(instance_id)?;

        let mut instances = self
            .instances
            .write()
            .map_err(|_| CloudError::Internal("Lock poisoned".to_string()))?;
        let record = instances
            .get_mut(instance_id)
            .ok_or_else(|| Self::not_found(instance_id))?;

        transition(record)
    }
}

impl Default for InMemoryCloud {
    fn default() -> Self {
        Self::new("us-west-2")
    }
}

#[async_trait]
impl CloudCapability for InMemoryCloud {
    async fn create_instance(&self, image: &str) -> CloudResult<String> {
        Self::validate_image(image)?;

        let instance_id = Self::generate_instance_id();
        let mut instances = self
            .instances
            .write()
            .map_err(|_| CloudError::Internal("Lock poisoned".to_string()))?;
        instances.insert(
            instance_id.clone(),
            InstanceRecord {
                image: image.to_string(),
                state: InstanceState::Running,
            },
        );

        debug!(region = %self.region, %image, %instance_id, "instance launched");
        Ok(instance_id)
    }

    async fn start_instance(&self, instance_id: &str) -> CloudResult<()> {
        self.transition(instance_id, |record| match record.state {
            InstanceState::Terminated => Err(Self::incorrect_state(
                instance_id,
                record.state,
                "started",
            )),
            _ => {
                record.state = InstanceState::Running;
                Ok(())
            }
        })
    }

    async fn stop_instance(&self, instance_id: &str) -> CloudResult<bool> {
        self.transition(instance_id, |record| match record.state {
            InstanceState::Terminated => Err(Self::incorrect_state(
                instance_id,
                record.state,
                "stopped",
            )),
            previous => {
                record.state = InstanceState::Stopped;
                Ok(previous == InstanceState::Running)
            }
        })
    }

    async fn terminate_instance(&self, instance_id: &str) -> CloudResult<()> {
        self.transition(instance_id, |record| {
            record.state = InstanceState::Terminated;
            Ok(())
        })
    }

    async fn describe_instance(&self, instance_id: &str) -> CloudResult<Option<String>> {
        Self::validate_instance_id(instance_id)?;

        let instances = self
            .instances
            .read()
            .map_err(|_| CloudError::Internal("Lock poisoned".to_string()))?;
        Ok(instances.get(instance_id).map(|record| {
            debug!(%instance_id, image = %record.image, state = %record.state, "instance described");
            record.state.to_string()
        }))
    }
}
