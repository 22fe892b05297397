use crate::shared::error::{ProxyError, ProxyResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oc2gate_core::{Action, Command, CorrelationId, TargetSpecifiers};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Bound on id regeneration when a fresh id is already pending
const MAX_ID_ATTEMPTS: usize = 16;

pub const PLACEHOLDER_PREFIX: &str = "failed-create-";

/// A command awaiting its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub command: Command,
    pub issued_at: DateTime<Utc>,
}

/// Repository trait for the pending-command table
#[async_trait]
pub trait PendingCommandRepository: Send + Sync {
    /// Allocate an unused correlation id and register the resulting command
    async fn register(&self, action: Action, target: TargetSpecifiers) -> ProxyResult<Command>;

    /// Remove and return the command registered under `correlation_id`
    async fn take(&self, correlation_id: &CorrelationId) -> ProxyResult<Option<PendingCommand>>;

    async fn contains(&self, correlation_id: &CorrelationId) -> ProxyResult<bool>;

    async fn list(&self) -> ProxyResult<Vec<PendingCommand>>;

    /// Remove and return every command issued at or before `cutoff`
    async fn remove_stale(&self, cutoff: DateTime<Utc>) -> ProxyResult<Vec<PendingCommand>>;

    async fn len(&self) -> ProxyResult<usize>;
}

/// Repository trait for the instance-status map
#[async_trait]
pub trait InstanceStatusRepository: Send + Sync {
    async fn get(&self, instance_id: &str) -> ProxyResult<Option<String>>;

    /// Insert or overwrite the status of `instance_id`
    async fn set(&self, instance_id: &str, status: String) -> ProxyResult<()>;

    /// Record `status` under the next free failed-create placeholder id
    async fn insert_placeholder(&self, status: String) -> ProxyResult<String>;

    async fn snapshot(&self) -> ProxyResult<HashMap<String, String>>;
}

type IdSource = Box<dyn Fn() -> CorrelationId + Send + Sync>;

/// In-memory implementation of the pending-command table
pub struct InMemoryPendingCommandRepository {
    storage: Arc<RwLock<HashMap<CorrelationId, PendingCommand>>>,
    id_source: IdSource,
}

impl InMemoryPendingCommandRepository {
    pub fn new() -> Self {
        Self::with_id_source(Box::new(CorrelationId::generate))
    }

    pub fn with_id_source(id_source: IdSource) -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            id_source,
        }
    }
}

impl Default for InMemoryPendingCommandRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> ProxyError {
    ProxyError::StorageError("Lock poisoned".to_string())
}

#[async_trait]
impl PendingCommandRepository for InMemoryPendingCommandRepository {
    async fn register(&self, action: Action, target: TargetSpecifiers) -> ProxyResult<Command> {
        let mut storage = self.storage.write().map_err(poisoned)?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let correlation_id = (self.id_source)();
            if storage.contains_key(&correlation_id) {
                continue;
            }

            let command = Command::new(action, target, correlation_id.clone());
            storage.insert(
                correlation_id,
                PendingCommand {
                    command: command.clone(),
                    issued_at: Utc::now(),
                },
            );
            return Ok(command);
        }

        Err(ProxyError::StorageError(
            "could not allocate an unused correlation id".to_string(),
        ))
    }

    async fn take(&self, correlation_id: &CorrelationId) -> ProxyResult<Option<PendingCommand>> {
        let mut storage = self.storage.write().map_err(poisoned)?;
        Ok(storage.remove(correlation_id))
    }

    async fn contains(&self, correlation_id: &CorrelationId) -> ProxyResult<bool> {
        let storage = self.storage.read().map_err(poisoned)?;
        Ok(storage.contains_key(correlation_id))
    }

    async fn list(&self) -> ProxyResult<Vec<PendingCommand>> {
        let storage = self.storage.read().map_err(poisoned)?;
        let mut pending: Vec<_> = storage.values().cloned().collect();
        pending.sort_by_key(|entry| entry.issued_at);
        Ok(pending)
    }

    async fn remove_stale(&self, cutoff: DateTime<Utc>) -> ProxyResult<Vec<PendingCommand>> {
        let mut storage = self.storage.write().map_err(poisoned)?;
        let expired: Vec<CorrelationId> = storage
            .iter()
            .filter(|(_, entry)| entry.issued_at <= cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        Ok(expired
            .iter()
            .filter_map(|id| storage.remove(id))
            .collect())
    }

    async fn len(&self) -> ProxyResult<usize> {
        let storage = self.storage.read().map_err(poisoned)?;
        Ok(storage.len())
    }
}

#[derive(Default)]
struct StatusTable {
    entries: HashMap<String, String>,
    last_placeholder: u64,
}

/// In-memory implementation of the instance-status map
#[derive(Clone, Default)]
pub struct InMemoryInstanceStatusRepository {
    storage: Arc<RwLock<StatusTable>>,
}

impl InMemoryInstanceStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStatusRepository for InMemoryInstanceStatusRepository {
    async fn get(&self, instance_id: &str) -> ProxyResult<Option<String>> {
        let storage = self.storage.read().map_err(poisoned)?;
        Ok(storage.entries.get(instance_id).cloned())
    }

    async fn set(&self, instance_id: &str, status: String) -> ProxyResult<()> {
        let mut storage = self.storage.write().map_err(poisoned)?;
        storage.entries.insert(instance_id.to_string(), status);
        Ok(())
    }

    async fn insert_placeholder(&self, status: String) -> ProxyResult<String> {
        let mut storage = self.storage.write().map_err(poisoned)?;

        let placeholder = loop {
            storage.last_placeholder += 1;
            let candidate = format!("{PLACEHOLDER_PREFIX}{}", storage.last_placeholder);
            if !storage.entries.contains_key(&candidate) {
                break candidate;
            }
        };

        storage.entries.insert(placeholder.clone(), status);
        Ok(placeholder)
    }

    async fn snapshot(&self) -> ProxyResult<HashMap<String, String>> {
        let storage = self.storage.read().map_err(poisoned)?;
        Ok(storage.entries.clone())
    }
}
