use crate::features::correlation::service::{CorrelationService, Reconciliation};
use crate::shared::error::ProxyResult;
use oc2gate_core::CorrelationId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

/// Caller-facing operations of the proxy
pub struct CorrelationController {
    service: Arc<CorrelationService>,
}

impl CorrelationController {
    pub fn new(service: Arc<CorrelationService>) -> Self {
        Self { service }
    }

    pub async fn create(&self, image: &str) -> ProxyResult<Reconciliation> {
        info!(%image, "Received create request");
        self.service.create(image).await
    }

    pub async fn query(&self, instance_id: &str) -> ProxyResult<Reconciliation> {
        info!(%instance_id, "Received query request");
        self.service.query(instance_id).await
    }

    pub async fn start(&self, instance_id: &str) -> ProxyResult<Reconciliation> {
        info!(%instance_id, "Received start request");
        self.service.start(instance_id).await
    }

    pub async fn stop(&self, instance_id: &str) -> ProxyResult<Reconciliation> {
        info!(%instance_id, "Received stop request");
        self.service.stop(instance_id).await
    }

    pub async fn delete(&self, instance_id: &str) -> ProxyResult<Reconciliation> {
        info!(%instance_id, "Received delete request");
        self.service.delete(instance_id).await
    }

    pub async fn status_snapshot(&self) -> ProxyResult<HashMap<String, String>> {
        self.service.status_snapshot().await
    }

    pub async fn pending_ids(&self) -> ProxyResult<Vec<CorrelationId>> {
        Ok(self
            .service
            .pending_commands()
            .await?
            .into_iter()
            .map(|entry| entry.command.correlation_id)
            .collect())
    }

    /// Expire commands older than `ttl` every `interval`
    pub fn spawn_pending_sweeper(self: Arc<Self>, ttl: Duration, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            loop {
                ticker.tick().await;

                match self.service.expire_pending(ttl).await {
                    Ok(expired) if !expired.is_empty() => {
                        info!(count = expired.len(), "Expired unanswered commands");
                    }
                    Ok(_) => debug!("No pending commands expired"),
                    Err(error) => warn!(error = %error, "Pending sweep failed"),
                }
            }
        })
    }
}
