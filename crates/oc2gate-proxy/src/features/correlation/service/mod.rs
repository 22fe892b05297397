use crate::features::command_channel::repo::CommandChannel;
use crate::features::correlation::repo::{
    InstanceStatusRepository, PendingCommand, PendingCommandRepository,
};
use crate::features::observability::controller::ObservabilityController;
use crate::shared::error::{ProxyError, ProxyResult};
use chrono::Utc;
use oc2gate_core::{Action, Command, CorrelationId, Response, TargetSpecifiers};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Map entry written for a reconciled command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub correlation_id: CorrelationId,
    pub action: Action,
    pub instance_id: String,
    pub status: String,
}

/// Issues commands to the actuator and folds their responses into the status map
pub struct CorrelationService {
    pending: Arc<dyn PendingCommandRepository>,
    statuses: Arc<dyn InstanceStatusRepository>,
    channel: Arc<dyn CommandChannel>,
    observability: Arc<ObservabilityController>,
}

impl CorrelationService {
    pub fn new(
        pending: Arc<dyn PendingCommandRepository>,
        statuses: Arc<dyn InstanceStatusRepository>,
        channel: Arc<dyn CommandChannel>,
        observability: Arc<ObservabilityController>,
    ) -> Self {
        Self {
            pending,
            statuses,
            channel,
            observability,
        }
    }

    pub async fn create(&self, image: &str) -> ProxyResult<Reconciliation> {
        let image = non_empty("image", image)?;
        self.submit(Action::Create, TargetSpecifiers::image(image))
            .await
    }

    pub async fn query(&self, instance_id: &str) -> ProxyResult<Reconciliation> {
        self.submit_for_instance(Action::Query, instance_id).await
    }

    pub async fn start(&self, instance_id: &str) -> ProxyResult<Reconciliation> {
        self.submit_for_instance(Action::Start, instance_id).await
    }

    pub async fn stop(&self, instance_id: &str) -> ProxyResult<Reconciliation> {
        self.submit_for_instance(Action::Stop, instance_id).await
    }

    pub async fn delete(&self, instance_id: &str) -> ProxyResult<Reconciliation> {
        self.submit_for_instance(Action::Delete, instance_id).await
    }

    async fn submit_for_instance(
        &self,
        action: Action,
        instance_id: &str,
    ) -> ProxyResult<Reconciliation> {
        let instance_id = non_empty("instance id", instance_id)?;
        self.submit(action, TargetSpecifiers::instance(instance_id))
            .await
    }

    /// Register, transmit and reconcile one command.
    ///
    /// A transport failure leaves the command pending since the actuator may
    /// still have executed it.
    async fn submit(
        &self,
        action: Action,
        target: TargetSpecifiers,
    ) -> ProxyResult<Reconciliation> {
        let command = self.issue(action, target).await?;
        let correlation_id = command.correlation_id.clone();

        let response = match self.channel.send(command.method(), &command).await {
            Ok(response) => response,
            Err(source) => {
                warn!(%correlation_id, %action, error = %source, "Command left pending after channel failure");
                return Err(ProxyError::Channel {
                    correlation_id,
                    source,
                });
            }
        };

        self.process_response(&correlation_id, response).await
    }

    /// Register a new command under a fresh correlation id
    pub async fn issue(&self, action: Action, target: TargetSpecifiers) -> ProxyResult<Command> {
        let command = self.pending.register(action, target).await?;

        info!(correlation_id = %command.correlation_id, %action, "Command issued");
        self.observability.record_issued(action);
        self.refresh_pending_gauge().await;

        Ok(command)
    }

    /// Reconcile the response to a pending command.
    ///
    /// The pending entry is consumed exactly once; a second response for the
    /// same id is an [`ProxyError::UnknownCorrelation`].
    pub async fn process_response(
        &self,
        correlation_id: &CorrelationId,
        response: Response,
    ) -> ProxyResult<Reconciliation> {
        let Some(PendingCommand { command, issued_at }) = self.pending.take(correlation_id).await?
        else {
            warn!(%correlation_id, status = response.status, "Response for unknown correlation id");
            self.observability.record_unknown_correlation();
            return Err(ProxyError::UnknownCorrelation(correlation_id.clone()));
        };
        self.refresh_pending_gauge().await;

        let action = command.action;
        let success = response.is_success();
        let round_trip = (Utc::now() - issued_at)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();
        self.observability
            .record_reconciled(action, success, round_trip);

        let (instance_id, status) = match action {
            Action::Create if !success => {
                let placeholder = self
                    .statuses
                    .insert_placeholder(response.status_text.clone())
                    .await?;
                (placeholder, response.status_text)
            }
            Action::Create => {
                let Some(instance_id) = response.result_instance() else {
                    warn!(%correlation_id, "Successful create response without instance id");
                    return Err(ProxyError::MalformedResponse {
                        correlation_id: correlation_id.clone(),
                        reason: "successful create carries no instance id".to_string(),
                    });
                };
                let instance_id = instance_id.to_string();
                let status = marked(action);
                self.statuses.set(&instance_id, status.clone()).await?;
                (instance_id, status)
            }
            Action::Query => {
                let instance_id = target_instance(&command)?;
                self.statuses
                    .set(&instance_id, response.status_text.clone())
                    .await?;
                (instance_id, response.status_text)
            }
            Action::Start | Action::Stop | Action::Delete => {
                let instance_id = target_instance(&command)?;
                let status = if success {
                    marked(action)
                } else {
                    response.status_text
                };
                self.statuses.set(&instance_id, status.clone()).await?;
                (instance_id, status)
            }
        };

        info!(%correlation_id, %action, %instance_id, %status, "Response reconciled");

        Ok(Reconciliation {
            correlation_id: correlation_id.clone(),
            action,
            instance_id,
            status,
        })
    }

    /// Drop commands pending for longer than `max_age`; the status map is untouched
    pub async fn expire_pending(&self, max_age: Duration) -> ProxyResult<Vec<PendingCommand>> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| ProxyError::InvalidRequest(format!("invalid max age: {e}")))?;
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            debug!(?max_age, "Max age reaches past the earliest timestamp, nothing expires");
            return Ok(Vec::new());
        };
        let expired = self.pending.remove_stale(cutoff).await?;

        for entry in &expired {
            warn!(
                correlation_id = %entry.command.correlation_id,
                action = %entry.command.action,
                issued_at = %entry.issued_at,
                "Pending command expired without a response"
            );
        }
        if !expired.is_empty() {
            self.refresh_pending_gauge().await;
        }

        Ok(expired)
    }

    pub async fn is_pending(&self, correlation_id: &CorrelationId) -> ProxyResult<bool> {
        self.pending.contains(correlation_id).await
    }

    pub async fn pending_commands(&self) -> ProxyResult<Vec<PendingCommand>> {
        self.pending.list().await
    }

    pub async fn instance_status(&self, instance_id: &str) -> ProxyResult<Option<String>> {
        self.statuses.get(instance_id).await
    }

    pub async fn status_snapshot(&self) -> ProxyResult<std::collections::HashMap<String, String>> {
        self.statuses.snapshot().await
    }

    async fn refresh_pending_gauge(&self) {
        match self.pending.len().await {
            Ok(count) => self.observability.set_pending(count),
            Err(error) => debug!(error = %error, "Pending gauge not refreshed"),
        }
    }
}

fn marked(action: Action) -> String {
    format!("marked {action}")
}

fn non_empty<'a>(what: &str, value: &'a str) -> ProxyResult<&'a str> {
    if value.trim().is_empty() {
        return Err(ProxyError::InvalidRequest(format!("{what} cannot be empty")));
    }
    Ok(value)
}

fn target_instance(command: &Command) -> ProxyResult<String> {
    command
        .target
        .require_instance()
        .map(str::to_string)
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::command_channel::repo::{ChannelError, MockCommandChannel};
    use crate::features::correlation::repo::{
        InMemoryInstanceStatusRepository, InMemoryPendingCommandRepository,
    };
    use oc2gate_core::Method;

    struct Fixture {
        service: CorrelationService,
        statuses: Arc<InMemoryInstanceStatusRepository>,
        observability: Arc<ObservabilityController>,
    }

    fn fixture(channel: MockCommandChannel) -> Fixture {
        let statuses = Arc::new(InMemoryInstanceStatusRepository::new());
        let observability = Arc::new(ObservabilityController::with_registry().unwrap());
        let service = CorrelationService::new(
            Arc::new(InMemoryPendingCommandRepository::new()),
            statuses.clone(),
            Arc::new(channel),
            observability.clone(),
        );
        Fixture {
            service,
            statuses,
            observability,
        }
    }

    fn idle() -> Fixture {
        let mut channel = MockCommandChannel::new();
        channel.expect_send().never();
        fixture(channel)
    }

    async fn snapshot(fixture: &Fixture) -> Vec<(String, String)> {
        let mut entries: Vec<_> = fixture.statuses.snapshot().await.unwrap().into_iter().collect();
        entries.sort();
        entries
    }

    fn pair(instance: &str, status: &str) -> (String, String) {
        (instance.to_string(), status.to_string())
    }

    #[tokio::test]
    async fn test_issue_registers_before_anything_is_sent() {
        let fixture = idle();

        let command = fixture
            .service
            .issue(Action::Create, TargetSpecifiers::image("ami-1"))
            .await
            .unwrap();

        assert!(fixture.service.is_pending(&command.correlation_id).await.unwrap());
        assert_eq!(fixture.service.pending_commands().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_success_marks_returned_instance() {
        let fixture = idle();
        let command = fixture
            .service
            .issue(Action::Create, TargetSpecifiers::image("ami-1"))
            .await
            .unwrap();
        let id = command.correlation_id.clone();

        let outcome = fixture
            .service
            .process_response(&id, Response::ok("i-42", id.clone()).with_instance("i-42"))
            .await
            .unwrap();

        assert_eq!(outcome.instance_id, "i-42");
        assert_eq!(outcome.status, "marked create");
        assert_eq!(snapshot(&fixture).await, vec![pair("i-42", "marked create")]);
        assert!(!fixture.service.is_pending(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_failure_records_placeholder() {
        let fixture = idle();
        let command = fixture
            .service
            .issue(Action::Create, TargetSpecifiers::image("bogus"))
            .await
            .unwrap();
        let id = command.correlation_id.clone();

        let outcome = fixture
            .service
            .process_response(
                &id,
                Response::bad_request("InvalidAMIID.Malformed: bogus", id.clone()),
            )
            .await
            .unwrap();

        assert_eq!(outcome.instance_id, "failed-create-1");
        assert_eq!(
            snapshot(&fixture).await,
            vec![pair("failed-create-1", "InvalidAMIID.Malformed: bogus")]
        );
    }

    #[tokio::test]
    async fn test_successful_create_without_instance_is_malformed() {
        let fixture = idle();
        let command = fixture
            .service
            .issue(Action::Create, TargetSpecifiers::image("ami-1"))
            .await
            .unwrap();
        let id = command.correlation_id.clone();

        let err = fixture
            .service
            .process_response(&id, Response::ok("", id.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::MalformedResponse { .. }));
        assert!(snapshot(&fixture).await.is_empty());
        assert!(!fixture.service.is_pending(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_mirrors_status_text() {
        let fixture = idle();
        for (status, text) in [(200, "running"), (404, "instance not found")] {
            let command = fixture
                .service
                .issue(Action::Query, TargetSpecifiers::instance("i-7"))
                .await
                .unwrap();
            let id = command.correlation_id.clone();

            fixture
                .service
                .process_response(&id, Response::new(status, text, id.clone()))
                .await
                .unwrap();

            assert_eq!(
                fixture.service.instance_status("i-7").await.unwrap().as_deref(),
                Some(text)
            );
        }
    }

    #[tokio::test]
    async fn test_start_stop_delete_markers_and_failures() {
        let fixture = idle();

        for action in [Action::Start, Action::Stop, Action::Delete] {
            let command = fixture
                .service
                .issue(action, TargetSpecifiers::instance("i-1"))
                .await
                .unwrap();
            let id = command.correlation_id.clone();
            fixture
                .service
                .process_response(&id, Response::ok("", id.clone()))
                .await
                .unwrap();
            assert_eq!(
                fixture.service.instance_status("i-1").await.unwrap(),
                Some(format!("marked {action}"))
            );

            let command = fixture
                .service
                .issue(action, TargetSpecifiers::instance("i-1"))
                .await
                .unwrap();
            let id = command.correlation_id.clone();
            fixture
                .service
                .process_response(&id, Response::bad_request("IncorrectInstanceState", id.clone()))
                .await
                .unwrap();
            assert_eq!(
                fixture.service.instance_status("i-1").await.unwrap().as_deref(),
                Some("IncorrectInstanceState")
            );
        }

        // Delete marks the entry and never removes it
        assert_eq!(snapshot(&fixture).await.len(), 1);
    }

    #[tokio::test]
    async fn test_second_response_is_unknown_correlation() {
        let fixture = idle();
        let command = fixture
            .service
            .issue(Action::Start, TargetSpecifiers::instance("i-1"))
            .await
            .unwrap();
        let id = command.correlation_id.clone();

        fixture
            .service
            .process_response(&id, Response::ok("", id.clone()))
            .await
            .unwrap();
        let before = snapshot(&fixture).await;

        let err = fixture
            .service
            .process_response(&id, Response::bad_request("late", id.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::UnknownCorrelation(ref other) if *other == id));
        assert_eq!(snapshot(&fixture).await, before);
        let metrics = fixture.observability.render_metrics().unwrap();
        assert!(metrics.contains("oc2gate_unknown_correlation_total 1"));
    }

    #[tokio::test]
    async fn test_never_issued_id_is_unknown_correlation() {
        let fixture = idle();
        let id = CorrelationId::from("never-issued");

        let err = fixture
            .service
            .process_response(&id, Response::ok("i-1", id.clone()).with_instance("i-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::UnknownCorrelation(_)));
        assert!(snapshot(&fixture).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_sends_post_and_reconciles() {
        let mut channel = MockCommandChannel::new();
        channel
            .expect_send()
            .withf(|method, command| {
                *method == Method::Post
                    && command.action == Action::Create
                    && command.target.image.as_deref() == Some("ami-1")
            })
            .times(1)
            .returning(|_, command| {
                Ok(Response::ok("i-42", command.correlation_id.clone()).with_instance("i-42"))
            });
        let fixture = fixture(channel);

        let outcome = fixture.service.create("ami-1").await.unwrap();

        assert_eq!(outcome.instance_id, "i-42");
        assert!(fixture.service.pending_commands().await.unwrap().is_empty());
        assert_eq!(snapshot(&fixture).await, vec![pair("i-42", "marked create")]);
    }

    #[tokio::test]
    async fn test_query_travels_as_get() {
        let mut channel = MockCommandChannel::new();
        channel
            .expect_send()
            .withf(|method, command| *method == Method::Get && command.action == Action::Query)
            .times(1)
            .returning(|_, command| Ok(Response::ok("stopped", command.correlation_id.clone())));
        let fixture = fixture(channel);

        let outcome = fixture.service.query("i-3").await.unwrap();

        assert_eq!(outcome.status, "stopped");
    }

    #[tokio::test]
    async fn test_channel_failure_keeps_command_pending() {
        let mut channel = MockCommandChannel::new();
        channel
            .expect_send()
            .times(1)
            .returning(|_, _| Err(ChannelError::Timeout));
        let fixture = fixture(channel);

        let err = fixture.service.stop("i-1").await.unwrap_err();

        let ProxyError::Channel { correlation_id, .. } = err else {
            panic!("expected channel error, got {err:?}");
        };
        assert!(fixture.service.is_pending(&correlation_id).await.unwrap());
        assert!(snapshot(&fixture).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_before_registration() {
        let fixture = idle();

        assert!(matches!(
            fixture.service.create("").await,
            Err(ProxyError::InvalidRequest(_))
        ));
        assert!(matches!(
            fixture.service.delete("  ").await,
            Err(ProxyError::InvalidRequest(_))
        ));
        assert!(fixture.service.pending_commands().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_empty_input_is_sent_verbatim() {
        let mut channel = MockCommandChannel::new();
        channel
            .expect_send()
            .withf(|_, command| command.target.image.as_deref() == Some(" ami-1 "))
            .times(1)
            .returning(|_, command| {
                Ok(Response::ok("i-7", command.correlation_id.clone()).with_instance("i-7"))
            });
        channel
            .expect_send()
            .withf(|_, command| command.target.instance.as_deref() == Some("i-7 "))
            .times(1)
            .returning(|_, command| Ok(Response::ok("", command.correlation_id.clone())));
        let fixture = fixture(channel);

        fixture.service.create(" ami-1 ").await.unwrap();
        let stopped = fixture.service.stop("i-7 ").await.unwrap();

        assert_eq!(stopped.instance_id, "i-7 ");
    }

    #[tokio::test]
    async fn test_expire_pending_with_unrepresentable_age_expires_nothing() {
        let fixture = idle();
        let command = fixture
            .service
            .issue(Action::Query, TargetSpecifiers::instance("i-1"))
            .await
            .unwrap();

        let expired = fixture
            .service
            .expire_pending(Duration::from_secs(10_000_000_000_000))
            .await
            .unwrap();

        assert!(expired.is_empty());
        assert!(fixture.service.is_pending(&command.correlation_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_pending_leaves_status_map_alone() {
        let fixture = idle();
        fixture.statuses.set("i-1", "running".to_string()).await.unwrap();
        let command = fixture
            .service
            .issue(Action::Stop, TargetSpecifiers::instance("i-1"))
            .await
            .unwrap();
        let id = command.correlation_id.clone();

        let kept = fixture
            .service
            .expire_pending(Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(kept.is_empty());

        let expired = fixture
            .service
            .expire_pending(Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(snapshot(&fixture).await, vec![pair("i-1", "running")]);

        let late = fixture
            .service
            .process_response(&id, Response::ok("", id.clone()))
            .await;
        assert!(matches!(late, Err(ProxyError::UnknownCorrelation(_))));
    }
}
