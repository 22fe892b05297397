use async_trait::async_trait;
use oc2gate_actuator::{build_controller, CloudCapability, CloudError, DispatchController, InMemoryCloud};
use oc2gate_core::{Command, CorrelationId, Method, Response};
use oc2gate_proto::{decode_response, encode_command, encode_response, REQUEST_ID_HEADER};
use oc2gate_proxy::{
    ChannelError, CommandChannel, CorrelationController, CorrelationService, HttpCommandChannel,
    InMemoryInstanceStatusRepository, InMemoryPendingCommandRepository, ObservabilityController,
    ProxyError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Provider that launches every image as `i-42` and counts calls
#[derive(Default)]
struct FixedCloud {
    calls: AtomicUsize,
}

#[async_trait]
impl CloudCapability for FixedCloud {
    async fn create_instance(&self, _image: &str) -> Result<String, CloudError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("i-42".to_string())
    }

    async fn start_instance(&self, _instance_id: &str) -> Result<(), CloudError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_instance(&self, _instance_id: &str) -> Result<bool, CloudError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn terminate_instance(&self, _instance_id: &str) -> Result<(), CloudError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn describe_instance(&self, _instance_id: &str) -> Result<Option<String>, CloudError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some("running".to_string()))
    }
}

/// Channel that hands the encoded command straight to an actuator controller
struct InProcessChannel {
    actuator: Arc<DispatchController>,
}

#[async_trait]
impl CommandChannel for InProcessChannel {
    async fn send(&self, method: Method, command: &Command) -> Result<Response, ChannelError> {
        let body = encode_command(command)?;
        let response = self
            .actuator
            .handle_request(method, Some(command.correlation_id.as_str()), &body)
            .await
            .map_err(|e| ChannelError::Rejected {
                status: e.status_code(),
                body: e.to_string(),
            })?;

        let payload = encode_response(&response)?;
        Ok(decode_response(&payload, response.correlation_id)?)
    }
}

fn proxy_over(channel: Arc<dyn CommandChannel>) -> CorrelationController {
    let service = CorrelationService::new(
        Arc::new(InMemoryPendingCommandRepository::new()),
        Arc::new(InMemoryInstanceStatusRepository::new()),
        channel,
        Arc::new(ObservabilityController::with_registry().unwrap()),
    );
    CorrelationController::new(Arc::new(service))
}

async fn spawn_actuator(cloud: Arc<dyn CloudCapability>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(oc2gate_actuator::server::serve(listener, build_controller(cloud)));
    format!("http://{addr}/openc2")
}

fn http_channel(url: &str) -> Arc<HttpCommandChannel> {
    Arc::new(HttpCommandChannel::new(url, Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn create_in_process_marks_returned_instance() {
    let cloud = Arc::new(FixedCloud::default());
    let proxy = proxy_over(Arc::new(InProcessChannel {
        actuator: build_controller(cloud.clone()),
    }));

    let outcome = proxy.create("ami-1").await.unwrap();

    assert_eq!(outcome.instance_id, "i-42");
    assert_eq!(cloud.calls.load(Ordering::SeqCst), 1);
    let expected = HashMap::from([("i-42".to_string(), "marked create".to_string())]);
    assert_eq!(proxy.status_snapshot().await.unwrap(), expected);
    assert!(proxy.pending_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_over_http_marks_returned_instance() {
    let url = spawn_actuator(Arc::new(FixedCloud::default())).await;
    let proxy = proxy_over(http_channel(&url));

    let outcome = proxy.create("ami-1").await.unwrap();

    assert_eq!(outcome.instance_id, "i-42");
    assert_eq!(outcome.status, "marked create");
    let expected = HashMap::from([("i-42".to_string(), "marked create".to_string())]);
    assert_eq!(proxy.status_snapshot().await.unwrap(), expected);
}

#[tokio::test]
async fn lifecycle_over_http_against_in_memory_cloud() {
    let url = spawn_actuator(Arc::new(InMemoryCloud::default())).await;
    let proxy = proxy_over(http_channel(&url));

    let created = proxy.create("ami-0abc").await.unwrap();
    let id = created.instance_id.clone();
    assert!(id.starts_with("i-"));

    assert_eq!(proxy.query(&id).await.unwrap().status, "running");
    assert_eq!(proxy.stop(&id).await.unwrap().status, "marked stop");
    assert_eq!(proxy.query(&id).await.unwrap().status, "stopped");
    assert_eq!(proxy.start(&id).await.unwrap().status, "marked start");
    assert_eq!(proxy.delete(&id).await.unwrap().status, "marked delete");
    assert_eq!(proxy.query(&id).await.unwrap().status, "terminated");

    // Terminated instances cannot be restarted; the provider text lands in the map
    let restart = proxy.start(&id).await.unwrap();
    assert!(restart.status.starts_with("IncorrectInstanceState"));

    let snapshot = proxy.status_snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(proxy.pending_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_create_and_unknown_query_over_http() {
    let url = spawn_actuator(Arc::new(InMemoryCloud::default())).await;
    let proxy = proxy_over(http_channel(&url));

    let failed = proxy.create("bogus").await.unwrap();
    assert_eq!(failed.instance_id, "failed-create-1");
    assert!(failed.status.starts_with("InvalidAMIID.Malformed"));

    let missing = proxy.query("i-0123456789abcdef0").await.unwrap();
    assert_eq!(missing.status, "instance not found");

    let malformed = proxy.stop("sdkj").await.unwrap();
    assert_eq!(malformed.status, "InvalidInstanceID.Malformed: Invalid id: \"sdkj\"");
}

#[tokio::test]
async fn unreachable_actuator_leaves_command_pending() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/openc2", listener.local_addr().unwrap());
    drop(listener);
    let proxy = proxy_over(http_channel(&url));

    let err = proxy.create("ami-1").await.unwrap_err();

    let ProxyError::Channel { correlation_id, .. } = err else {
        panic!("expected channel error, got {err:?}");
    };
    assert_eq!(proxy.pending_ids().await.unwrap(), vec![correlation_id]);
    assert!(proxy.status_snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn actuator_rejects_request_without_request_id() {
    let cloud = Arc::new(FixedCloud::default());
    let url = spawn_actuator(cloud.clone()).await;
    let body = encode_command(&Command::new(
        oc2gate_core::Action::Create,
        oc2gate_core::TargetSpecifiers::image("ami-1"),
        CorrelationId::from("unused"),
    ))
    .unwrap();

    let reply = reqwest::Client::new()
        .post(&url)
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(reply.status().as_u16(), 400);
    assert!(reply.headers().get(REQUEST_ID_HEADER).is_none());
    assert_eq!(
        reply.headers()["content-type"],
        "text/plain; charset=us-ascii"
    );
    assert_eq!(reply.text().await.unwrap(), "missing X-Request-ID header");
    assert_eq!(cloud.calls.load(Ordering::SeqCst), 0);
}
