use crate::features::correlation::controller::CorrelationController;
use crate::features::correlation::service::Reconciliation;
use crate::features::observability::controller::ObservabilityController;
use crate::shared::error::ProxyError;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use oc2gate_core::{CorrelationId, ErrorResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<CorrelationController>,
    pub observability: Arc<ObservabilityController>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    pub image: String,
}

/// Outcome of one operation as reported to HTTP callers
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationReply {
    pub correlation_id: CorrelationId,
    pub instance_id: String,
    pub status: String,
}

impl From<Reconciliation> for OperationReply {
    fn from(outcome: Reconciliation) -> Self {
        Self {
            correlation_id: outcome.correlation_id,
            instance_id: outcome.instance_id,
            status: outcome.status,
        }
    }
}

pub struct ApiError(ProxyError);

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        warn!(error = %self.0, %status, "Request failed");
        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/instances", post(create_instance))
        .route("/instances/:id", get(query_instance).delete(delete_instance))
        .route("/instances/:id/start", post(start_instance))
        .route("/instances/:id/stop", post(stop_instance))
        .route("/status", get(status))
        .route("/pending", get(pending))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "Proxy API started");
    axum::serve(listener, router(state)).await
}

async fn create_instance(
    State(state): State<AppState>,
    Json(request): Json<CreateInstanceRequest>,
) -> ApiResult<Json<OperationReply>> {
    Ok(Json(state.controller.create(&request.image).await?.into()))
}

async fn query_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OperationReply>> {
    Ok(Json(state.controller.query(&id).await?.into()))
}

async fn start_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OperationReply>> {
    Ok(Json(state.controller.start(&id).await?.into()))
}

async fn stop_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OperationReply>> {
    Ok(Json(state.controller.stop(&id).await?.into()))
}

async fn delete_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OperationReply>> {
    Ok(Json(state.controller.delete(&id).await?.into()))
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<HashMap<String, String>>> {
    Ok(Json(state.controller.status_snapshot().await?))
}

async fn pending(State(state): State<AppState>) -> ApiResult<Json<Vec<CorrelationId>>> {
    Ok(Json(state.controller.pending_ids().await?))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.observability.render_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(error) => (StatusCode::INTERNAL_SERVER_ERROR, error).into_response(),
    }
}
