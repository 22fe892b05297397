use crate::features::command_dispatch::controller::DispatchController;
use crate::shared::error::ActuatorError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::get;
use axum::Router;
use oc2gate_core::{Method, Response, STATUS_NOT_FOUND};
use oc2gate_proto::{encode_response, OPENC2_RESPONSE_CONTENT_TYPE, REQUEST_ID_HEADER};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const OPENC2_PATH: &str = "/openc2";

/// Router exposing the OpenC2 endpoint
pub fn router(controller: Arc<DispatchController>) -> Router {
    Router::new()
        .route(OPENC2_PATH, get(handle_get).post(handle_post))
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}

/// Serve the actuator on an already bound listener
pub async fn serve(listener: TcpListener, controller: Arc<DispatchController>) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "Actuator API started");
    axum::serve(listener, router(controller)).await
}

async fn handle_get(
    State(controller): State<Arc<DispatchController>>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    handle(controller, Method::Get, headers, body).await
}

async fn handle_post(
    State(controller): State<Arc<DispatchController>>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    handle(controller, Method::Post, headers, body).await
}

async fn handle(
    controller: Arc<DispatchController>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok());

    match controller.handle_request(method, request_id, &body).await {
        Ok(response) => openc2_reply(&response),
        Err(error) => rejection(error),
    }
}

/// HTTP status for an OpenC2 response.
///
/// Dispatch outcomes (success and query-not-found) travel as HTTP 200 with the
/// OpenC2 status in the body; failures use the OpenC2 status directly.
pub fn transport_status(response: &Response) -> StatusCode {
    if response.is_success() || response.status == STATUS_NOT_FOUND {
        StatusCode::OK
    } else {
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_REQUEST)
    }
}

fn openc2_reply(response: &Response) -> HttpResponse {
    let body = match encode_response(response) {
        Ok(body) => body,
        Err(error) => {
            error!(correlation_id = %response.correlation_id, error = %error, "Failed to encode response");
            return (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(OPENC2_RESPONSE_CONTENT_TYPE),
    );
    // The id arrived as a header value, so it is always representable
    if let Ok(value) = HeaderValue::from_str(response.correlation_id.as_str()) {
        headers.insert(HeaderName::from_static("x-request-id"), value);
    }

    (transport_status(response), headers, body).into_response()
}

fn rejection(error: ActuatorError) -> HttpResponse {
    (
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::BAD_REQUEST),
        [(CONTENT_TYPE, "text/plain; charset=us-ascii")],
        error.to_string(),
    )
        .into_response()
}
