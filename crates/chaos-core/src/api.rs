//! HTTP surface: run requests, run state and task lookup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::destroyer::{Destroyer, EventRequest};
use crate::error::ChaosError;
use crate::state::{RunState, StateProvider};
use crate::task::{TaskId, TaskUriBuilder};

/// Errors returned to HTTP callers. Bodies never carry internal details.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ChaosError> for ApiError {
    fn from(e: ChaosError) -> Self {
        match e {
            ChaosError::InvalidEvent(msg) | ChaosError::InvalidState(msg) => {
                Self::InvalidPayload(msg)
            }
            ChaosError::TaskNotFound(id) => Self::NotFound(id),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidPayload(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("Request rejected: {}", self);
        let body = match &self {
            Self::InvalidPayload(_) => "Bad Request",
            Self::NotFound(_) => "Not Found",
            Self::Internal(_) => "Internal Server Error",
        };
        (self.status_code(), body).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub destroyer: Arc<Destroyer>,
    pub run_state: Arc<dyn StateProvider>,
    pub uri_builder: TaskUriBuilder,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateResponse {
    pub status: RunState,
}

pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/chaos", post(event_request))
        .route("/state", get(get_state).post(set_state))
        .route("/task", get(list_tasks))
        .route("/task/:id", get(get_task))
        .with_state(app)
}

/// `POST /chaos`: accept a `destroy` event and run it in the background.
pub async fn event_request(
    State(app): State<AppState>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let task = app.destroyer.request_run(&request)?;
    let location = app.uri_builder.uri(&task);
    info!(task_id = %task.id(), "Accepted manual run");

    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, location)],
        Json(task.to_json()),
    )
        .into_response())
}

pub async fn get_state(State(app): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse {
        status: app.run_state.get(),
    })
}

pub async fn set_state(
    State(app): State<AppState>,
    payload: Result<Json<StateRequest>, JsonRejection>,
) -> Result<Json<StateResponse>, ApiError> {
    let Json(request) = payload?;
    let status: RunState = request
        .status
        .as_deref()
        .ok_or_else(|| ApiError::InvalidPayload("missing 'status'".into()))?
        .parse()?;

    app.run_state.set(status);
    info!(status = %status, "Run state changed");
    Ok(Json(StateResponse { status }))
}

pub async fn list_tasks(State(app): State<AppState>) -> Json<Vec<serde_json::Value>> {
    Json(
        app.destroyer
            .tasks()
            .list()
            .iter()
            .map(|t| t.to_json())
            .collect(),
    )
}

pub async fn get_task(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let task = app.destroyer.tasks().get(&TaskId::from_string(id))?;
    Ok(Json(task.to_json()))
}

/// Bind and serve the router until the server fails.
pub async fn serve(addr: SocketAddr, app: AppState) -> Result<(), ChaosError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, router(app)).await?;
    Ok(())
}
