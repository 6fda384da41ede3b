//! Task handlers: start, status, stop.

use super::{StartTaskRequest, StartTaskResponse};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{TaskId, TaskSnapshot};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

/// Unknown and malformed ids are both reported as absent
fn parse_task_id(raw: &str) -> Result<TaskId> {
    raw.parse::<TaskId>()
        .map_err(|_| Error::NotFound(format!("task {raw}")))
}

/// POST /start - Create an enrichment task
#[utoipa::path(
    post,
    path = "/api/user-details/start",
    tag = "tasks",
    request_body = StartTaskRequest,
    responses(
        (status = 201, description = "Task created and running", body = StartTaskResponse),
        (status = 400, description = "Missing or invalid query, filter mode or target count", body = crate::error::ApiError),
        (status = 429, description = "Active task ceiling reached", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_task(
    State(state): State<AppState>,
    body: std::result::Result<Json<StartTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = body?;
    let (query, filter_mode, target_count) = request.parse()?;

    let task_id = state
        .harvester
        .create_task(&query, filter_mode, target_count)
        .await?;

    let response = StartTaskResponse {
        task_id,
        status: "started".to_string(),
        query,
        filter_mode,
        target_count,
        progress: 0,
        current_count: 0,
        total_found: 0,
        results: Vec::new(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /status/:task_id - Current task snapshot
#[utoipa::path(
    get,
    path = "/api/user-details/status/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID returned by /start")
    ),
    responses(
        (status = 200, description = "Task snapshot", body = TaskSnapshot),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskSnapshot>> {
    let id = parse_task_id(&task_id)?;

    state
        .harvester
        .get_task(id)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("task {id}")))
}

/// DELETE /stop/:task_id - Stop a running task, keeping its results
#[utoipa::path(
    delete,
    path = "/api/user-details/stop/{task_id}",
    tag = "tasks",
    params(
        ("task_id" = String, Path, description = "Task ID returned by /start")
    ),
    responses(
        (status = 200, description = "Task stopped; snapshot with the results collected so far", body = TaskSnapshot),
        (status = 404, description = "Task not found or no longer running", body = crate::error::ApiError)
    )
)]
pub async fn stop_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskSnapshot>> {
    let id = parse_task_id(&task_id)?;

    if !state.harvester.stop_task(id).await {
        return Err(Error::NotFound(format!("running task {id}")));
    }

    state
        .harvester
        .get_task(id)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("task {id}")))
}
