use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use http::{header, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::recorder::store::Recording;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/api/recordings/start", post(start))
        .route("/api/recordings/schedule", post(schedule))
        .route("/api/recordings/schedule/:schedule_id", delete(cancel_schedule))
        .route(
            "/api/recordings/:session_id/stop",
            post(stop),
        )
        .route(
            "/api/recordings/:session_id/status",
            get(status),
        )
        .route(
            "/api/recordings/:session_id/move",
            post(move_to_archive),
        )
        .route(
            "/api/recordings/:session_id/download",
            get(download),
        )
        .route("/api/recordings/:session_id", delete(remove))
        .route(
            "/api/cameras/:camera_id/recordings",
            get(camera_recordings),
        )
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub camera_ids: Vec<String>,
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub camera_ids: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub duration: String,
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub schedule_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub user_id: i64,
}

fn default_limit() -> usize {
    5
}

async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> crate::result::Result<Json<StartResponse>> {
    let session_id = state.recorder.start(&req.camera_ids, req.user_id).await?;
    Ok(Json(StartResponse { session_id }))
}

async fn stop(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> crate::result::Result<StatusCode> {
    state.recorder.stop(&session_id).await?;
    Ok(StatusCode::OK)
}

async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> crate::result::Result<Json<serde_json::Value>> {
    let recording = state.recorder.is_recording(&session_id).await;
    Ok(Json(json!({ "recording": recording })))
}

async fn schedule(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> crate::result::Result<Json<ScheduleResponse>> {
    let schedule_id = state
        .recorder
        .schedule(req.camera_ids, req.start_time, &req.duration, req.user_id)
        .await?;
    Ok(Json(ScheduleResponse { schedule_id }))
}

async fn cancel_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<String>,
) -> crate::result::Result<StatusCode> {
    state.recorder.cancel_schedule(&schedule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_to_archive(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> crate::result::Result<StatusCode> {
    state.recorder.move_to_archive(&session_id).await?;
    Ok(StatusCode::OK)
}

async fn remove(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> crate::result::Result<StatusCode> {
    state.recorder.delete(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> crate::result::Result<Response> {
    let path = state.recorder.file_path(&session_id).await?;

    let file_name = std::path::Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("recording.mkv")
        .to_string();
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let body = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

async fn camera_recordings(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
    Query(query): Query<RecordingsQuery>,
) -> crate::result::Result<Json<Vec<Recording>>> {
    let recordings = state
        .recorder
        .camera_recordings(&camera_id, query.limit, query.offset, query.user_id)
        .await?;
    Ok(Json(recordings))
}
