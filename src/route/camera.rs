use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new().route("/api/cameras", get(cameras))
}

#[derive(Debug, Serialize)]
pub struct CameraInfo {
    pub id: String,
    pub url: String,
    pub location: String,
}

async fn cameras(State(state): State<AppState>) -> Json<Vec<CameraInfo>> {
    let cameras = state
        .recorder
        .directory()
        .cameras()
        .await
        .into_iter()
        .map(|c| CameraInfo {
            id: c.id,
            url: c.url,
            location: c.location,
        })
        .collect();
    Json(cameras)
}
