use crate::api::rest::auth_controller::AuthSession;
use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::db::models::NewCamera;
use crate::services::CameraAction;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use log::{error, info};
use serde_json::{json, Value};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/cameras", get(get_cameras).post(create_camera))
        .route("/api/cameras/:camera_id/status", get(camera_status))
        .route("/api/cameras/:camera_id/:action", post(camera_action))
        .route("/api/active-cams", get(active_cams))
}

async fn get_cameras(State(state): State<AppState>, _auth: AuthSession) -> ApiResult<Json<Value>> {
    let cameras = state.repos.cameras.get_all().await.map_err(|e| {
        error!("Error fetching cameras: {}", e);
        ApiError::internal("Failed to fetch cameras")
    })?;

    Ok(Json(json!({ "data": cameras })))
}

async fn create_camera(
    State(state): State<AppState>,
    _auth: AuthSession,
    Json(request): Json<NewCamera>,
) -> ApiResult<Json<Value>> {
    let (name, url) = request
        .resolve()
        .ok_or_else(|| ApiError::bad_request("Camera URL is required"))?;

    let camera = state.repos.cameras.create(&name, &url).await.map_err(|e| {
        error!("Error adding camera: {}", e);
        ApiError::internal("Failed to add camera")
    })?;

    info!("Added camera {} ({})", camera.id, camera.name);

    Ok(Json(json!({ "camera": camera })))
}

/// Upstream failures are reported in the body with a 200 status
async fn camera_status(
    State(state): State<AppState>,
    _auth: AuthSession,
    Path(camera_id): Path<String>,
) -> Json<Value> {
    match state.services.camera_control.camera_status(&camera_id).await {
        Ok(status) => Json(status),
        Err(e) => {
            error!("Error fetching camera status for {}: {}", camera_id, e);
            Json(json!({ "error": "Failed to fetch camera status" }))
        }
    }
}

async fn camera_action(
    State(state): State<AppState>,
    _auth: AuthSession,
    Path((camera_id, action)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let action: CameraAction = action.parse().map_err(ApiError::from)?;

    let result = state
        .services
        .camera_control
        .camera_action(&camera_id, action)
        .await
        .map_err(|e| {
            error!("Error performing camera action {} on {}: {}", action, camera_id, e);
            ApiError::internal("Failed to perform camera action")
        })?;

    Ok(Json(result))
}

async fn active_cams(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let count = state.repos.cameras.count_connected().await.map_err(|e| {
        error!("Error counting connected cameras: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(json!({ "activeCamCount": count })))
}
