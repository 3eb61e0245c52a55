use crate::alerts::{self, AlertCategory, AlertGroup, ALERT_CATALOG};
use crate::api::rest::{ApiError, ApiResult, AppState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/alerts", get(list_alerts).post(create_alert))
        .route("/api/alerts/:id", post(stop_alert).delete(delete_alert))
        .route("/api/alert-notifications", get(alert_notifications))
        .route("/api/alerts-data", get(alerts_data))
        .route("/api/update-alert-ids", post(update_alert_ids))
        .route("/api/all-alerts-count", get(all_alerts_count))
        .route("/api/alert-catalog", get(alert_catalog))
}

#[derive(Debug, Deserialize)]
struct AlertActionRequest {
    action: Option<String>,
}

async fn list_alerts(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let alerts = state.services.camera_control.list_alerts().await.map_err(|e| {
        error!("Error fetching alerts: {}", e);
        ApiError::internal("Failed to fetch alerts")
    })?;

    Ok(Json(alerts))
}

async fn create_alert(
    State(state): State<AppState>,
    Json(alert): Json<Value>,
) -> ApiResult<Json<Value>> {
    let created = state
        .services
        .camera_control
        .create_alert(alert)
        .await
        .map_err(|e| {
            error!("Error creating alert: {}", e);
            ApiError::validation_or_internal(e, "Failed to create alert")
        })?;

    Ok(Json(created))
}

async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .services
        .camera_control
        .delete_alert(&id)
        .await
        .map_err(|e| {
            error!("Error deleting alert {}: {}", id, e);
            ApiError::internal("Failed to delete alert")
        })?;

    Ok(Json(json!({ "success": true })))
}

async fn stop_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AlertActionRequest>,
) -> ApiResult<Json<Value>> {
    if request.action.as_deref() != Some("stop") {
        return Err(ApiError::bad_request("Invalid action"));
    }

    state
        .services
        .camera_control
        .stop_alert(&id)
        .await
        .map_err(|e| {
            error!("Error stopping alert {}: {}", id, e);
            ApiError::internal("Failed to stop alert")
        })?;

    Ok(Json(json!({ "success": true })))
}

/// Failures answer 500 with an empty list
async fn alert_notifications(State(state): State<AppState>) -> Response {
    match state.services.camera_control.alert_notifications().await {
        Ok(notifications) => Json(notifications).into_response(),
        Err(e) => {
            error!("Failed to fetch alert notifications: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!([]))).into_response()
        }
    }
}

async fn alerts_data(State(state): State<AppState>) -> ApiResult<Json<Vec<AlertGroup>>> {
    let services = &state.config.services;
    let repo = &state.repos.alerts;

    let (search_rows, loitering_rows, police_rows) = tokio::try_join!(
        repo.search_alert_rows(),
        repo.loitering_rows(&services.loitering_endpoint),
        repo.police_rows(&services.police_monitoring_endpoint),
    )
    .map_err(|e| {
        error!("Error loading alert rows: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(alerts::aggregate(&search_rows, loitering_rows, police_rows)))
}

async fn update_alert_ids(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let ids = body.get("unNotifiedAlertIds").cloned().unwrap_or(Value::Null);
    if !ids.is_object() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Invalid unNotifiedAlertIds format" })),
        )
            .into_response();
    }

    match alerts::mark_notified(&state.repos.alerts, &ids).await {
        Ok(updated_table_names) => {
            info!("Marked alerts notified in {:?}", updated_table_names);
            Json(json!({
                "success": true,
                "message": format!("Updated {} alert records", updated_table_names.len()),
                "updatedTableNames": updated_table_names,
            }))
            .into_response()
        }
        Err(e) => {
            error!("Error updating alert notification status: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "message": "Failed to update alert notification status",
                })),
            )
                .into_response()
        }
    }
}

async fn all_alerts_count(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let count = state
        .repos
        .alerts
        .distinct_notified_alert_count()
        .await
        .map_err(|e| {
            error!("Error counting alert notifications: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(json!({ "alertNotifsCount": count })))
}

async fn alert_catalog() -> Json<&'static [AlertCategory]> {
    Json(ALERT_CATALOG)
}
