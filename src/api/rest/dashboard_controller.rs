use crate::analytics::{self, social::LATEST_TWEET_LIMIT, AttendanceWindows, SocialSummary};
use crate::api::rest::auth_controller::AuthSession;
use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::db::models::{AnalyticsSnapshot, Anomaly, SearchAlertRow};
use crate::utils::time_format;
use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 1000;
const RECENT_ALERT_LIMIT: usize = 5;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/attendance", get(attendance))
        .route("/api/cam-attendance", get(cam_attendance))
        .route("/api/social", get(social))
        .route("/api/dashboard", get(dashboard))
        .route("/api/analytics", get(recent_analytics))
        .route("/api/anomalies", get(recent_anomalies))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub camera_id: Option<i32>,
    pub limit: Option<i64>,
}

impl ListParams {
    fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .min(MAX_LIST_LIMIT)
    }
}

/// Latest search hit as listed on the dashboard
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentAlert {
    pub id: String,
    pub query: Option<String>,
    pub camera_id: Option<String>,
    pub time: String,
    pub time_ago: String,
}

impl RecentAlert {
    fn from_row(row: &SearchAlertRow, now: chrono::DateTime<Utc>) -> Self {
        let end = row
            .end_timestamp
            .map(|ts| ts.format("%Y-%m-%dT%H:%M:%S").to_string());

        Self {
            id: row.id.clone(),
            query: row.query.clone(),
            camera_id: row.camera_id.clone(),
            time: end
                .as_deref()
                .map(time_format::utc_to_ist_time)
                .unwrap_or_else(|| time_format::INVALID_TIME.to_string()),
            time_ago: time_format::time_ago(end.as_deref(), now),
        }
    }
}

/// Dashboard landing summary
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub att_data: AttendanceWindows,
    pub active_cam_count: i64,
    pub alert_notifs_count: i64,
    pub recent_alerts: Vec<RecentAlert>,
    pub last_updated: String,
}

async fn load_attendance(state: &AppState) -> ApiResult<AttendanceWindows> {
    let series = state
        .repos
        .gate_monitoring
        .attendance_series()
        .await
        .map_err(|e| {
            error!("Error querying attendance data: {}", e);
            ApiError::from(e)
        })?;

    Ok(analytics::split_windows(series, Utc::now().naive_utc()))
}

async fn attendance(State(state): State<AppState>) -> ApiResult<Json<AttendanceWindows>> {
    Ok(Json(load_attendance(&state).await?))
}

async fn cam_attendance(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let camera_data = state
        .repos
        .gate_monitoring
        .latest_camera_breakdown()
        .await
        .map_err(|e| {
            error!("Error in camera data endpoint: {}", e);
            ApiError::internal("Failed to fetch camera data")
        })?;

    Ok(Json(json!({
        "cameraData": camera_data,
        "timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })))
}

async fn social(State(state): State<AppState>) -> ApiResult<Json<SocialSummary>> {
    let snapshot = state
        .repos
        .tweets
        .social_snapshot(LATEST_TWEET_LIMIT)
        .await
        .map_err(|e| {
            error!("Error fetching social data: {}", e);
            ApiError::internal("Failed to fetch social data")
        })?;

    Ok(Json(analytics::build_summary(snapshot)))
}

async fn dashboard(State(state): State<AppState>, _auth: AuthSession) -> ApiResult<Json<DashboardSummary>> {
    let att_data = load_attendance(&state).await?;

    let (active_cam_count, alert_notifs_count, search_rows) = tokio::try_join!(
        state.repos.cameras.count_connected(),
        state.repos.alerts.distinct_notified_alert_count(),
        state.repos.alerts.search_alert_rows(),
    )
    .map_err(|e| {
        error!("Error loading dashboard summary: {}", e);
        ApiError::from(e)
    })?;

    let now = Utc::now();
    let recent_alerts = search_rows
        .iter()
        .take(RECENT_ALERT_LIMIT)
        .map(|row| RecentAlert::from_row(row, now))
        .collect();

    Ok(Json(DashboardSummary {
        att_data,
        active_cam_count,
        alert_notifs_count,
        recent_alerts,
        last_updated: time_format::add_ist_offset(&now.to_rfc3339()),
    }))
}

async fn recent_analytics(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<AnalyticsSnapshot>>> {
    let snapshots = state
        .repos
        .analytics
        .recent(params.camera_id, params.limit())
        .await
        .map_err(|e| {
            error!("Error fetching analytics: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(snapshots))
}

async fn recent_anomalies(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Anomaly>>> {
    let anomalies = state
        .repos
        .anomalies
        .recent(params.limit())
        .await
        .map_err(|e| {
            error!("Error fetching anomalies: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(anomalies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    #[test]
    fn test_list_limit_is_clamped() {
        let params = |limit| ListParams {
            camera_id: None,
            limit,
        };
        assert_eq!(params(None).limit(), 100);
        assert_eq!(params(Some(0)).limit(), 100);
        assert_eq!(params(Some(25)).limit(), 25);
        assert_eq!(params(Some(50_000)).limit(), 1000);
    }

    #[test]
    fn test_recent_alert_from_row() {
        let end = NaiveDate::from_ymd_opt(2025, 4, 12)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        let row = SearchAlertRow {
            id: "n-1".to_string(),
            query: Some("dog".to_string()),
            res_id: Some("r-1".to_string()),
            camera_id: Some("gate-2".to_string()),
            img_url: None,
            thumb_path: None,
            start_timestamp: None,
            end_timestamp: Some(end),
            thumbnail: None,
            is_notified: false,
        };
        // stored values are IST wall clock, so "now" is 5.5 h behind plus ten minutes
        let now = Utc.from_utc_datetime(&end) - Duration::minutes(330) + Duration::minutes(10);

        let alert = RecentAlert::from_row(&row, now);
        assert_eq!(alert.time, "6:30 PM");
        assert_eq!(alert.time_ago, "10 minutes ago");
        assert_eq!(alert.camera_id.as_deref(), Some("gate-2"));
    }

    #[test]
    fn test_recent_alert_without_timestamp() {
        let row = SearchAlertRow {
            id: "n-2".to_string(),
            query: None,
            res_id: None,
            camera_id: None,
            img_url: None,
            thumb_path: None,
            start_timestamp: None,
            end_timestamp: None,
            thumbnail: None,
            is_notified: true,
        };

        let alert = RecentAlert::from_row(&row, Utc::now());
        assert_eq!(alert.time, time_format::INVALID_TIME);
        assert_eq!(alert.time_ago, time_format::NO_DATE);
    }
}
