use crate::api::rest::{ApiError, ApiResult, AppState};
use axum::body::StreamBody;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use log::error;
use serde::Deserialize;
use serde_json::{json, Value};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/proxy-image", post(proxy_image))
        .route("/api/video-proxy", get(proxy_video))
        .route("/api/send-alerts-image", post(send_alerts_image))
}

#[derive(Debug, Deserialize)]
struct ProxyImageRequest {
    url: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct VideoProxyParams {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlertImageRequest {
    image: Option<String>,
}

async fn proxy_image(
    State(state): State<AppState>,
    Json(request): Json<ProxyImageRequest>,
) -> ApiResult<Json<Value>> {
    let url = match request.url {
        Some(Value::String(url)) if !url.is_empty() => url,
        _ => return Err(ApiError::bad_request("Invalid URL")),
    };

    let data_url = state.services.media.proxy_image(&url).await.map_err(|e| {
        error!("Error proxying image {}: {}", url, e);
        ApiError::validation_or_internal(e, "Failed to proxy image")
    })?;

    Ok(Json(json!({ "dataUrl": data_url })))
}

async fn proxy_video(
    State(state): State<AppState>,
    Query(params): Query<VideoProxyParams>,
) -> ApiResult<Response> {
    let url = params
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing video URL"))?;

    let upstream = state.services.media.proxy_video(&url).await.map_err(|e| {
        error!("Video proxy error for {}: {}", url, e);
        ApiError::validation_or_internal(e, "Failed to proxy video")
    })?;

    let mut response = StreamBody::new(upstream.bytes_stream()).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("inline"));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    Ok(response)
}

async fn send_alerts_image(
    State(state): State<AppState>,
    Json(request): Json<AlertImageRequest>,
) -> Response {
    let image = match request.image.filter(|image| !image.is_empty()) {
        Some(image) => image,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": "No image data provided" })),
            )
                .into_response()
        }
    };

    match state.services.notification.send_alert_image(&image).await {
        Ok(result) => Json(json!({ "success": true, "result": result })).into_response(),
        Err(e) => {
            error!("Error sending alert image: {}", e);
            let message = match e.downcast_ref::<crate::error::Error>() {
                Some(crate::error::Error::UpstreamStatus(status, _)) => {
                    format!("Service responded with {}", status)
                }
                _ => "Failed to send alert image".to_string(),
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": message })),
            )
                .into_response()
        }
    }
}
