use crate::api::rest::auth_controller::AuthSession;
use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::error::Error;
use crate::services::event_search::{DEFAULT_SEMANTIC_LIMIT, UNSUPPORTED_FILTERS};
use crate::services::{
    FaceSearchOptions, FrigateEvent, ImageUpload, SearchPriority, SemanticSearchParams,
    TextSearchRequest,
};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use log::{debug, error, info};
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;

const DEFAULT_FACE_LIMIT: u32 = 10;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/search", post(text_search))
        .route("/api/searchDirect", post(semantic_search))
        .route("/api/face/clusters", get(face_clusters))
        .route("/api/face/clusters/:id/faces", get(cluster_faces))
        .route("/api/face/search", post(face_search))
}

/// A multipart field read fully into memory
enum FormValue {
    Text(String),
    File(ImageUpload),
}

/// Collect all fields of a multipart body as `(name, value)` pairs in order
async fn read_form(mut multipart: Multipart) -> ApiResult<Vec<(String, FormValue)>> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        error!("Failed to parse multipart body: {}", e);
        ApiError::bad_request("Invalid request format. Expected multipart/form-data.")
    };

    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();

        let value = match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(invalid)?;
                FormValue::File(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                })
            }
            None => FormValue::Text(field.text().await.map_err(invalid)?),
        };

        fields.push((name, value));
    }

    Ok(fields)
}

fn parse_number<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

/// Build semantic search parameters from form fields; unknown fields are
/// ignored and a repeated field keeps its first value
fn semantic_params(fields: Vec<(String, FormValue)>) -> SemanticSearchParams {
    let mut params = SemanticSearchParams::default();
    let mut seen = HashSet::new();

    for (name, value) in fields {
        if !seen.insert(name.clone()) {
            continue;
        }

        let text = match value {
            FormValue::File(upload) => {
                if name == "image" {
                    params.image = Some(upload);
                }
                continue;
            }
            FormValue::Text(text) => text,
        };

        match name.as_str() {
            "query" => params.query = Some(text).filter(|q| !q.is_empty()),
            "limit" => params.limit = parse_number(&text).unwrap_or(DEFAULT_SEMANTIC_LIMIT),
            "cameras" if !text.is_empty() => params.cameras = text,
            "labels" if !text.is_empty() => params.labels = text,
            "after" => params.after = parse_number(&text),
            "before" => params.before = parse_number(&text),
            "min_confidence" => params.min_confidence = parse_number(&text).unwrap_or(0.0),
            "max_distance" => params.max_distance = parse_number(&text),
            "sort" if !text.is_empty() => params.sort = text,
            other if UNSUPPORTED_FILTERS.contains(&other) => {
                params.unsupported.push(other.to_string())
            }
            _ => {}
        }
    }

    params
}

/// Build face search arguments from form fields
fn face_search_args(
    fields: Vec<(String, FormValue)>,
) -> ApiResult<(ImageUpload, SearchPriority, u32, FaceSearchOptions)> {
    let mut image = None;
    let mut priority = SearchPriority::default();
    let mut limit = DEFAULT_FACE_LIMIT;
    let mut options = FaceSearchOptions::default();

    for (name, value) in fields {
        let text = match value {
            FormValue::File(upload) => {
                if name == "file" || name == "image" {
                    image = Some(upload);
                }
                continue;
            }
            FormValue::Text(text) => text,
        };

        match name.as_str() {
            "priority" if !text.is_empty() => {
                priority = text.parse().map_err(ApiError::from)?;
            }
            "limit" => limit = parse_number(&text).unwrap_or(DEFAULT_FACE_LIMIT),
            "start_time" => options.start_time = Some(text).filter(|t| !t.is_empty()),
            "end_time" => options.end_time = Some(text).filter(|t| !t.is_empty()),
            "camera_ids" if !text.is_empty() => options.camera_ids.push(text),
            "min_image_quality" => options.min_image_quality = parse_number(&text),
            "min_cluster_quality" => options.min_cluster_quality = parse_number(&text),
            "min_cluster_size" => options.min_cluster_size = parse_number(&text),
            "max_distance" => options.max_distance = parse_number(&text),
            _ => {}
        }
    }

    let image = image
        .filter(|upload| !upload.is_empty())
        .ok_or_else(|| ApiError::bad_request("An image file is required"))?;

    Ok((image, priority, limit, options))
}

async fn text_search(
    State(state): State<AppState>,
    _auth: AuthSession,
    Json(request): Json<TextSearchRequest>,
) -> ApiResult<Json<Value>> {
    let results = state
        .services
        .event_search
        .text_search(&request)
        .await
        .map_err(|e| {
            error!("Search error: {}", e);
            match e.downcast_ref::<Error>() {
                Some(Error::Validation(_)) | Some(Error::UpstreamStatus(..)) => ApiError::from(e),
                _ => ApiError::internal("Failed to perform search"),
            }
        })?;

    Ok(Json(results))
}

async fn semantic_search(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Vec<FrigateEvent>>> {
    info!("Received semantic search request");

    if state.services.event_search.instances().is_empty() {
        error!("No Frigate instances configured");
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Search service unavailable: No Frigate instances configured.",
        ));
    }

    let params = semantic_params(read_form(multipart).await?);
    debug!(
        "Semantic search: query={:?} image={} limit={} sort={}",
        params.query,
        params.image.is_some(),
        params.limit,
        params.sort
    );

    let events = state
        .services
        .event_search
        .semantic_search(&params)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(events))
}

async fn face_clusters(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    let clusters = state.services.face.clusters().await.map_err(|e| {
        error!("Error fetching face clusters: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(clusters))
}

async fn cluster_faces(
    State(state): State<AppState>,
    Path(cluster_id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    let faces = state.services.face.cluster_faces(&cluster_id).await.map_err(|e| {
        error!("Error fetching faces for cluster {}: {}", cluster_id, e);
        ApiError::from(e)
    })?;

    Ok(Json(faces))
}

async fn face_search(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let (image, priority, limit, options) = face_search_args(read_form(multipart).await?)?;

    let result = state
        .services
        .face
        .search_by_image(&image, priority, limit, &options)
        .await
        .map_err(|e| {
            error!("Face search failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(result))
}
