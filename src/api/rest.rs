use crate::config::{ApiConfig, Config};
use crate::db::repositories::Repositories;
use crate::db::DatabaseService;
use crate::error::Error;
use crate::security::AuthService;
use crate::services::ExternalServices;
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod alerts_controller;
pub mod auth_controller;
pub mod cameras_controller;
pub mod dashboard_controller;
pub mod media_controller;
pub mod search_controller;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Arc<PgPool>,
    pub repos: Repositories,
    pub auth_service: Arc<AuthService>,
    pub services: ExternalServices,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: Arc<PgPool>, config: Config) -> Result<Self> {
        Ok(Self {
            repos: Repositories::new(Arc::clone(&db_pool)),
            auth_service: Arc::new(AuthService::new(Arc::clone(&db_pool), &config.security)),
            services: ExternalServices::new(&config)?,
            config: Arc::new(config),
            db_pool,
        })
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const UPSTREAM_ERROR_MESSAGE: &str = "Upstream service error";

/// Error body returned to the browser as `{"error": ..., "status": ...}`
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(rename = "error")]
    pub message: String,
    pub status: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: status.as_u16(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Validation failures keep their message as a 400; anything else
    /// becomes a 500 with the given message
    pub fn validation_or_internal(err: anyhow::Error, message: &str) -> Self {
        match err.downcast_ref::<Error>() {
            Some(Error::Validation(msg)) => Self::bad_request(msg.clone()),
            _ => Self::internal(message),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg),
            Error::Authentication(msg) => ApiError::new(StatusCode::UNAUTHORIZED, msg),
            Error::AlreadyExists(msg) => ApiError::new(StatusCode::CONFLICT, msg),
            Error::UpstreamStatus(status, msg) => ApiError {
                status: StatusCode::from_u16(status)
                    .map(|s| s.as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY.as_u16()),
                message: msg,
            },
            Error::Upstream(_) => {
                error!("{}", err);
                ApiError::new(StatusCode::BAD_GATEWAY, UPSTREAM_ERROR_MESSAGE)
            }
            Error::Unavailable(msg) => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, msg),
            // Database, config and io details stay in the logs
            _ => {
                error!("{}", err);
                ApiError::internal(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return (*err).clone().into();
        }

        error!("{:#}", err);
        ApiError::internal(INTERNAL_ERROR_MESSAGE)
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

/// Full application router: API routes, CORS, request tracing and the
/// static UI as fallback
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.api);
    let static_dir = ServeDir::new(&state.config.api.static_dir);

    Router::new()
        .route("/health", get(health))
        .merge(auth_controller::create_router())
        .merge(cameras_controller::create_router())
        .merge(alerts_controller::create_router())
        .merge(dashboard_controller::create_router())
        .merge(search_controller::create_router())
        .merge(media_controller::create_router())
        .with_state(state)
        .fallback_service(static_dir)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// CORS for the trusted dashboard origins; cookies require explicit lists
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .trusted_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid trusted origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if DatabaseService::health_check(&state.db_pool).await {
        (StatusCode::OK, Json(json!({ "status": "ok", "database": "up" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "database": "down" })),
        )
    }
}

/// Serve an app on an already bound listener
pub async fn serve(listener: std::net::TcpListener, app: Router) -> Result<()> {
    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

pub struct RestApi {
    state: AppState,
}

impl RestApi {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn run(&self) -> Result<()> {
        let config = &self.state.config.api;
        let addr: SocketAddr = format!("{}:{}", config.address, config.port).parse()?;

        let app = build_router(self.state.clone());

        info!("API server listening on {}", addr);
        info!("Serving dashboard from {}", config.static_dir.display());

        let listener = TcpListener::bind(addr).await?;
        serve(listener.into_std()?, app).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_mapping() {
        let err: ApiError = Error::Validation("Query is required".to_string()).into();
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "Query is required");

        let err: ApiError = Error::UpstreamStatus(404, "gone".to_string()).into();
        assert_eq!(err.status, 404);

        let err: ApiError = Error::Unavailable("no instances".to_string()).into();
        assert_eq!(err.status, 503);

        let err: ApiError = anyhow::Error::from(Error::AlreadyExists("dup".to_string())).into();
        assert_eq!(err.status, 409);

        let err: ApiError = anyhow::anyhow!("boom").into();
        assert_eq!(err.status, 500);
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_api_error_hides_internal_detail() {
        let err: ApiError =
            Error::Database("Failed to query attendance: relation \"gate_monitoring\" does not exist".to_string())
                .into();
        assert_eq!(err.status, 500);
        assert_eq!(err.message, "Internal server error");

        let err: ApiError = anyhow::Error::from(Error::Io("Failed to read /etc/stadium".to_string())).into();
        assert_eq!(err.status, 500);
        assert!(!err.message.contains("/etc/stadium"));

        let err: ApiError = Error::Upstream("connection refused to 10.0.0.3".to_string()).into();
        assert_eq!(err.status, 502);
        assert_eq!(err.message, "Upstream service error");
    }

    #[test]
    fn test_validation_or_internal() {
        let err = ApiError::validation_or_internal(
            Error::Validation("Query is required".to_string()).into(),
            "Failed",
        );
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "Query is required");

        let err = ApiError::validation_or_internal(
            Error::UpstreamStatus(404, "gone".to_string()).into(),
            "Failed",
        );
        assert_eq!(err.status, 500);
        assert_eq!(err.message, "Failed");
    }

    #[test]
    fn test_api_error_body() {
        let body = serde_json::to_value(ApiError::bad_request("Missing URL")).unwrap();
        assert_eq!(body, json!({ "error": "Missing URL", "status": 400 }));
    }
}
