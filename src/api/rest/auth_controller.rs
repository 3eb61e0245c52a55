use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::db::models::{SignInCredentials, SignUpRequest};
use crate::security::{AuthenticatedSession, ClientInfo};
use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use log::{error, info};
use serde_json::{json, Value};
use std::net::SocketAddr;

/// Routes under `/api/auth`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/session", get(get_session))
}

/// Extractor for routes that require a signed-in user
pub struct AuthSession(pub AuthenticatedSession);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.security.cookie_name)
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized"))?;

        match state.auth_service.get_session(&token).await {
            Ok(session) => Ok(AuthSession(session)),
            Err(e) => {
                info!("Rejected session: {}", e);
                Err(ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized"))
            }
        }
    }
}

/// Session token from the cookie, or from an `Authorization: Bearer` header
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn client_info(addr: Option<ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> ClientInfo {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    ClientInfo {
        ip_address: forwarded.or_else(|| addr.map(|ConnectInfo(addr)| addr.ip().to_string())),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    }
}

fn session_cookie(name: &str, value: String) -> Cookie<'static> {
    Cookie::build(name.to_string(), value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

fn signed_in_response(
    jar: CookieJar,
    cookie_name: &str,
    auth: AuthenticatedSession,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let token = auth
        .token
        .clone()
        .ok_or_else(|| ApiError::internal("Session token missing"))?;

    let jar = jar.add(session_cookie(cookie_name, token.access_token.clone()));

    Ok((
        jar,
        Json(json!({
            "user": auth.user,
            "session": auth.session,
            "token": token.access_token,
            "expiresIn": token.expires_in,
        })),
    ))
}

async fn sign_up(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let client = client_info(addr, &headers);

    let auth = state.auth_service.sign_up(&request, &client).await.map_err(|e| {
        error!("Sign up failed for {}: {}", request.email, e);
        ApiError::from(e)
    })?;

    signed_in_response(jar, &state.config.security.cookie_name, auth)
}

async fn sign_in(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(credentials): Json<SignInCredentials>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let client = client_info(addr, &headers);

    let auth = state
        .auth_service
        .sign_in(&credentials, &client)
        .await
        .map_err(ApiError::from)?;

    signed_in_response(jar, &state.config.security.cookie_name, auth)
}

/// Always clears the cookie; a stale or forged token is not an error here
async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    let cookie_name = &state.config.security.cookie_name;

    if let Some(token) = session_token(&headers, cookie_name) {
        if let Err(e) = state.auth_service.sign_out(&token).await {
            info!("Sign out with unusable token: {}", e);
        }
    }

    let jar = jar.remove(Cookie::build(cookie_name.to_string(), "").path("/").finish());
    (jar, Json(json!({ "success": true })))
}

async fn get_session(AuthSession(session): AuthSession) -> Json<AuthenticatedSession> {
    Json(session)
}
