use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use application::services::{AuthenticateUserRequest, RegisterUserRequest};
use domain::{Message, UserId, UserProfile};

use crate::{error::ApiError, state::AppState, ws_connection};

/// 登录后下发的会话 cookie 名
pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Deserialize, Validate)]
struct RegisterPayload {
    #[validate(length(min = 1, max = 50))]
    username: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginPayload {
    #[validate(length(min = 1))]
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: UserProfile,
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register_user))
        .route("/users/login", post(login_user))
        .route("/users/{user_id}", get(get_user))
        .route("/messages/{user_id}", get(websocket_upgrade))
        .route("/messages/{sender_id}/{receiver_id}", get(get_history))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    validate_payload(&payload)?;
    let profile = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    validate_payload(&payload)?;
    let outcome = state
        .user_service
        .login(AuthenticateUserRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let max_age = (outcome.session.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = format!(
        "{SESSION_COOKIE}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}",
        outcome.session.token
    );
    let body = LoginResponse {
        user: outcome.user,
        token: outcome.session.token,
        expires_at: outcome.session.expires_at,
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.user_service.profile(UserId::new(user_id)).await?;
    Ok(Json(profile))
}

async fn get_history(
    State(state): State<AppState>,
    Path((sender_id, receiver_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state
        .message_service
        .history(UserId::new(sender_id), UserId::new(receiver_id))
        .await?;
    Ok(Json(messages))
}

/// 在升级之前完成会话校验，失败时直接返回 401，不建立实时连接
async fn websocket_upgrade(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = session_token(&headers).or(query.token);
    let session = state
        .relay
        .authenticate(token.as_deref(), UserId::new(user_id))
        .await?;

    let user_id = session.user_id;
    Ok(ws.on_upgrade(move |socket| ws_connection::serve(socket, state, user_id)))
}

/// 从 `Cookie` 头中取出会话令牌
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_is_read_from_the_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc123; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_cookie_yields_none() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("tokenx=nope"));
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
