//! Session endpoints that issue and clear the `auth` cookie the gate checks.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::gate::{
    cookie::{clear_cookie, secret_matches, set_cookie},
    AuthCookie, Gate,
};

const OWNER_ROLE: &str = "owner";
const USER_ROLE: &str = "user";

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    /// Required when the storage type is not `localstorage`.
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub ok: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, auth cookie set", body = SessionResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 401, description = "Wrong username or password", body = ErrorResponse),
        (status = 503, description = "No password configured", body = ErrorResponse)
    ),
    tag = "session"
)]
#[instrument(skip_all)]
pub async fn login(
    gate: Extension<Arc<Gate>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
    };

    let config = gate.config();

    let Some(secret) = config.secret() else {
        warn!("Login attempted but no password is configured");
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Password not configured");
    };

    let cookie = if config.storage_type().uses_signature() {
        let username = request.username.as_deref().map(str::trim).unwrap_or_default();
        let is_owner = !username.is_empty() && config.username() == Some(username);

        if !is_owner || !secret_matches(secret, &request.password) {
            return error_response(StatusCode::UNAUTHORIZED, "Invalid username or password");
        }

        match AuthCookie::signed(username, secret, OWNER_ROLE) {
            Ok(cookie) => cookie,
            Err(err) => {
                error!("Failed to sign auth cookie: {err}");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed");
            }
        }
    } else {
        if !secret_matches(secret, &request.password) {
            return error_response(StatusCode::UNAUTHORIZED, "Invalid password");
        }

        AuthCookie::with_password(&request.password, USER_ROLE)
    };

    let header = match cookie
        .to_cookie_value()
        .map_err(|err| err.to_string())
        .and_then(|value| {
            set_cookie(&value, config.cookie_max_age_seconds()).map_err(|err| err.to_string())
        }) {
        Ok(header) => header,
        Err(err) => {
            error!("Failed to build auth cookie: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Login failed");
        }
    };

    info!(
        "Login succeeded for {}",
        cookie.username.as_deref().unwrap_or(USER_ROLE)
    );

    (
        StatusCode::OK,
        [(SET_COOKIE, header)],
        Json(SessionResponse { ok: true }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Auth cookie cleared", body = SessionResponse)
    ),
    tag = "session"
)]
pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(SET_COOKIE, clear_cookie())],
        Json(SessionResponse { ok: true }),
    )
}
