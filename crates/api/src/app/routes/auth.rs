//! Signup, login, logout and session introspection.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use boardroom_auth::Identity;

use crate::app::services::{AppServices, CookieSettings};
use crate::app::{dto, errors};
use crate::middleware::SESSION_COOKIE;

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    dto::JsonBody(body): dto::JsonBody<dto::SignupRequest>,
) -> Response {
    match services
        .sessions
        .signup(&body.email, &body.password, body.name.as_deref(), Utc::now())
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(dto::UserResponse { user })).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// Verify credentials, set the session cookie and return the token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    dto::JsonBody(body): dto::JsonBody<dto::LoginRequest>,
) -> Response {
    let session = match services
        .sessions
        .login(&body.email, &body.password, Utc::now())
        .await
    {
        Ok(session) => session,
        Err(e) => return errors::auth_error_to_response(e),
    };

    tracing::info!(user_id = %session.identity.id, "login");
    let cookie = set_cookie(&session.token, services.cookie);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(dto::LoginResponse {
            token: session.token,
            user: session.identity,
            expires_at: session.expires_at,
        }),
    )
        .into_response()
}

/// Expire the session cookie. Tokens are stateless, so a copied token stays
/// valid until it expires.
pub async fn logout(Extension(services): Extension<Arc<AppServices>>) -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_cookie(services.cookie))],
        Json(json!({ "message": "logged out" })),
    )
        .into_response()
}

pub async fn validate(Extension(identity): Extension<Identity>) -> Response {
    (StatusCode::OK, Json(dto::UserResponse { user: identity })).into_response()
}

pub async fn delete_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Response {
    if let Err(e) = services.sessions.delete_account(&identity).await {
        return errors::auth_error_to_response(e);
    }

    tracing::info!(user_id = %identity.id, "account deleted");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_cookie(services.cookie))],
        Json(json!({ "message": "account deleted" })),
    )
        .into_response()
}

fn set_cookie(token: &str, settings: CookieSettings) -> String {
    cookie_header(token, settings.max_age_secs, settings.secure)
}

fn clear_cookie(settings: CookieSettings) -> String {
    cookie_header("", 0, settings.secure)
}

fn cookie_header(value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
