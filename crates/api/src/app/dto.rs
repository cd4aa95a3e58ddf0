use axum::{
    Json, async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boardroom_auth::Identity;
use boardroom_boards::BoardError;
use boardroom_core::{BoardId, UserId};

use crate::app::errors;

/// JSON request body whose rejections use the API error shape.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(body)) => Ok(Self(body)),
            Err(rejection) => Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid",
                rejection.body_text(),
            )),
        }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub board_id: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveUserRequest {
    pub board_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    pub board_id: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Identity,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: Identity,
}

// -------------------------
// Mapping helpers
// -------------------------

pub fn parse_board_id(raw: &str) -> Result<BoardId, BoardError> {
    raw.parse::<BoardId>().map_err(BoardError::from)
}

pub fn parse_user_id(raw: &str) -> Result<UserId, BoardError> {
    raw.parse::<UserId>().map_err(BoardError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_or_are_invalid() {
        let id = BoardId::new();
        assert_eq!(parse_board_id(&id.to_string()), Ok(id));
        assert!(matches!(parse_board_id("12"), Err(BoardError::Invalid(_))));
        assert!(matches!(parse_user_id(""), Err(BoardError::Invalid(_))));
    }

    #[test]
    fn signup_name_is_optional() {
        let body: SignupRequest =
            serde_json::from_str(r#"{"email":"a@x.io","password":"pw"}"#).unwrap();
        assert!(body.name.is_none());
    }
}
