use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use boardroom_auth::Identity;
use boardroom_boards::BoardError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_board))
        .route("/me", get(my_boards))
        .route("/invited", get(invited_boards))
        .route("/invite", post(invite_user))
        .route("/remove-user", post(remove_user))
        .route("/leave", post(leave_board))
        .route("/:id", get(get_board).delete(delete_board))
        .route("/:id/can-access", get(can_access))
        .route("/:id/users", get(board_users))
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, BoardError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::board_error_to_response(e),
    }
}

fn message(result: Result<(), BoardError>, text: &'static str) -> Response {
    respond(StatusCode::OK, result.map(|()| json!({ "message": text })))
}

pub async fn create_board(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    dto::JsonBody(body): dto::JsonBody<dto::CreateBoardRequest>,
) -> Response {
    let result = services
        .boards
        .create_board(&identity, &body.name, Utc::now())
        .await;
    respond(StatusCode::CREATED, result)
}

pub async fn my_boards(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Response {
    respond(StatusCode::OK, services.boards.my_boards(&identity).await)
}

pub async fn invited_boards(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
) -> Response {
    respond(StatusCode::OK, services.boards.invited_boards(&identity).await)
}

pub async fn get_board(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let board = match dto::parse_board_id(&id) {
        Ok(board) => board,
        Err(e) => return errors::board_error_to_response(e),
    };
    respond(StatusCode::OK, services.boards.get_board(&identity, board).await)
}

pub async fn delete_board(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let board = match dto::parse_board_id(&id) {
        Ok(board) => board,
        Err(e) => return errors::board_error_to_response(e),
    };
    message(
        services.boards.delete_board(&identity, board).await,
        "board deleted",
    )
}

pub async fn invite_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    dto::JsonBody(body): dto::JsonBody<dto::InviteRequest>,
) -> Response {
    let board = match dto::parse_board_id(&body.board_id) {
        Ok(board) => board,
        Err(e) => return errors::board_error_to_response(e),
    };
    let result = services
        .boards
        .invite(&identity, board, &body.email)
        .await
        .map(|user| json!({ "message": "user invited", "user": user }));
    respond(StatusCode::OK, result)
}

pub async fn remove_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    dto::JsonBody(body): dto::JsonBody<dto::RemoveUserRequest>,
) -> Response {
    let ids = dto::parse_board_id(&body.board_id)
        .and_then(|board| Ok((board, dto::parse_user_id(&body.user_id)?)));
    let (board, target) = match ids {
        Ok(ids) => ids,
        Err(e) => return errors::board_error_to_response(e),
    };
    message(
        services.boards.remove_user(&identity, board, target).await,
        "user removed",
    )
}

pub async fn leave_board(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    dto::JsonBody(body): dto::JsonBody<dto::LeaveRequest>,
) -> Response {
    let board = match dto::parse_board_id(&body.board_id) {
        Ok(board) => board,
        Err(e) => return errors::board_error_to_response(e),
    };
    message(services.boards.leave(&identity, board).await, "left board")
}

/// `200 {"access": true}` or `403 {"access": false, ...}`.
pub async fn can_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let board = match dto::parse_board_id(&id) {
        Ok(board) => board,
        Err(e) => return errors::board_error_to_response(e),
    };
    match services.boards.can_access(&identity, board).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "access": true }))).into_response(),
        Ok(false) => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "access": false,
                "error": "forbidden",
                "message": "no access to this board",
            })),
        )
            .into_response(),
        Err(e) => errors::board_error_to_response(e),
    }
}

pub async fn board_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let board = match dto::parse_board_id(&id) {
        Ok(board) => board,
        Err(e) => return errors::board_error_to_response(e),
    };
    respond(StatusCode::OK, services.boards.board_users(&identity, board).await)
}
