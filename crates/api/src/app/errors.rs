use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use boardroom_auth::AuthError;
use boardroom_boards::BoardError;

const INTERNAL_MESSAGE: &str = "internal server error";

pub fn board_error_to_response(err: BoardError) -> axum::response::Response {
    let status = match &err {
        BoardError::Unauthenticated => StatusCode::UNAUTHORIZED,
        BoardError::Forbidden(_) => StatusCode::FORBIDDEN,
        BoardError::NotFound(_) => StatusCode::NOT_FOUND,
        BoardError::Invalid(_) => StatusCode::BAD_REQUEST,
        BoardError::Store(_) | BoardError::Internal(_) => {
            tracing::error!(error = %err, "request failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, err.kind(), INTERNAL_MESSAGE);
        }
    };
    json_error(status, err.kind(), err.to_string())
}

/// Map an authentication failure.
///
/// Every "not authenticated" cause collapses to the same 401 body so callers
/// cannot tell an expired token from a deleted account.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            AuthError::InvalidCredentials.to_string(),
        ),
        e if e.is_unauthenticated() => unauthenticated(),
        AuthError::EmailTaken => {
            json_error(StatusCode::CONFLICT, "conflict", AuthError::EmailTaken.to_string())
        }
        AuthError::Invalid(msg) => json_error(StatusCode::BAD_REQUEST, "invalid", msg),
        other => {
            tracing::error!(error = %other, "authentication failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", INTERNAL_MESSAGE)
        }
    }
}

pub fn unauthenticated() -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardroom_auth::TokenError;
    use boardroom_core::{StoreError, UserId};

    #[test]
    fn board_errors_map_to_statuses() {
        let cases = [
            (BoardError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (BoardError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (BoardError::NotFound("user not found".into()), StatusCode::NOT_FOUND),
            (BoardError::Invalid("bad".into()), StatusCode::BAD_REQUEST),
            (
                BoardError::Store(StoreError::backend("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(board_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn all_session_failures_are_401() {
        for err in [
            AuthError::MissingToken,
            AuthError::InvalidToken(TokenError::Expired),
            AuthError::InvalidToken(TokenError::UnexpectedAlgorithm),
            AuthError::UserNotFound(UserId::new()),
        ] {
            assert_eq!(auth_error_to_response(err).status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn store_failure_during_auth_is_500_not_401() {
        let err = AuthError::Store(StoreError::Unavailable("down".into()));
        assert_eq!(
            auth_error_to_response(err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
