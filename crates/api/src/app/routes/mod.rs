use axum::{
    Router,
    routing::{delete, get, post},
};

pub mod auth;
pub mod boards;
pub mod system;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Endpoints that require a resolved identity.
pub fn protected_router() -> Router {
    Router::new()
        .route("/validate", get(auth::validate))
        .route("/account", delete(auth::delete_account))
        .nest("/boards", boards::router())
}
