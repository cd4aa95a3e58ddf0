//! Store selection and service wiring.

use std::sync::Arc;

use anyhow::Context;

use boardroom_auth::{CredentialStore, SessionResolver, SessionTokenCodec};
use boardroom_boards::{BoardService, BoardStore};
use boardroom_infra::{InMemoryStore, PostgresStore};

use crate::config::AppConfig;

/// Cookie attributes for the session cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub max_age_secs: i64,
    pub secure: bool,
}

/// Everything a handler needs, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub sessions: SessionResolver,
    pub boards: BoardService,
    pub cookie: CookieSettings,
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let credentials: Arc<dyn CredentialStore>;
    let boards: Arc<dyn BoardStore>;

    match config.database_url.as_deref() {
        Some(url) => {
            let store = Arc::new(
                PostgresStore::connect(url)
                    .await
                    .context("failed to connect to Postgres")?,
            );
            tracing::info!("using postgres store");
            credentials = store.clone();
            boards = store;
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            let store = Arc::new(InMemoryStore::new());
            credentials = store.clone();
            boards = store;
        }
    }

    services_over(config, credentials, boards)
}

/// Wire services over explicit store handles.
pub fn services_over(
    config: &AppConfig,
    credentials: Arc<dyn CredentialStore>,
    boards: Arc<dyn BoardStore>,
) -> anyhow::Result<AppServices> {
    let codec = SessionTokenCodec::new(config.jwt_secret.as_bytes(), config.session_ttl())
        .context("invalid JWT_SECRET")?;

    Ok(AppServices {
        sessions: SessionResolver::new(codec, credentials.clone()),
        boards: BoardService::new(boards, credentials),
        cookie: CookieSettings {
            max_age_secs: config.session_ttl().num_seconds(),
            secure: config.cookie_secure,
        },
    })
}
