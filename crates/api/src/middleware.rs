use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use boardroom_auth::{AuthError, Identity, SessionResolver};

use crate::app::errors;

/// Name of the session cookie set at login.
pub const SESSION_COOKIE: &str = "jwt";

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionResolver,
}

/// Resolve the caller and attach their [`Identity`] to the request. The
/// identity is re-read from the store on every request.
///
/// The `jwt` cookie is tried first. If it does not authenticate, a bearer
/// header is tried next, so a stale cookie cannot shadow a valid header.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let candidates = token_candidates(req.headers());

    let identity = match resolve_first(&state.sessions, &candidates).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(reason = %e, "request not authenticated");
            return errors::auth_error_to_response(e);
        }
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

async fn resolve_first(
    sessions: &SessionResolver,
    candidates: &[&str],
) -> Result<Identity, AuthError> {
    let mut last = AuthError::MissingToken;
    for &token in candidates {
        match sessions.resolve(Some(token), Utc::now()).await {
            Ok(identity) => return Ok(identity),
            Err(e) if e.is_unauthenticated() => last = e,
            Err(e) => return Err(e),
        }
    }
    Err(last)
}

/// Session tokens in the order they are tried: cookie, then bearer header.
fn token_candidates(headers: &HeaderMap) -> Vec<&str> {
    session_cookie(headers)
        .into_iter()
        .chain(extract_bearer(headers))
        .collect()
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn reads_jwt_cookie_among_others() {
        let h = headers(&[(header::COOKIE, "theme=dark; jwt=abc.def.ghi; lang=en")]);
        assert_eq!(token_candidates(&h), vec!["abc.def.ghi"]);
    }

    #[test]
    fn cookie_is_tried_before_bearer() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "jwt=from-cookie"),
        ]);
        assert_eq!(token_candidates(&h), vec!["from-cookie", "from-header"]);
    }

    #[test]
    fn empty_cookie_is_skipped() {
        let h = headers(&[
            (header::COOKIE, "jwt="),
            (header::AUTHORIZATION, "Bearer tok"),
        ]);
        assert_eq!(token_candidates(&h), vec!["tok"]);
    }

    #[test]
    fn nothing_usable() {
        assert!(token_candidates(&HeaderMap::new()).is_empty());
        let h = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwdw==")]);
        assert!(token_candidates(&h).is_empty());
        let h = headers(&[(header::COOKIE, "jwtx=abc")]);
        assert!(token_candidates(&h).is_empty());
    }
}
