use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boardroom_core::UserId;

/// Verified session claims.
///
/// Produced by [`crate::SessionTokenCodec::verify`] once the signature and the
/// algorithm have been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user the token was minted for.
    pub subject: UserId,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token uses an unexpected signing algorithm")]
    UnexpectedAlgorithm,

    #[error("token is missing required claim '{0}'")]
    MissingClaim(String),

    #[error("token subject is not a valid user id")]
    InvalidSubject,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("session lifetime is out of range")]
    InvalidTtl,

    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Tolerated clock skew between the replica that minted a token and the one
/// verifying it. Applies to the issue time only; expiry is exact.
pub const ISSUED_AT_LEEWAY_SECS: i64 = 60;

/// Deterministically validate the time window of session claims.
///
/// Signature verification happens before this in the codec; this only looks
/// at timestamps so callers can pin the clock.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenError::InvalidTimeWindow);
    }
    if now + Duration::seconds(ISSUED_AT_LEEWAY_SECS) < claims.issued_at {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(issued_at: DateTime<Utc>, ttl: Duration) -> SessionClaims {
        SessionClaims {
            subject: UserId::new(),
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    #[test]
    fn accepts_inside_window() {
        let now = Utc::now();
        let c = claims(now - Duration::hours(1), Duration::days(30));
        assert_eq!(validate_claims(&c, now), Ok(()));
    }

    #[test]
    fn expiry_is_exclusive() {
        let now = Utc::now();
        let c = claims(now - Duration::days(30), Duration::days(30));
        assert_eq!(validate_claims(&c, now), Err(TokenError::Expired));
    }

    #[test]
    fn rejects_future_issue_time() {
        let now = Utc::now();
        let c = claims(now + Duration::minutes(5), Duration::days(1));
        assert_eq!(validate_claims(&c, now), Err(TokenError::NotYetValid));
    }

    #[test]
    fn tolerates_small_clock_skew() {
        let now = Utc::now();
        let c = claims(now + Duration::seconds(2), Duration::days(1));
        assert_eq!(validate_claims(&c, now), Ok(()));

        let c = claims(now + Duration::seconds(ISSUED_AT_LEEWAY_SECS), Duration::days(1));
        assert_eq!(validate_claims(&c, now), Ok(()));

        let c = claims(now + Duration::seconds(ISSUED_AT_LEEWAY_SECS + 1), Duration::days(1));
        assert_eq!(validate_claims(&c, now), Err(TokenError::NotYetValid));
    }

    #[test]
    fn rejects_inverted_window() {
        let now = Utc::now();
        let c = claims(now, Duration::seconds(-1));
        assert_eq!(validate_claims(&c, now), Err(TokenError::InvalidTimeWindow));
    }
}
