//! Session token codec (HS256 JWT).
//!
//! The verifier pins the algorithm: whatever `alg` the header claims, only
//! HS256 signed with the configured secret is accepted.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use boardroom_core::UserId;

use crate::claims::{SessionClaims, TokenError, validate_claims};

/// Lifetime of a freshly minted session token.
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

/// Longest session lifetime a codec accepts.
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Registered claim names as they appear on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Mints and verifies stateless session tokens.
///
/// Holds the process-wide signing secret; build it once at startup and share
/// it. Rotating the secret invalidates every outstanding token.
#[derive(Clone)]
pub struct SessionTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl core::fmt::Debug for SessionTokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionTokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionTokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if ttl <= Duration::zero() || ttl > Duration::days(MAX_SESSION_TTL_DAYS) {
            return Err(TokenError::InvalidTtl);
        }

        let mut validation = Validation::new(ALGORITHM);
        // Time checks run in `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Codec with the default 30 day session lifetime.
    pub fn with_default_ttl(secret: &[u8]) -> Result<Self, TokenError> {
        Self::new(secret, Duration::days(DEFAULT_SESSION_TTL_DAYS))
    }

    /// Expiry of a token minted at `now`.
    pub fn expiry_for(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TokenError> {
        now.checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("expiry out of range".to_string()))
    }

    /// Mint a token for `subject`, valid from `now` until `now + ttl`.
    pub fn mint(&self, subject: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let wire = WireClaims {
            sub: Some(subject.to_string()),
            iat: Some(now.timestamp()),
            exp: Some(self.expiry_for(now)?.timestamp()),
        };

        jsonwebtoken::encode(&Header::new(ALGORITHM), &wire, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm, required claims and the time window.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding, &self.validation)
            .map_err(map_jwt_error)?;
        let wire = data.claims;

        let sub = wire.sub.ok_or_else(|| TokenError::MissingClaim("sub".to_string()))?;
        let subject: UserId = sub.parse().map_err(|_| TokenError::InvalidSubject)?;
        let exp = wire.exp.ok_or_else(|| TokenError::MissingClaim("exp".to_string()))?;
        let iat = wire.iat.ok_or_else(|| TokenError::MissingClaim("iat".to_string()))?;

        let claims = SessionClaims {
            subject,
            issued_at: timestamp(iat)?,
            expires_at: timestamp(exp)?,
        };
        validate_claims(&claims, now)?;

        Ok(claims)
    }

    /// Verify and return only the subject.
    pub fn verify_subject(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        self.verify(token, now).map(|claims| claims.subject)
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| TokenError::Malformed(format!("timestamp out of range: {secs}")))
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::UnexpectedAlgorithm
        }
        ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim(claim.clone()),
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        _ => TokenError::Malformed(err.to_string()),
    }
}
