//! `boardroom-auth`: session tokens, identity resolution and board authorization.
//!
//! This crate is intentionally decoupled from HTTP. Persistence is reached only
//! through the [`CredentialStore`] trait.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod password;
pub mod session;
pub mod token;
pub mod user;

pub use authorize::{AuthzError, BoardAction, BoardRelation, authorize};
pub use claims::{SessionClaims, TokenError, validate_claims};
pub use identity::Identity;
pub use password::{PasswordError, hash_password, verify_password};
pub use session::{AuthError, LoginSession, SessionResolver};
pub use token::{DEFAULT_SESSION_TTL_DAYS, MAX_SESSION_TTL_DAYS, SessionTokenCodec};
pub use user::{CredentialStore, NewUser, User, UserSummary, normalize_email};
