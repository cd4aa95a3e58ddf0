//! Session resolution and credential login.
//!
//! The resolver turns a raw bearer token into an [`Identity`] by verifying the
//! token and re-reading the subject from the credential store on every call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use boardroom_core::{DomainError, StoreError, UserId};

use crate::password::{PasswordError, hash_password, verify_password};
use crate::{CredentialStore, Identity, NewUser, SessionTokenCodec, TokenError, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing session token")]
    MissingToken,

    #[error("invalid session token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("user {0} no longer exists")]
    UserNotFound(UserId),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email is already registered")]
    EmailTaken,

    #[error("{0}")]
    Invalid(String),

    #[error("credential store failure: {0}")]
    Store(#[from] StoreError),

    #[error("internal authentication failure: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the failure means "not authenticated" at the boundary.
    ///
    /// Store failures are internal and must not be reported as 401.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken
                | AuthError::InvalidToken(_)
                | AuthError::UserNotFound(_)
                | AuthError::InvalidCredentials
        )
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        AuthError::Invalid(value.to_string())
    }
}

impl From<PasswordError> for AuthError {
    fn from(value: PasswordError) -> Self {
        match value {
            PasswordError::Empty => AuthError::Invalid(PasswordError::Empty.to_string()),
            PasswordError::Hashing(msg) => AuthError::Internal(msg),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

/// Resolves tokens to identities and handles signup/login.
#[derive(Clone)]
pub struct SessionResolver {
    codec: SessionTokenCodec,
    users: Arc<dyn CredentialStore>,
}

impl SessionResolver {
    pub fn new(codec: SessionTokenCodec, users: Arc<dyn CredentialStore>) -> Self {
        Self { codec, users }
    }

    /// Resolve a raw token into the current identity.
    pub async fn resolve(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let subject = self.codec.verify_subject(token, now).map_err(|e| {
            debug!(reason = %e, "session token rejected");
            AuthError::InvalidToken(e)
        })?;

        match self.users.find_user(subject).await? {
            Some(user) => Ok(Identity::from(&user)),
            None => {
                warn!(user_id = %subject, "valid session token for unknown user");
                Err(AuthError::UserNotFound(subject))
            }
        }
    }

    /// Register a new account.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        let hash = hash_password(password)?;
        let new_user = NewUser::new(email, name, hash)?;

        if self.users.find_user_by_email(&new_user.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user = match self.users.insert_user(new_user, now).await {
            Ok(user) => user,
            // Lost a race with a concurrent signup for the same email.
            Err(StoreError::Constraint(_)) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        debug!(user_id = %user.id, "account created");
        Ok(Identity::from(&user))
    }

    /// Check email + password and mint a session token.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginSession, AuthError> {
        let user: User = self
            .users
            .find_user_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&user.password_hash, password) {
            debug!(user_id = %user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let expires_at = self
            .codec
            .expiry_for(now)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let token = self
            .codec
            .mint(user.id, now)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(LoginSession {
            token,
            identity: Identity::from(&user),
            expires_at,
        })
    }

    /// Delete the caller's own account. Outstanding tokens stop resolving.
    pub async fn delete_account(&self, identity: &Identity) -> Result<(), AuthError> {
        if self.users.delete_user(identity.id).await? {
            Ok(())
        } else {
            Err(AuthError::UserNotFound(identity.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::RwLock;

    #[derive(Default)]
    struct MapUsers {
        inner: RwLock<HashMap<UserId, User>>,
    }

    #[async_trait]
    impl CredentialStore for MapUsers {
        async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
            let mut map = self.inner.write().unwrap();
            if map.values().any(|u| u.email == user.email) {
                return Err(StoreError::Constraint("users_email_key".into()));
            }
            let user = User {
                id: user.id,
                email: user.email,
                name: user.name,
                password_hash: user.password_hash,
                created_at: now,
            };
            map.insert(user.id, user.clone());
            Ok(user)
        }

        async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
            Ok(self.inner.read().unwrap().get(&id).cloned())
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            Ok(self.inner.read().unwrap().values().find(|u| u.email == email).cloned())
        }

        async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
            Ok(self.inner.write().unwrap().remove(&id).is_some())
        }
    }

    fn resolver() -> SessionResolver {
        let codec = SessionTokenCodec::with_default_ttl(b"resolver-secret").unwrap();
        SessionResolver::new(codec, Arc::new(MapUsers::default()))
    }

    #[tokio::test]
    async fn login_then_resolve() {
        let r = resolver();
        let now = Utc::now();
        let created = r.signup("alice@example.com", "pw", Some("Alice"), now).await.unwrap();

        let session = r.login("alice@example.com", "pw", now).await.unwrap();
        assert_eq!(session.identity, created);
        assert_eq!(session.expires_at, now + Duration::days(30));

        let identity = r.resolve(Some(&session.token), now).await.unwrap();
        assert_eq!(identity.id, created.id);
        assert_eq!(identity.name, "Alice");
    }

    #[tokio::test]
    async fn missing_or_blank_token_is_unauthenticated() {
        let r = resolver();
        assert_eq!(r.resolve(None, Utc::now()).await, Err(AuthError::MissingToken));
        assert_eq!(r.resolve(Some("  "), Utc::now()).await, Err(AuthError::MissingToken));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let r = resolver();
        let now = Utc::now();
        r.signup("bob@example.com", "pw", None, now).await.unwrap();
        let session = r.login("bob@example.com", "pw", now - Duration::days(31)).await.unwrap();

        let err = r.resolve(Some(&session.token), now).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken(TokenError::Expired));
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn deleted_account_never_resolves_to_stale_identity() {
        let r = resolver();
        let now = Utc::now();
        let identity = r.signup("carol@example.com", "pw", None, now).await.unwrap();
        let session = r.login("carol@example.com", "pw", now).await.unwrap();

        r.delete_account(&identity).await.unwrap();

        let err = r.resolve(Some(&session.token), now).await.unwrap_err();
        assert_eq!(err, AuthError::UserNotFound(identity.id));
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let r = resolver();
        let now = Utc::now();
        r.signup("dave@example.com", "right", None, now).await.unwrap();

        let wrong = r.login("dave@example.com", "wrong", now).await.unwrap_err();
        let unknown = r.login("nobody@example.com", "right", now).await.unwrap_err();
        assert_eq!(wrong, AuthError::InvalidCredentials);
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn duplicate_signup_is_refused() {
        let r = resolver();
        let now = Utc::now();
        r.signup("erin@example.com", "pw", None, now).await.unwrap();
        assert_eq!(
            r.signup("erin@example.com", "pw2", None, now).await.unwrap_err(),
            AuthError::EmailTaken
        );
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let r = resolver();
        assert!(matches!(
            r.signup("not-an-email", "pw", None, Utc::now()).await,
            Err(AuthError::Invalid(_))
        ));
        assert!(matches!(
            r.signup("frank@example.com", "", None, Utc::now()).await,
            Err(AuthError::Invalid(_))
        ));
    }
}
