//! Registered users and the credential store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use boardroom_core::{DomainError, StoreError, UserId};

/// A registered account as persisted by the credential store.
///
/// # Invariants
/// - `email` is unique across the store and immutable after creation.
/// - Only `password_hash` may change after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user (never carries the hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Validated input for account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

impl NewUser {
    /// Build a new account record.
    ///
    /// The display name falls back to the email when none is given.
    pub fn new(
        email: &str,
        name: Option<&str>,
        password_hash: String,
    ) -> Result<Self, DomainError> {
        let email = normalize_email(email)?;
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => email.clone(),
        };

        Ok(Self {
            id: UserId::new(),
            email,
            name,
            password_hash,
        })
    }
}

/// Trim and sanity-check an email address.
///
/// Matching is exact after trimming; case is preserved.
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email.to_string())
}

/// Persistence contract for user accounts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new account. A duplicate email yields `StoreError::Constraint`.
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, StoreError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Delete an account; owned boards and memberships go with it.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_defaults_to_email() {
        let u = NewUser::new("  alice@example.com ", None, "h".into()).unwrap();
        assert_eq!(u.email, "alice@example.com");
        assert_eq!(u.name, "alice@example.com");

        let u = NewUser::new("bob@example.com", Some("  "), "h".into()).unwrap();
        assert_eq!(u.name, "bob@example.com");
    }

    #[test]
    fn explicit_name_is_kept() {
        let u = NewUser::new("carol@example.com", Some("Carol"), "h".into()).unwrap();
        assert_eq!(u.name, "Carol");
    }

    #[test]
    fn email_case_is_preserved() {
        assert_eq!(normalize_email("Dave@Example.com").unwrap(), "Dave@Example.com");
    }

    #[test]
    fn invalid_email_rejected() {
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("   ").is_err());
    }
}
