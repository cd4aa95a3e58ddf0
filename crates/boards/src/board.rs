use chrono::{DateTime, Utc};
use serde::Serialize;

use boardroom_auth::UserSummary;
use boardroom_core::{BoardId, DomainError, UserId};

/// Longest accepted board name (matches the `VARCHAR(255)` column).
pub const MAX_BOARD_NAME_LEN: usize = 255;

/// A shared board.
///
/// # Invariants
/// - `creator_id` is the one and only owner and never changes.
/// - Owner access is derived from `creator_id`, never from a membership row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Board {
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.creator_id == user
    }
}

/// Validated input for board creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBoard {
    pub id: BoardId,
    pub name: String,
    pub creator_id: UserId,
}

impl NewBoard {
    pub fn new(name: &str, creator_id: UserId) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("board name is required"));
        }
        if name.chars().count() > MAX_BOARD_NAME_LEN {
            return Err(DomainError::validation(format!(
                "board name must be at most {MAX_BOARD_NAME_LEN} characters"
            )));
        }

        Ok(Self {
            id: BoardId::new(),
            name: name.to_string(),
            creator_id,
        })
    }
}

/// Everyone with access to a board, owner listed separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardUsers {
    pub owner: UserSummary,
    pub invited: Vec<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed() {
        let owner = UserId::new();
        let b = NewBoard::new("  Roadmap ", owner).unwrap();
        assert_eq!(b.name, "Roadmap");
        assert_eq!(b.creator_id, owner);
    }

    #[test]
    fn blank_name_rejected() {
        assert!(NewBoard::new("   ", UserId::new()).is_err());
    }

    #[test]
    fn overlong_name_rejected() {
        let name = "x".repeat(MAX_BOARD_NAME_LEN + 1);
        assert!(NewBoard::new(&name, UserId::new()).is_err());
        assert!(NewBoard::new(&name[1..], UserId::new()).is_ok());
    }
}
