use serde::Serialize;
use thiserror::Error;

use boardroom_core::UserId;

/// How a user relates to a board.
///
/// Ownership comes from `boards.creator_id`, membership from the membership
/// relation. The two are looked up separately and never merged into one row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardRelation {
    Owner,
    Member,
    None,
}

impl BoardRelation {
    /// Combine the two backing lookups.
    ///
    /// Ownership wins: a stray membership row for the owner does not demote
    /// them.
    pub fn from_lookups(is_owner: bool, is_member: bool) -> Self {
        match (is_owner, is_member) {
            (true, _) => BoardRelation::Owner,
            (false, true) => BoardRelation::Member,
            (false, false) => BoardRelation::None,
        }
    }

    pub fn has_access(self) -> bool {
        !matches!(self, BoardRelation::None)
    }

    pub fn is_owner(self) -> bool {
        matches!(self, BoardRelation::Owner)
    }
}

/// An action requested against a single board.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardAction {
    View,
    ListUsers,
    Delete,
    Invite,
    Remove { target: UserId },
    Leave,
}

impl BoardAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardAction::View => "board.view",
            BoardAction::ListUsers => "board.list_users",
            BoardAction::Delete => "board.delete",
            BoardAction::Invite => "board.invite",
            BoardAction::Remove { .. } => "board.remove_user",
            BoardAction::Leave => "board.leave",
        }
    }
}

impl core::fmt::Display for BoardAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("{reason}")]
    Forbidden {
        action: &'static str,
        reason: &'static str,
    },
}

impl AuthzError {
    fn forbidden(action: &BoardAction, reason: &'static str) -> Self {
        AuthzError::Forbidden {
            action: action.as_str(),
            reason,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AuthzError::Forbidden { reason, .. } => reason,
        }
    }
}

/// Decide whether `requester`, standing in `relation` to a board, may perform
/// `action` on it.
///
/// - No IO
/// - No panics
/// - Must be called before any mutating statement
pub fn authorize(
    requester: UserId,
    relation: BoardRelation,
    action: &BoardAction,
) -> Result<(), AuthzError> {
    match action {
        BoardAction::View | BoardAction::ListUsers => {
            if relation.has_access() {
                Ok(())
            } else {
                Err(AuthzError::forbidden(action, "no access to this board"))
            }
        }
        BoardAction::Delete => {
            require_owner(relation, action, "only the owner can delete this board")
        }
        BoardAction::Invite => {
            require_owner(relation, action, "only the owner can invite users to this board")
        }
        BoardAction::Remove { target } => {
            require_owner(relation, action, "only the owner can remove users from this board")?;
            if *target == requester {
                return Err(AuthzError::forbidden(
                    action,
                    "owner cannot remove themselves from the board",
                ));
            }
            Ok(())
        }
        BoardAction::Leave => match relation {
            BoardRelation::Owner => Err(AuthzError::forbidden(
                action,
                "owner cannot leave their own board",
            )),
            BoardRelation::Member | BoardRelation::None => Ok(()),
        },
    }
}

fn require_owner(
    relation: BoardRelation,
    action: &BoardAction,
    reason: &'static str,
) -> Result<(), AuthzError> {
    if relation.is_owner() {
        Ok(())
    } else {
        Err(AuthzError::forbidden(action, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELATIONS: [BoardRelation; 3] =
        [BoardRelation::Owner, BoardRelation::Member, BoardRelation::None];

    fn allowed(relation: BoardRelation, action: BoardAction, requester: UserId) -> bool {
        authorize(requester, relation, &action).is_ok()
    }

    #[test]
    fn relation_from_lookups() {
        assert_eq!(BoardRelation::from_lookups(true, false), BoardRelation::Owner);
        assert_eq!(BoardRelation::from_lookups(true, true), BoardRelation::Owner);
        assert_eq!(BoardRelation::from_lookups(false, true), BoardRelation::Member);
        assert_eq!(BoardRelation::from_lookups(false, false), BoardRelation::None);
    }

    #[test]
    fn access_is_owner_or_member() {
        for is_owner in [true, false] {
            for is_member in [true, false] {
                let relation = BoardRelation::from_lookups(is_owner, is_member);
                assert_eq!(relation.has_access(), is_owner || is_member);
            }
        }
    }

    #[test]
    fn decision_table() {
        let me = UserId::new();
        let other = UserId::new();

        for relation in RELATIONS {
            let owner = relation == BoardRelation::Owner;
            let access = relation != BoardRelation::None;

            assert_eq!(allowed(relation, BoardAction::View, me), access);
            assert_eq!(allowed(relation, BoardAction::ListUsers, me), access);
            assert_eq!(allowed(relation, BoardAction::Delete, me), owner);
            assert_eq!(allowed(relation, BoardAction::Invite, me), owner);
            assert_eq!(allowed(relation, BoardAction::Remove { target: other }, me), owner);
            assert!(!allowed(relation, BoardAction::Remove { target: me }, me));
            assert_eq!(allowed(relation, BoardAction::Leave, me), !owner);
        }
    }

    #[test]
    fn denial_carries_stable_reason() {
        let me = UserId::new();
        let err = authorize(me, BoardRelation::Member, &BoardAction::Delete).unwrap_err();
        assert_eq!(err.reason(), "only the owner can delete this board");
        assert_eq!(
            err,
            AuthzError::Forbidden {
                action: "board.delete",
                reason: "only the owner can delete this board",
            }
        );

        let err = authorize(me, BoardRelation::Owner, &BoardAction::Leave).unwrap_err();
        assert_eq!(err.to_string(), "owner cannot leave their own board");
    }
}
