//! Board use cases.
//!
//! Every operation takes the caller's [`Identity`] explicitly, asks the
//! authorization engine first, and only then issues a mutating statement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument};

use boardroom_auth::{
    AuthError, AuthzError, BoardAction, BoardRelation, CredentialStore, Identity, UserSummary,
    authorize, normalize_email,
};
use boardroom_core::{BoardId, DomainError, StoreError, UserId};

use crate::{Board, BoardStore, BoardUsers, MutationOutcome, NewBoard};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl BoardError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BoardError::Unauthenticated => "unauthenticated",
            BoardError::Forbidden(_) => "forbidden",
            BoardError::NotFound(_) => "not_found",
            BoardError::Invalid(_) => "invalid",
            BoardError::Store(_) | BoardError::Internal(_) => "internal",
        }
    }
}

impl From<AuthzError> for BoardError {
    fn from(value: AuthzError) -> Self {
        BoardError::Forbidden(value.reason().to_string())
    }
}

impl From<DomainError> for BoardError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => BoardError::Invalid(msg),
        }
    }
}

impl From<AuthError> for BoardError {
    fn from(value: AuthError) -> Self {
        if value.is_unauthenticated() {
            return BoardError::Unauthenticated;
        }
        match value {
            AuthError::Store(e) => BoardError::Store(e),
            AuthError::Invalid(msg) => BoardError::Invalid(msg),
            AuthError::EmailTaken => BoardError::Invalid(AuthError::EmailTaken.to_string()),
            other => BoardError::Internal(other.to_string()),
        }
    }
}

/// Board operations over the persisted store.
#[derive(Clone)]
pub struct BoardService {
    boards: Arc<dyn BoardStore>,
    users: Arc<dyn CredentialStore>,
}

impl BoardService {
    pub fn new(boards: Arc<dyn BoardStore>, users: Arc<dyn CredentialStore>) -> Self {
        Self { boards, users }
    }

    /// Look up the caller's relation and run the authorization engine.
    async fn check(
        &self,
        identity: &Identity,
        board: BoardId,
        action: BoardAction,
    ) -> Result<BoardRelation, BoardError> {
        let relation = self.boards.relation(board, identity.id).await?;
        authorize(identity.id, relation, &action).map_err(|e| {
            debug!(
                user_id = %identity.id,
                board_id = %board,
                %action,
                reason = e.reason(),
                "denied"
            );
            BoardError::from(e)
        })?;
        Ok(relation)
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn create_board(
        &self,
        identity: &Identity,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Board, BoardError> {
        let new_board = NewBoard::new(name, identity.id)?;
        let board = self.boards.insert_board(new_board, now).await?;
        info!(board_id = %board.id, "board created");
        Ok(board)
    }

    pub async fn get_board(
        &self,
        identity: &Identity,
        board: BoardId,
    ) -> Result<Board, BoardError> {
        self.check(identity, board, BoardAction::View).await?;
        self.boards
            .find_board(board)
            .await?
            .ok_or_else(|| BoardError::Forbidden(no_access()))
    }

    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn delete_board(
        &self,
        identity: &Identity,
        board: BoardId,
    ) -> Result<(), BoardError> {
        self.check(identity, board, BoardAction::Delete).await?;

        match self.boards.delete_board(board, identity.id).await? {
            MutationOutcome::Applied => {
                info!("board deleted");
                Ok(())
            }
            MutationOutcome::Unchanged | MutationOutcome::PreconditionFailed => {
                Err(BoardError::Forbidden(no_access()))
            }
        }
    }

    /// Invite a registered user by exact email match.
    ///
    /// Re-inviting an existing member succeeds without change. The owner
    /// inviting themselves is rejected and never produces a membership row.
    #[instrument(skip(self, identity, email), fields(user_id = %identity.id))]
    pub async fn invite(
        &self,
        identity: &Identity,
        board: BoardId,
        email: &str,
    ) -> Result<UserSummary, BoardError> {
        self.check(identity, board, BoardAction::Invite).await?;

        let email = normalize_email(email)?;
        let invitee = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| BoardError::NotFound("user not found".to_string()))?;

        if invitee.id == identity.id {
            return Err(BoardError::Invalid(
                "owner cannot invite themselves to their own board".to_string(),
            ));
        }

        match self.boards.add_member(board, identity.id, invitee.id).await? {
            MutationOutcome::Applied => info!(invitee = %invitee.id, "user invited"),
            MutationOutcome::Unchanged => debug!(invitee = %invitee.id, "already a member"),
            MutationOutcome::PreconditionFailed => {
                return Err(BoardError::Forbidden(
                    "only the owner can invite users to this board".to_string(),
                ));
            }
        }

        Ok(UserSummary::from(&invitee))
    }

    /// Remove a member. Removing a non-member is a successful no-op.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn remove_user(
        &self,
        identity: &Identity,
        board: BoardId,
        target: UserId,
    ) -> Result<(), BoardError> {
        self.check(identity, board, BoardAction::Remove { target }).await?;

        match self.boards.remove_member(board, identity.id, target).await? {
            MutationOutcome::Applied => {
                info!("user removed");
                Ok(())
            }
            MutationOutcome::Unchanged => Ok(()),
            MutationOutcome::PreconditionFailed => Err(BoardError::Forbidden(
                "only the owner can remove users from this board".to_string(),
            )),
        }
    }

    /// Drop the caller's own membership. Leaving twice is a successful no-op.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn leave(&self, identity: &Identity, board: BoardId) -> Result<(), BoardError> {
        self.check(identity, board, BoardAction::Leave).await?;

        if self.boards.leave(board, identity.id).await? == MutationOutcome::Applied {
            info!("left board");
        }
        Ok(())
    }

    pub async fn can_access(
        &self,
        identity: &Identity,
        board: BoardId,
    ) -> Result<bool, BoardError> {
        Ok(self.boards.relation(board, identity.id).await?.has_access())
    }

    pub async fn my_boards(&self, identity: &Identity) -> Result<Vec<Board>, BoardError> {
        Ok(self.boards.owned_boards(identity.id).await?)
    }

    pub async fn invited_boards(&self, identity: &Identity) -> Result<Vec<Board>, BoardError> {
        Ok(self.boards.invited_boards(identity.id).await?)
    }

    pub async fn board_users(
        &self,
        identity: &Identity,
        board: BoardId,
    ) -> Result<BoardUsers, BoardError> {
        self.check(identity, board, BoardAction::ListUsers).await?;
        self.boards
            .board_users(board)
            .await?
            .ok_or_else(|| BoardError::Forbidden(no_access()))
    }
}

fn no_access() -> String {
    "no access to this board".to_string()
}
