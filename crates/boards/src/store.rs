//! Persistence contract for boards and memberships.
//!
//! Reads always hit the store; there is no caching layer, so invites, removals
//! and leaves are visible to the very next request.
//!
//! Mutations are single atomic statements with the ownership predicate folded
//! in. They report [`MutationOutcome::PreconditionFailed`] instead of touching
//! anything when the predicate no longer holds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use boardroom_auth::BoardRelation;
use boardroom_core::{BoardId, StoreError, UserId};

use crate::{Board, BoardUsers, NewBoard};

/// Result of a conditional mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// A row was inserted or deleted.
    Applied,
    /// The predicate held but there was nothing to do (idempotent repeat).
    Unchanged,
    /// The ownership predicate did not hold at execution time.
    PreconditionFailed,
}

#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn insert_board(&self, board: NewBoard, now: DateTime<Utc>) -> Result<Board, StoreError>;

    async fn find_board(&self, board: BoardId) -> Result<Option<Board>, StoreError>;

    /// `true` iff `user` is the board's `creator_id`.
    async fn is_owner(&self, board: BoardId, user: UserId) -> Result<bool, StoreError>;

    /// `true` iff a membership row `(board, user)` exists.
    async fn is_member(&self, board: BoardId, user: UserId) -> Result<bool, StoreError>;

    /// Relation of `user` to `board`: owner OR member, from two independent reads.
    async fn relation(&self, board: BoardId, user: UserId) -> Result<BoardRelation, StoreError> {
        let is_owner = self.is_owner(board, user).await?;
        let is_member = if is_owner {
            false
        } else {
            self.is_member(board, user).await?
        };
        Ok(BoardRelation::from_lookups(is_owner, is_member))
    }

    /// Boards created by `user`, oldest first.
    async fn owned_boards(&self, user: UserId) -> Result<Vec<Board>, StoreError>;

    /// Boards `user` was invited to, oldest first.
    async fn invited_boards(&self, user: UserId) -> Result<Vec<Board>, StoreError>;

    /// Owner and invited users of a board; `None` if the board does not exist.
    async fn board_users(&self, board: BoardId) -> Result<Option<BoardUsers>, StoreError>;

    /// Delete the board if `owner` created it. Memberships cascade.
    async fn delete_board(&self, board: BoardId, owner: UserId)
    -> Result<MutationOutcome, StoreError>;

    /// Insert `(board, invitee)` if `owner` owns the board and `invitee` is not
    /// the owner. Existing rows are left alone.
    async fn add_member(
        &self,
        board: BoardId,
        owner: UserId,
        invitee: UserId,
    ) -> Result<MutationOutcome, StoreError>;

    /// Delete `(board, target)` if `owner` owns the board and `target` is not
    /// the owner.
    async fn remove_member(
        &self,
        board: BoardId,
        owner: UserId,
        target: UserId,
    ) -> Result<MutationOutcome, StoreError>;

    /// Delete the caller's own membership row, if any.
    async fn leave(&self, board: BoardId, member: UserId) -> Result<MutationOutcome, StoreError>;
}
