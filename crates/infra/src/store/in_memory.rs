//! In-memory store for tests/dev.
//!
//! One lock guards users, boards and memberships together, so every
//! conditional mutation (and every cascade) happens atomically, mirroring the
//! single-statement guarantees of the Postgres adapter.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use boardroom_auth::{CredentialStore, NewUser, User, UserSummary};
use boardroom_boards::{Board, BoardStore, BoardUsers, MutationOutcome, NewBoard};
use boardroom_core::{BoardId, StoreError, UserId};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    boards: HashMap<BoardId, Board>,
    memberships: BTreeSet<(BoardId, UserId)>,
}

impl State {
    fn owns(&self, board: BoardId, user: UserId) -> bool {
        self.boards
            .get(&board)
            .is_some_and(|b| b.is_owned_by(user))
    }

    fn sorted_boards<'a>(&self, boards: impl Iterator<Item = &'a Board>) -> Vec<Board> {
        let mut boards: Vec<Board> = boards.cloned().collect();
        boards.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        boards
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    /// Number of membership rows for a board (test/diagnostic helper).
    pub fn membership_count(&self, board: BoardId) -> usize {
        self.read()
            .map(|s| s.memberships.iter().filter(|(b, _)| *b == board).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Constraint("users_email_key".to_string()));
        }

        let user = User {
            id: user.id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let owned: Vec<BoardId> = state
            .boards
            .values()
            .filter(|b| b.creator_id == id)
            .map(|b| b.id)
            .collect();
        for board in &owned {
            state.boards.remove(board);
        }
        state
            .memberships
            .retain(|(b, u)| *u != id && !owned.contains(b));
        Ok(true)
    }
}

#[async_trait]
impl BoardStore for InMemoryStore {
    async fn insert_board(&self, board: NewBoard, now: DateTime<Utc>) -> Result<Board, StoreError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&board.creator_id) {
            return Err(StoreError::Constraint("boards_creator_id_fkey".to_string()));
        }

        let board = Board {
            id: board.id,
            name: board.name,
            creator_id: board.creator_id,
            created_at: now,
        };
        state.boards.insert(board.id, board.clone());
        Ok(board)
    }

    async fn find_board(&self, board: BoardId) -> Result<Option<Board>, StoreError> {
        Ok(self.read()?.boards.get(&board).cloned())
    }

    async fn is_owner(&self, board: BoardId, user: UserId) -> Result<bool, StoreError> {
        Ok(self.read()?.owns(board, user))
    }

    async fn is_member(&self, board: BoardId, user: UserId) -> Result<bool, StoreError> {
        Ok(self.read()?.memberships.contains(&(board, user)))
    }

    async fn owned_boards(&self, user: UserId) -> Result<Vec<Board>, StoreError> {
        let state = self.read()?;
        Ok(state.sorted_boards(state.boards.values().filter(|b| b.creator_id == user)))
    }

    async fn invited_boards(&self, user: UserId) -> Result<Vec<Board>, StoreError> {
        let state = self.read()?;
        let boards = state
            .memberships
            .iter()
            .filter(|(_, u)| *u == user)
            .filter_map(|(b, _)| state.boards.get(b));
        Ok(state.sorted_boards(boards))
    }

    async fn board_users(&self, board: BoardId) -> Result<Option<BoardUsers>, StoreError> {
        let state = self.read()?;
        let Some(board) = state.boards.get(&board) else {
            return Ok(None);
        };
        let Some(owner) = state.users.get(&board.creator_id) else {
            return Ok(None);
        };

        let mut invited: Vec<UserSummary> = state
            .memberships
            .iter()
            .filter(|(b, u)| *b == board.id && *u != board.creator_id)
            .filter_map(|(_, u)| state.users.get(u))
            .map(UserSummary::from)
            .collect();
        invited.sort_by(|a, b| a.email.cmp(&b.email));

        Ok(Some(BoardUsers {
            owner: UserSummary::from(owner),
            invited,
        }))
    }

    async fn delete_board(
        &self,
        board: BoardId,
        owner: UserId,
    ) -> Result<MutationOutcome, StoreError> {
        let mut state = self.write()?;
        if !state.owns(board, owner) {
            return Ok(MutationOutcome::PreconditionFailed);
        }

        state.boards.remove(&board);
        state.memberships.retain(|(b, _)| *b != board);
        Ok(MutationOutcome::Applied)
    }

    async fn add_member(
        &self,
        board: BoardId,
        owner: UserId,
        invitee: UserId,
    ) -> Result<MutationOutcome, StoreError> {
        let mut state = self.write()?;
        if !state.owns(board, owner) || invitee == owner {
            return Ok(MutationOutcome::PreconditionFailed);
        }
        if !state.users.contains_key(&invitee) {
            return Err(StoreError::Constraint(
                "board_membership_user_id_fkey".to_string(),
            ));
        }

        if state.memberships.insert((board, invitee)) {
            Ok(MutationOutcome::Applied)
        } else {
            Ok(MutationOutcome::Unchanged)
        }
    }

    async fn remove_member(
        &self,
        board: BoardId,
        owner: UserId,
        target: UserId,
    ) -> Result<MutationOutcome, StoreError> {
        let mut state = self.write()?;
        if !state.owns(board, owner) || target == owner {
            return Ok(MutationOutcome::PreconditionFailed);
        }

        if state.memberships.remove(&(board, target)) {
            Ok(MutationOutcome::Applied)
        } else {
            Ok(MutationOutcome::Unchanged)
        }
    }

    async fn leave(&self, board: BoardId, member: UserId) -> Result<MutationOutcome, StoreError> {
        let mut state = self.write()?;
        if state.owns(board, member) {
            return Ok(MutationOutcome::PreconditionFailed);
        }

        if state.memberships.remove(&(board, member)) {
            Ok(MutationOutcome::Applied)
        } else {
            Ok(MutationOutcome::Unchanged)
        }
    }
}
