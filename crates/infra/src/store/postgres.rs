//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Constraint` |
//! | Database (foreign key violation) | `23503` | `Constraint` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | N/A | `Backend` |
//!
//! ## Atomicity
//!
//! Every mutation is one statement. The ownership predicate is part of the
//! statement itself (a CTE over `boards`), so a check made by the service just
//! before cannot be invalidated by a concurrent request in between.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;
use uuid::Uuid;

use boardroom_auth::{CredentialStore, NewUser, User, UserSummary};
use boardroom_boards::{Board, BoardStore, BoardUsers, MutationOutcome, NewBoard};
use boardroom_core::{BoardId, StoreError, UserId};

use super::schema::SCHEMA;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and apply the (idempotent) schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn summary_from_row(row: &PgRow) -> Result<UserSummary, sqlx::Error> {
    Ok(UserSummary {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
    })
}

fn board_from_row(row: &PgRow) -> Result<Board, sqlx::Error> {
    Ok(Board {
        id: BoardId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        creator_id: UserId::from_uuid(row.try_get::<Uuid, _>("creator_id")?),
        created_at: row.try_get("created_at")?,
    })
}

/// Interpret the `(allowed, changed)` pair returned by the conditional CTEs.
fn conditional_outcome(row: &PgRow, operation: &str) -> Result<MutationOutcome, StoreError> {
    let allowed: bool = row
        .try_get("allowed")
        .map_err(|e| map_sqlx_error(operation, e))?;
    let changed: bool = row
        .try_get("changed")
        .map_err(|e| map_sqlx_error(operation, e))?;

    Ok(match (allowed, changed) {
        (false, _) => MutationOutcome::PreconditionFailed,
        (true, true) => MutationOutcome::Applied,
        (true, false) => MutationOutcome::Unchanged,
    })
}

#[async_trait]
impl CredentialStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(now)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        user_from_row(&row).map_err(|e| map_sqlx_error("insert_user", e))
    }

    #[instrument(skip(self), err)]
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user", e))
    }

    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_email", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BoardStore for PostgresStore {
    #[instrument(skip(self, board), fields(board_id = %board.id), err)]
    async fn insert_board(&self, board: NewBoard, now: DateTime<Utc>) -> Result<Board, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO boards (id, name, creator_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, creator_id, created_at
            "#,
        )
        .bind(board.id.as_uuid())
        .bind(&board.name)
        .bind(board.creator_id.as_uuid())
        .bind(now)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_board", e))?;

        board_from_row(&row).map_err(|e| map_sqlx_error("insert_board", e))
    }

    #[instrument(skip(self), err)]
    async fn find_board(&self, board: BoardId) -> Result<Option<Board>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, creator_id, created_at
            FROM boards
            WHERE id = $1
            "#,
        )
        .bind(board.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_board", e))?;

        row.as_ref()
            .map(board_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_board", e))
    }

    #[instrument(skip(self), err)]
    async fn is_owner(&self, board: BoardId, user: UserId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM boards WHERE id = $1 AND creator_id = $2)",
        )
        .bind(board.as_uuid())
        .bind(user.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("is_owner", e))
    }

    #[instrument(skip(self), err)]
    async fn is_member(&self, board: BoardId, user: UserId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM board_membership WHERE board_id = $1 AND user_id = $2)",
        )
        .bind(board.as_uuid())
        .bind(user.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("is_member", e))
    }

    #[instrument(skip(self), err)]
    async fn owned_boards(&self, user: UserId) -> Result<Vec<Board>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, creator_id, created_at
            FROM boards
            WHERE creator_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("owned_boards", e))?;

        rows.iter()
            .map(board_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("owned_boards", e))
    }

    #[instrument(skip(self), err)]
    async fn invited_boards(&self, user: UserId) -> Result<Vec<Board>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.name, b.creator_id, b.created_at
            FROM boards b
            JOIN board_membership m ON m.board_id = b.id
            WHERE m.user_id = $1
            ORDER BY b.created_at ASC, b.id ASC
            "#,
        )
        .bind(user.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("invited_boards", e))?;

        rows.iter()
            .map(board_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("invited_boards", e))
    }

    #[instrument(skip(self), err)]
    async fn board_users(&self, board: BoardId) -> Result<Option<BoardUsers>, StoreError> {
        let owner = sqlx::query(
            r#"
            SELECT u.id, u.email, u.name
            FROM users u
            JOIN boards b ON b.creator_id = u.id
            WHERE b.id = $1
            "#,
        )
        .bind(board.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("board_users", e))?;

        let Some(owner) = owner else {
            return Ok(None);
        };
        let owner = summary_from_row(&owner).map_err(|e| map_sqlx_error("board_users", e))?;

        let rows = sqlx::query(
            r#"
            SELECT u.id, u.email, u.name
            FROM users u
            JOIN board_membership m ON m.user_id = u.id
            WHERE m.board_id = $1 AND u.id <> $2
            ORDER BY u.email ASC
            "#,
        )
        .bind(board.as_uuid())
        .bind(owner.id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("board_users", e))?;

        let invited = rows
            .iter()
            .map(summary_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("board_users", e))?;

        Ok(Some(BoardUsers { owner, invited }))
    }

    #[instrument(skip(self), err)]
    async fn delete_board(
        &self,
        board: BoardId,
        owner: UserId,
    ) -> Result<MutationOutcome, StoreError> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1 AND creator_id = $2")
            .bind(board.as_uuid())
            .bind(owner.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_board", e))?;

        Ok(if result.rows_affected() > 0 {
            MutationOutcome::Applied
        } else {
            MutationOutcome::PreconditionFailed
        })
    }

    #[instrument(skip(self), err)]
    async fn add_member(
        &self,
        board: BoardId,
        owner: UserId,
        invitee: UserId,
    ) -> Result<MutationOutcome, StoreError> {
        let row = sqlx::query(
            r#"
            WITH owned AS (
                SELECT id FROM boards
                WHERE id = $1 AND creator_id = $2 AND creator_id <> $3
                FOR KEY SHARE
            ),
            inserted AS (
                INSERT INTO board_membership (board_id, user_id)
                SELECT id, $3 FROM owned
                ON CONFLICT DO NOTHING
                RETURNING 1
            )
            SELECT EXISTS (SELECT 1 FROM owned) AS allowed,
                   EXISTS (SELECT 1 FROM inserted) AS changed
            "#,
        )
        .bind(board.as_uuid())
        .bind(owner.as_uuid())
        .bind(invitee.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_member", e))?;

        conditional_outcome(&row, "add_member")
    }

    #[instrument(skip(self), err)]
    async fn remove_member(
        &self,
        board: BoardId,
        owner: UserId,
        target: UserId,
    ) -> Result<MutationOutcome, StoreError> {
        let row = sqlx::query(
            r#"
            WITH owned AS (
                SELECT id FROM boards
                WHERE id = $1 AND creator_id = $2 AND creator_id <> $3
            ),
            deleted AS (
                DELETE FROM board_membership m
                USING owned o
                WHERE m.board_id = o.id AND m.user_id = $3
                RETURNING 1
            )
            SELECT EXISTS (SELECT 1 FROM owned) AS allowed,
                   EXISTS (SELECT 1 FROM deleted) AS changed
            "#,
        )
        .bind(board.as_uuid())
        .bind(owner.as_uuid())
        .bind(target.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_member", e))?;

        conditional_outcome(&row, "remove_member")
    }

    #[instrument(skip(self), err)]
    async fn leave(&self, board: BoardId, member: UserId) -> Result<MutationOutcome, StoreError> {
        let row = sqlx::query(
            r#"
            WITH owned AS (
                SELECT id FROM boards WHERE id = $1 AND creator_id = $2
            ),
            deleted AS (
                DELETE FROM board_membership
                WHERE board_id = $1 AND user_id = $2
                  AND NOT EXISTS (SELECT 1 FROM owned)
                RETURNING 1
            )
            SELECT NOT EXISTS (SELECT 1 FROM owned) AS allowed,
                   EXISTS (SELECT 1 FROM deleted) AS changed
            "#,
        )
        .bind(board.as_uuid())
        .bind(member.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("leave", e))?;

        conditional_outcome(&row, "leave")
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Run with `DATABASE_URL=postgres://... cargo test -p boardroom-infra -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use boardroom_auth::BoardRelation;

    async fn store() -> PostgresStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PostgresStore::connect(&url).await.unwrap()
    }

    async fn user(store: &PostgresStore) -> UserId {
        let email = format!("{}@pg.test", Uuid::now_v7());
        let new_user = NewUser::new(&email, None, "unused-hash".to_string()).unwrap();
        store.insert_user(new_user, Utc::now()).await.unwrap().id
    }

    async fn board(store: &PostgresStore, owner: UserId) -> BoardId {
        let new_board = NewBoard::new("pg", owner).unwrap();
        store.insert_board(new_board, Utc::now()).await.unwrap().id
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn add_member_checks_ownership_in_the_statement() {
        let s = store().await;
        let (owner, member, stranger) = (user(&s).await, user(&s).await, user(&s).await);
        let b = board(&s, owner).await;

        assert_eq!(
            s.add_member(b, stranger, member).await.unwrap(),
            MutationOutcome::PreconditionFailed
        );
        assert!(!s.is_member(b, member).await.unwrap());

        assert_eq!(s.add_member(b, owner, member).await.unwrap(), MutationOutcome::Applied);
        assert_eq!(s.add_member(b, owner, member).await.unwrap(), MutationOutcome::Unchanged);
        assert_eq!(s.relation(b, member).await.unwrap(), BoardRelation::Member);

        assert_eq!(
            s.add_member(b, owner, owner).await.unwrap(),
            MutationOutcome::PreconditionFailed
        );
        assert!(!s.is_member(b, owner).await.unwrap());

        assert_eq!(
            s.add_member(BoardId::new(), owner, member).await.unwrap(),
            MutationOutcome::PreconditionFailed
        );
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn remove_member_is_owner_only_and_idempotent() {
        let s = store().await;
        let (owner, member) = (user(&s).await, user(&s).await);
        let b = board(&s, owner).await;
        s.add_member(b, owner, member).await.unwrap();

        assert_eq!(
            s.remove_member(b, member, member).await.unwrap(),
            MutationOutcome::PreconditionFailed
        );
        assert!(s.is_member(b, member).await.unwrap());

        assert_eq!(
            s.remove_member(b, owner, owner).await.unwrap(),
            MutationOutcome::PreconditionFailed
        );

        assert_eq!(s.remove_member(b, owner, member).await.unwrap(), MutationOutcome::Applied);
        assert_eq!(s.remove_member(b, owner, member).await.unwrap(), MutationOutcome::Unchanged);
        assert_eq!(s.relation(b, member).await.unwrap(), BoardRelation::None);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn leave_refuses_owner_and_is_idempotent() {
        let s = store().await;
        let (owner, member) = (user(&s).await, user(&s).await);
        let b = board(&s, owner).await;
        s.add_member(b, owner, member).await.unwrap();

        assert_eq!(s.leave(b, owner).await.unwrap(), MutationOutcome::PreconditionFailed);
        assert_eq!(s.relation(b, owner).await.unwrap(), BoardRelation::Owner);

        assert_eq!(s.leave(b, member).await.unwrap(), MutationOutcome::Applied);
        assert_eq!(s.leave(b, member).await.unwrap(), MutationOutcome::Unchanged);
        assert!(!s.is_member(b, member).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn deletes_cascade_to_memberships() {
        let s = store().await;
        let (owner, member) = (user(&s).await, user(&s).await);
        let b = board(&s, owner).await;
        s.add_member(b, owner, member).await.unwrap();

        assert_eq!(
            s.delete_board(b, member).await.unwrap(),
            MutationOutcome::PreconditionFailed
        );
        assert_eq!(s.delete_board(b, owner).await.unwrap(), MutationOutcome::Applied);
        assert!(s.find_board(b).await.unwrap().is_none());
        assert!(!s.is_member(b, member).await.unwrap());
        assert!(s.invited_boards(member).await.unwrap().is_empty());

        let b = board(&s, owner).await;
        s.add_member(b, owner, member).await.unwrap();
        assert!(s.delete_user(owner).await.unwrap());
        assert!(s.find_board(b).await.unwrap().is_none());
        assert!(s.find_user(owner).await.unwrap().is_none());
    }

    #[test]
    fn sqlx_errors_map_to_store_errors() {
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }
}
