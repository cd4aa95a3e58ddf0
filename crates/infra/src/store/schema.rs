//! Relational schema, applied idempotently at startup.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS boards (
    id         UUID PRIMARY KEY,
    name       VARCHAR(255) NOT NULL,
    creator_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS boards_creator_id_idx ON boards (creator_id);

CREATE TABLE IF NOT EXISTS board_membership (
    board_id UUID NOT NULL REFERENCES boards (id) ON DELETE CASCADE,
    user_id  UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    PRIMARY KEY (board_id, user_id)
);

CREATE INDEX IF NOT EXISTS board_membership_user_id_idx ON board_membership (user_id);
"#;
