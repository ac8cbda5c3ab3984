//! Database schema and migrations.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table tracks which ones have run.

/// Database migrations.
///
/// Each migration is a SQL script executed in its own transaction.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password    TEXT NOT NULL,           -- Argon2id PHC string
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    last_login  TEXT
);
"#,
    // v2: graphical passwords, one per user
    r#"
CREATE TABLE graphical_passwords (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    salt        TEXT NOT NULL,           -- hex
    hash        TEXT NOT NULL,           -- hex digest of salt || encoded sequence
    algorithm   TEXT NOT NULL DEFAULT 'sha256',
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v3: refresh tokens for API sessions
    r#"
CREATE TABLE refresh_tokens (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token       TEXT NOT NULL UNIQUE,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    revoked_at  TEXT
);

CREATE INDEX idx_refresh_tokens_user_id ON refresh_tokens(user_id);
CREATE INDEX idx_refresh_tokens_expires_at ON refresh_tokens(expires_at);
"#,
];
