use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking, so running them on every
/// startup is a no-op once the schema is current.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: members, sessions, messages
-- IF NOT EXISTS keeps databases created by the legacy operator usable.

CREATE TABLE IF NOT EXISTS members (
    member        TEXT PRIMARY KEY,
    display_name  TEXT
);

CREATE TABLE IF NOT EXISTS sessions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    member        TEXT NOT NULL,
    pc_name       TEXT NOT NULL,
    login_time    INTEGER NOT NULL,
    logout_time   INTEGER,
    FOREIGN KEY (member) REFERENCES members(member)
);

CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    member     TEXT    NOT NULL,
    sender     TEXT    NOT NULL,
    content    TEXT    NOT NULL,
    timestamp  INTEGER NOT NULL,
    read       INTEGER DEFAULT 0,
    FOREIGN KEY (member) REFERENCES members(member)
);
",
        ),
        M::up(
            "-- Migration 2: message kind and lookup indexes

ALTER TABLE messages ADD COLUMN kind TEXT NOT NULL DEFAULT 'chat';

CREATE INDEX IF NOT EXISTS idx_messages_member_time ON messages(member, timestamp);
CREATE INDEX IF NOT EXISTS idx_messages_unread ON messages(member, sender, read);
CREATE INDEX IF NOT EXISTS idx_sessions_member ON sessions(member);
",
        ),
    ])
}
