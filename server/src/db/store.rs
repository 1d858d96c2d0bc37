//! Persistence gateway for members, session spans and message history.
//!
//! All functions are synchronous and hold the connection lock for a single
//! statement or transaction. Callers inside async handlers wrap them in
//! `spawn_blocking`; the dispatcher calls them inline.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::MutexGuard;

use crate::chat::messages::Message;
use crate::db::models::{MemberRow, SessionRecord, StoredMessage};
use crate::db::DbPool;

/// Error type for persistence gateway operations.
#[derive(Debug)]
pub enum StoreError {
    /// A previous holder of the connection lock panicked.
    LockPoisoned,
    Sqlite(rusqlite::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::LockPoisoned => write!(f, "database lock poisoned"),
            StoreError::Sqlite(e) => write!(f, "sqlite error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::LockPoisoned => None,
            StoreError::Sqlite(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

fn lock(db: &DbPool) -> StoreResult<MutexGuard<'_, Connection>> {
    db.lock().map_err(|_| StoreError::LockPoisoned)
}

fn insert_member_if_absent(
    conn: &Connection,
    member: &str,
    display_name: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO members (member, display_name) VALUES (?1, ?2)",
        params![member, display_name],
    )?;
    Ok(())
}

/// Create the member row if it does not exist yet. An existing row (and its
/// display name) is never overwritten.
pub fn upsert_member(db: &DbPool, member: &str, display_name: Option<&str>) -> StoreResult<()> {
    let conn = lock(db)?;
    insert_member_if_absent(&conn, member, display_name)?;
    Ok(())
}

pub fn get_member(db: &DbPool, member: &str) -> StoreResult<Option<MemberRow>> {
    let conn = lock(db)?;
    let row = conn
        .query_row(
            "SELECT member, display_name FROM members WHERE member = ?1",
            params![member],
            |row| {
                Ok(MemberRow {
                    member: row.get(0)?,
                    display_name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Open a session span and return its record id.
pub fn open_session(db: &DbPool, member: &str, pc_name: &str, login_time: i64) -> StoreResult<i64> {
    let mut conn = lock(db)?;
    let tx = conn.transaction()?;
    insert_member_if_absent(&tx, member, None)?;
    tx.execute(
        "INSERT INTO sessions (member, pc_name, login_time) VALUES (?1, ?2, ?3)",
        params![member, pc_name, login_time],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

/// Set the logout time of a session span. A span that is already closed
/// keeps its original logout time.
pub fn close_session(db: &DbPool, session_id: i64, logout_time: i64) -> StoreResult<()> {
    let conn = lock(db)?;
    conn.execute(
        "UPDATE sessions SET logout_time = ?2 WHERE id = ?1 AND logout_time IS NULL",
        params![session_id, logout_time],
    )?;
    Ok(())
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        member: row.get(1)?,
        pc_name: row.get(2)?,
        login_time: row.get(3)?,
        logout_time: row.get(4)?,
    })
}

pub fn get_session_record(db: &DbPool, session_id: i64) -> StoreResult<Option<SessionRecord>> {
    let conn = lock(db)?;
    let record = conn
        .query_row(
            "SELECT id, member, pc_name, login_time, logout_time FROM sessions WHERE id = ?1",
            params![session_id],
            session_from_row,
        )
        .optional()?;
    Ok(record)
}

/// Session spans of a member, most recent first.
pub fn sessions_for_member(db: &DbPool, member: &str) -> StoreResult<Vec<SessionRecord>> {
    let conn = lock(db)?;
    let mut stmt = conn.prepare(
        "SELECT id, member, pc_name, login_time, logout_time
           FROM sessions
          WHERE member = ?1
          ORDER BY login_time DESC, id DESC",
    )?;
    let records = stmt
        .query_map(params![member], session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Persist a message for a member, creating the member row if needed.
/// Returns the message row id.
pub fn insert_message(db: &DbPool, member: &str, message: &Message) -> StoreResult<i64> {
    let mut conn = lock(db)?;
    let tx = conn.transaction()?;
    insert_member_if_absent(&tx, member, None)?;
    tx.execute(
        "INSERT INTO messages (member, sender, kind, content, timestamp, read)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            member,
            message.sender.as_str(),
            message.kind.as_str(),
            message.content,
            message.timestamp.timestamp(),
            message.read,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

/// Message history of a member, most recent first.
pub fn get_messages_by_member(
    db: &DbPool,
    member: &str,
    limit: u32,
) -> StoreResult<Vec<StoredMessage>> {
    let conn = lock(db)?;
    let mut stmt = conn.prepare(
        "SELECT id, member, sender, kind, content, timestamp, COALESCE(read, 0)
           FROM messages
          WHERE member = ?1
          ORDER BY timestamp DESC, id DESC
          LIMIT ?2",
    )?;
    let messages = stmt
        .query_map(params![member, limit], |row| {
            Ok(StoredMessage {
                id: row.get(0)?,
                member: row.get(1)?,
                sender: row.get(2)?,
                kind: row.get(3)?,
                content: row.get(4)?,
                timestamp: row.get(5)?,
                read: row.get::<_, i64>(6)? != 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

/// Mark every client-authored message of a member as read.
/// Returns how many rows changed; repeating the call changes nothing.
pub fn mark_messages_read(db: &DbPool, member: &str) -> StoreResult<usize> {
    let conn = lock(db)?;
    let changed = conn.execute(
        "UPDATE messages SET read = 1
          WHERE member = ?1 AND sender = 'client' AND COALESCE(read, 0) = 0",
        params![member],
    )?;
    Ok(changed)
}

pub fn get_unread_count(db: &DbPool, member: &str) -> StoreResult<i64> {
    let conn = lock(db)?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM messages
          WHERE member = ?1 AND sender = 'client' AND COALESCE(read, 0) = 0",
        params![member],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Every member that ever connected or has history, sorted.
pub fn get_all_members(db: &DbPool) -> StoreResult<Vec<String>> {
    let conn = lock(db)?;
    let mut stmt = conn.prepare("SELECT member FROM members ORDER BY member")?;
    let members = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(members)
}
