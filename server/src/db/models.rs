/// Database row types.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.
use serde::Serialize;

/// Member record in the members table
#[derive(Debug, Clone)]
pub struct MemberRow {
    pub member: String,
    pub display_name: Option<String>,
}

/// Connect/disconnect span of one member on one PC.
/// Times are epoch seconds; `logout_time` stays NULL while the span is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: i64,
    pub member: String,
    pub pc_name: String,
    pub login_time: i64,
    pub logout_time: Option<i64>,
}

/// Persisted message row
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: i64,
    pub member: String,
    pub sender: String,
    pub kind: String,
    pub content: String,
    pub timestamp: i64,
    pub read: bool,
}
