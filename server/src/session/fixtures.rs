//! Fake-session generator for tests and manual UI testing.
//!
//! Nothing here is used by the registry itself; sessions built here enter a
//! registry only through `SessionRegistry::seed`.

use chrono::{DateTime, Local};

use crate::session::{client_id, ClientSession, SessionStatus};

/// Member name shared by all virtual devices.
pub const VIRTUAL_MEMBER: &str = "VIRTUAL";

/// `online` connected-looking devices followed by `offline` ones, named
/// PC-01, PC-02, ... All are flagged virtual so the liveness sweep skips them.
pub fn virtual_devices(online: usize, offline: usize, now: DateTime<Local>) -> Vec<ClientSession> {
    (1..=online + offline)
        .map(|n| {
            let pc_name = format!("PC-{:02}", n);
            let mut session = ClientSession::new(VIRTUAL_MEMBER, &pc_name, now);
            session.is_virtual = true;
            if n > online {
                session.status = SessionStatus::Offline;
                session.last_seen_at = None;
            }
            session
        })
        .collect()
}

/// A non-virtual session in the given state, without a transport.
pub fn fake_session(
    member: &str,
    pc_name: &str,
    status: SessionStatus,
    last_seen_at: Option<DateTime<Local>>,
) -> ClientSession {
    ClientSession {
        id: client_id(member, pc_name),
        member: member.to_string(),
        pc_name: pc_name.to_string(),
        status,
        connection: None,
        last_seen_at,
        last_activity_at: None,
        persisted_session_id: None,
        is_virtual: false,
        history: Default::default(),
    }
}
