//! Client-list snapshot sent to the operator UI.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::db::store::StoreResult;
use crate::session::{ClientSession, SessionStatus};

/// One row of the `update-client-list` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub client_id: String,
    pub pc_name: String,
    pub member: String,
    /// "online" or "offline"; a forced shutdown reports "offline"
    pub status: &'static str,
    pub last_activity: Option<DateTime<Local>>,
    pub forced_shutdown: bool,
    pub unread_count: i64,
}

/// Build the snapshot, online entries first, then most recent activity.
/// `unread` is called once per distinct member.
pub fn summarize<'a, I, F>(sessions: I, mut unread: F) -> StoreResult<Vec<ClientSummary>>
where
    I: IntoIterator<Item = &'a ClientSession>,
    F: FnMut(&str) -> StoreResult<i64>,
{
    let mut unread_by_member: HashMap<String, i64> = HashMap::new();
    let mut list = Vec::new();

    for session in sessions {
        let unread_count = match unread_by_member.get(&session.member) {
            Some(count) => *count,
            None => {
                let count = unread(&session.member)?;
                unread_by_member.insert(session.member.clone(), count);
                count
            }
        };
        list.push(ClientSummary {
            client_id: session.id.clone(),
            pc_name: session.pc_name.clone(),
            member: session.member.clone(),
            status: if session.status.is_online() { "online" } else { "offline" },
            last_activity: session.last_activity_at,
            forced_shutdown: session.status == SessionStatus::ForcedShutdown,
            unread_count,
        });
    }

    list.sort_by(compare_for_display);
    Ok(list)
}

fn compare_for_display(a: &ClientSummary, b: &ClientSummary) -> Ordering {
    let online_first = (b.status == "online").cmp(&(a.status == "online"));
    online_first
        .then_with(|| b.last_activity.cmp(&a.last_activity))
        .then_with(|| a.client_id.cmp(&b.client_id))
}
