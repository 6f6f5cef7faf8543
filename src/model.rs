//! Data models for Mattermost entities and snapshot records.
//!
//! The API-facing structs are deserialized straight from Mattermost REST v4
//! responses; the record types are the normalized form that gets persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Sentinel written in place of any identity or status that failed to resolve.
pub const UNKNOWN: &str = "unknown";

/// A team the authenticated user belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A channel within a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Channel {
    /// Human-readable channel name: `display_name`, else `name`, else
    /// the `"unknown"` sentinel. Empty strings count as absent — the API
    /// returns `""` rather than omitting the field for unnamed channels.
    #[must_use]
    pub fn label(&self) -> &str {
        [self.display_name.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or(UNKNOWN)
    }
}

/// A channel membership entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
}

/// A user's presence status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: String,
    pub status: String,
}

/// A user profile (only the fields this tool needs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// One (team, channel, user) membership observation.
///
/// `capture_time` is the snapshot's logical timestamp: every record produced
/// by one run carries the same instant. Username and status are attached at
/// write time from the resolved [`Directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRecord {
    pub capture_time: DateTime<Utc>,
    pub team_id: String,
    pub team_name: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
}

/// The in-memory result of one collection pass: all membership records plus
/// the union of user ids seen across every channel.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub records: Vec<MembershipRecord>,
    pub user_ids: HashSet<String>,
}

impl Snapshot {
    #[must_use]
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            records: Vec::new(),
            user_ids: HashSet::new(),
        }
    }

    /// Record one user's membership in one channel.
    pub fn push(&mut self, team: &Team, channel: &Channel, user_id: String) {
        self.user_ids.insert(user_id.clone());
        self.records.push(MembershipRecord {
            capture_time: self.captured_at,
            team_id: team.id.clone(),
            team_name: team.name.clone(),
            channel_id: channel.id.clone(),
            channel_name: channel.label().to_string(),
            user_id,
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Resolved identity and presence indexes, built once from the resolver's
/// output and read-only during the write phase. Missing entries resolve to
/// the `"unknown"` sentinel rather than erroring: a user disappearing
/// between enumeration and resolution must not abort the snapshot.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    usernames: HashMap<String, String>,
    statuses: HashMap<String, String>,
}

impl Directory {
    #[must_use]
    pub fn new(usernames: HashMap<String, String>, statuses: HashMap<String, String>) -> Self {
        Self {
            usernames,
            statuses,
        }
    }

    /// Username for `user_id`, or `"unknown"`.
    #[must_use]
    pub fn username(&self, user_id: &str) -> &str {
        self.usernames.get(user_id).map_or(UNKNOWN, String::as_str)
    }

    /// Presence status for `user_id`, or `"unknown"`.
    #[must_use]
    pub fn status(&self, user_id: &str) -> &str {
        self.statuses.get(user_id).map_or(UNKNOWN, String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty() && self.statuses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(display_name: Option<&str>, name: Option<&str>) -> Channel {
        Channel {
            id: "c1".to_string(),
            name: name.map(str::to_string),
            display_name: display_name.map(str::to_string),
        }
    }

    #[test]
    fn channel_label_prefers_display_name() {
        assert_eq!(
            channel(Some("Town Square"), Some("town-square")).label(),
            "Town Square"
        );
        assert_eq!(channel(None, Some("town-square")).label(), "town-square");
        assert_eq!(channel(None, None).label(), UNKNOWN);
    }

    #[test]
    fn channel_label_treats_empty_as_absent() {
        assert_eq!(channel(Some(""), Some("town-square")).label(), "town-square");
        assert_eq!(channel(Some(""), Some("")).label(), UNKNOWN);
    }

    #[test]
    fn directory_falls_back_to_sentinel() {
        let dir = Directory::new(
            HashMap::from([("u1".to_string(), "alice".to_string())]),
            HashMap::from([("u1".to_string(), "online".to_string())]),
        );
        assert_eq!(dir.username("u1"), "alice");
        assert_eq!(dir.status("u1"), "online");
        assert_eq!(dir.username("u2"), UNKNOWN);
        assert_eq!(dir.status("u2"), UNKNOWN);
    }

    #[test]
    fn snapshot_records_share_capture_time() {
        let team = Team {
            id: "t1".to_string(),
            name: "eng".to_string(),
            display_name: None,
        };
        let chan = channel(Some("General"), None);

        let mut snapshot = Snapshot::new(Utc::now());
        snapshot.push(&team, &chan, "u1".to_string());
        snapshot.push(&team, &chan, "u2".to_string());

        assert_eq!(snapshot.records.len(), 2);
        assert!(
            snapshot
                .records
                .iter()
                .all(|r| r.capture_time == snapshot.captured_at)
        );
        assert_eq!(snapshot.user_ids.len(), 2);
    }

    #[test]
    fn api_types_deserialize_with_missing_optional_fields() {
        let chan: Channel = serde_json::from_str(r#"{"id": "c9"}"#).unwrap();
        assert_eq!(chan.label(), UNKNOWN);

        let team: Team = serde_json::from_str(r#"{"id": "t9", "name": "ops"}"#).unwrap();
        assert_eq!(team.name, "ops");
    }
}
