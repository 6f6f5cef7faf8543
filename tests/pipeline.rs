//! Integration tests for the snapshot pipeline.
//!
//! These tests drive collect → resolve → enrich end to end against an
//! in-memory chat platform, verifying:
//! - Membership records and the global user set
//! - Per-channel failure isolation
//! - Sentinel degradation when resolution fails
//! - The single shared capture instant

use async_trait::async_trait;
use chansnap::client::ChatClient;
use chansnap::collector::{CollectOptions, collect_snapshot};
use chansnap::error::{Result, SnapError};
use chansnap::model::{Channel, Directory, Member, Team, User, UserStatus, UNKNOWN};
use chansnap::resolver::resolve_directory;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// In-memory Mattermost: teams, channels, members, and a user directory,
/// with switches to fail individual channels or the bulk lookups.
#[derive(Default)]
struct TestServer {
    teams: Vec<Team>,
    channels: HashMap<String, Vec<Channel>>,
    members: HashMap<String, Vec<String>>,
    users: HashMap<String, (String, String)>,
    failing_channels: HashSet<String>,
    fail_resolution: bool,
}

impl TestServer {
    fn team(mut self, id: &str, name: &str) -> Self {
        self.teams.push(Team {
            id: id.to_string(),
            name: name.to_string(),
            display_name: None,
        });
        self
    }

    fn channel(mut self, team_id: &str, channel_id: &str, display_name: &str, members: &[&str]) -> Self {
        self.channels
            .entry(team_id.to_string())
            .or_default()
            .push(Channel {
                id: channel_id.to_string(),
                name: Some(channel_id.to_string()),
                display_name: Some(display_name.to_string()),
            });
        self.members.insert(
            channel_id.to_string(),
            members.iter().map(|s| (*s).to_string()).collect(),
        );
        self
    }

    fn user(mut self, id: &str, username: &str, status: &str) -> Self {
        self.users
            .insert(id.to_string(), (username.to_string(), status.to_string()));
        self
    }
}

#[async_trait]
impl ChatClient for TestServer {
    async fn user_teams(&self) -> Result<Vec<Team>> {
        Ok(self.teams.clone())
    }

    async fn user_channels(&self, team_id: &str) -> Result<Vec<Channel>> {
        Ok(self.channels.get(team_id).cloned().unwrap_or_default())
    }

    async fn channel_members_page(
        &self,
        channel_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Member>> {
        if self.failing_channels.contains(channel_id) {
            return Err(SnapError::api_status("/members", 500));
        }
        let all = self.members.get(channel_id).cloned().unwrap_or_default();
        let start = (page * per_page) as usize;
        Ok(all
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .map(|user_id| Member { user_id })
            .collect())
    }

    async fn statuses_by_ids(&self, user_ids: &[String]) -> Result<Vec<UserStatus>> {
        if self.fail_resolution {
            return Err(SnapError::api_status("/users/status/ids", 500));
        }
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                self.users.get(id).map(|(_, status)| UserStatus {
                    user_id: id.clone(),
                    status: status.clone(),
                })
            })
            .collect())
    }

    async fn users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>> {
        if self.fail_resolution {
            return Err(SnapError::api_status("/users/ids", 500));
        }
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                self.users.get(id).map(|(username, _)| User {
                    id: id.clone(),
                    username: username.clone(),
                })
            })
            .collect())
    }
}

fn opts() -> CollectOptions {
    CollectOptions {
        page_size: 200,
        api_delay: Duration::ZERO,
    }
}

/// Enrich records the way the writer does, without a database.
fn enriched(
    records: &[chansnap::model::MembershipRecord],
    directory: &Directory,
) -> Vec<(String, String, String)> {
    records
        .iter()
        .map(|r| {
            (
                r.user_id.clone(),
                directory.username(&r.user_id).to_string(),
                directory.status(&r.user_id).to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn two_teams_with_overlapping_membership() {
    // Team A has {u1, u2}; team B has {u2, u3}. Resolution knows u1 and u3
    // but not u2, so both u2 rows degrade to the sentinel.
    let server = TestServer::default()
        .team("tA", "alpha")
        .team("tB", "beta")
        .channel("tA", "cA", "General A", &["u1", "u2"])
        .channel("tB", "cB", "General B", &["u2", "u3"])
        .user("u1", "alice", "online")
        .user("u3", "carol", "away");

    let snapshot = collect_snapshot(&server, &opts()).await.unwrap();
    assert_eq!(snapshot.records.len(), 4);
    assert_eq!(
        snapshot.user_ids,
        HashSet::from(["u1".to_string(), "u2".to_string(), "u3".to_string()])
    );

    // Every record carries the one capture instant.
    assert!(
        snapshot
            .records
            .iter()
            .all(|r| r.capture_time == snapshot.captured_at)
    );

    let directory = resolve_directory(&server, &snapshot.user_ids, Duration::ZERO).await;
    let rows = enriched(&snapshot.records, &directory);

    let u2_rows: Vec<_> = rows.iter().filter(|(id, _, _)| id == "u2").collect();
    assert_eq!(u2_rows.len(), 2);
    assert!(u2_rows.iter().all(|(_, name, status)| name == UNKNOWN && status == UNKNOWN));

    let u1_row = rows.iter().find(|(id, _, _)| id == "u1").unwrap();
    assert_eq!(u1_row.1, "alice");
    assert_eq!(u1_row.2, "online");
}

#[tokio::test]
async fn failed_channel_leaves_no_records_and_spares_the_rest() {
    let mut server = TestServer::default()
        .team("tA", "alpha")
        .channel("tA", "cGood", "Good", &["u1"])
        .channel("tA", "cBad", "Bad", &["u2"])
        .channel("tA", "cAlso", "Also Good", &["u3"]);
    server.failing_channels.insert("cBad".to_string());

    let snapshot = collect_snapshot(&server, &opts()).await.unwrap();

    assert_eq!(snapshot.records.len(), 2);
    assert!(snapshot.records.iter().all(|r| r.channel_id != "cBad"));
    // Channels after the failing one are unaffected.
    assert!(snapshot.records.iter().any(|r| r.channel_id == "cAlso"));
}

#[tokio::test]
async fn total_resolution_failure_degrades_every_record() {
    let mut server = TestServer::default()
        .team("tA", "alpha")
        .channel("tA", "cA", "General", &["u1", "u2"])
        .user("u1", "alice", "online");
    server.fail_resolution = true;

    let snapshot = collect_snapshot(&server, &opts()).await.unwrap();
    let directory = resolve_directory(&server, &snapshot.user_ids, Duration::ZERO).await;

    // Record count is unchanged; every field degrades to the sentinel.
    assert_eq!(snapshot.records.len(), 2);
    let rows = enriched(&snapshot.records, &directory);
    assert!(rows.iter().all(|(_, name, status)| name == UNKNOWN && status == UNKNOWN));
}

#[tokio::test]
async fn channel_names_follow_display_name_policy() {
    let server = TestServer::default()
        .team("tA", "alpha")
        .channel("tA", "cA", "Town Square", &["u1"]);

    let snapshot = collect_snapshot(&server, &opts()).await.unwrap();
    assert_eq!(snapshot.records[0].channel_name, "Town Square");
    assert_eq!(snapshot.records[0].team_name, "alpha");
}

#[tokio::test]
async fn large_channel_is_paginated_completely() {
    let ids: Vec<String> = (0..450).map(|i| format!("u{i}")).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let server = TestServer::default()
        .team("tA", "alpha")
        .channel("tA", "cBig", "All Hands", &id_refs);

    let snapshot = collect_snapshot(&server, &opts()).await.unwrap();
    assert_eq!(snapshot.records.len(), 450);
    assert_eq!(snapshot.user_ids.len(), 450);
}
