//! Global identity and presence resolution.
//!
//! After collection, the full set of distinct user ids is resolved in one
//! logical bulk status lookup plus one logical bulk identity lookup. This is
//! the single retry-avoidance point of the pipeline: if resolution fails, the
//! run continues and every record is written with `"unknown"` sentinels
//! instead of aborting.

use crate::client::ChatClient;
use crate::error::Result;
use crate::model::Directory;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{error, info};

/// Upper bound on ids per bulk call. The server accepts large lists, but we
/// chunk so a snapshot of any size stays within request limits; chunking is
/// transparent and the lookup remains one logical operation.
const MAX_IDS_PER_CALL: usize = 200;

/// Resolve usernames and presence statuses for the global user set.
///
/// Returns an empty [`Directory`] (so every lookup degrades to `"unknown"`)
/// if either bulk lookup fails; resolution failure never aborts the run.
pub async fn resolve_directory<C: ChatClient + Sync>(
    client: &C,
    user_ids: &HashSet<String>,
    api_delay: Duration,
) -> Directory {
    if user_ids.is_empty() {
        return Directory::default();
    }

    let ids: Vec<String> = user_ids.iter().cloned().collect();
    info!(
        "Fetching statuses and user details for {} unique users",
        ids.len()
    );

    match fetch_directory(client, &ids, api_delay).await {
        Ok(directory) => {
            info!("Successfully fetched statuses and user details");
            directory
        }
        Err(e) => {
            error!("Error fetching global user statuses/details, falling back to 'unknown': {e}");
            Directory::default()
        }
    }
}

async fn fetch_directory<C: ChatClient + Sync>(
    client: &C,
    ids: &[String],
    api_delay: Duration,
) -> Result<Directory> {
    let mut statuses = HashMap::new();
    for chunk in ids.chunks(MAX_IDS_PER_CALL) {
        for status in client.statuses_by_ids(chunk).await? {
            statuses.insert(status.user_id, status.status);
        }
        tokio::time::sleep(api_delay).await;
    }

    let mut usernames = HashMap::new();
    for chunk in ids.chunks(MAX_IDS_PER_CALL) {
        for user in client.users_by_ids(chunk).await? {
            usernames.insert(user.id, user.username);
        }
        tokio::time::sleep(api_delay).await;
    }

    Ok(Directory::new(usernames, statuses))
}
