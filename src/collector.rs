//! Snapshot collection: per-team, per-channel membership enumeration.
//!
//! One collection pass walks every team and channel the authenticated user
//! can see, accumulating `(team, channel, user)` tuples and the global set of
//! distinct user ids. Failures are isolated: a team whose channel listing
//! fails is skipped, a channel whose member listing fails is skipped, and the
//! rest of the run proceeds.

use crate::client::ChatClient;
use crate::error::Result;
use crate::model::{Channel, Snapshot, Team};
use crate::paginate;
use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info};

/// Tuning for one collection pass.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Members fetched per page.
    pub page_size: u32,
    /// Pause after every API page fetch.
    pub api_delay: Duration,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            page_size: 200,
            api_delay: Duration::from_millis(1),
        }
    }
}

/// Collect the full membership snapshot for one run.
///
/// The capture instant is taken once here; every record in the returned
/// snapshot shares it. The team listing itself is load-bearing — if it
/// fails there is nothing to isolate and the error propagates.
///
/// # Errors
///
/// Returns an error only if the initial team enumeration fails.
pub async fn collect_snapshot<C: ChatClient + Sync>(
    client: &C,
    opts: &CollectOptions,
) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new(Utc::now());

    let teams = client.user_teams().await?;
    info!("Found {} teams", teams.len());

    for team in &teams {
        info!("Processing team: {} ({})", team.name, team.id);
        let channels = match client.user_channels(&team.id).await {
            Ok(channels) => channels,
            Err(e) => {
                error!(
                    "Error fetching channels for team {} ({}), skipping team: {e}",
                    team.id, team.name
                );
                continue;
            }
        };
        info!("Found {} channels in team {}", channels.len(), team.name);

        for channel in &channels {
            if let Err(e) = collect_channel(client, team, channel, opts, &mut snapshot).await {
                error!(
                    "Error processing channel {} ({}), skipping channel: {e}",
                    channel.id,
                    channel.label()
                );
            }
        }
    }

    info!(
        "Collected {} membership records across {} unique users",
        snapshot.records.len(),
        snapshot.user_ids.len()
    );
    Ok(snapshot)
}

/// Enumerate one channel's members and fold them into the snapshot.
async fn collect_channel<C: ChatClient + Sync>(
    client: &C,
    team: &Team,
    channel: &Channel,
    opts: &CollectOptions,
    snapshot: &mut Snapshot,
) -> Result<()> {
    debug!(
        "Processing channel: {} ({}) in team {}",
        channel.label(),
        channel.id,
        team.name
    );

    let members = paginate::fetch_all(opts.page_size, opts.api_delay, |page, per_page| {
        client.channel_members_page(&channel.id, page, per_page)
    })
    .await?;

    // Membership pages can repeat a user across page boundaries; records are
    // per distinct user within the channel.
    let channel_user_ids: HashSet<String> = members.into_iter().map(|m| m.user_id).collect();

    if channel_user_ids.is_empty() {
        debug!("No members found in channel {} ({})", channel.label(), channel.id);
        return Ok(());
    }

    for user_id in channel_user_ids {
        snapshot.push(team, channel, user_id);
    }
    Ok(())
}
