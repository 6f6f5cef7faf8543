//! Idempotent TimescaleDB schema provisioning.
//!
//! Brings the `channel_user_status` table to its desired shape before any
//! write: base table, hypertable partitioning on `timestamp`, compression
//! settings, and a compression policy. Safe to run repeatedly; re-runs must
//! never duplicate objects.
//!
//! Fault tolerance is tiered. Extension enablement and compression steps are
//! best effort (the extension may already be enabled, or the role may lack
//! privilege), while table creation and hypertable conversion are fatal —
//! inserting into an unpartitioned table would succeed silently and defeat
//! the point of the store.

use crate::error::{Result, SnapError};
use sqlx::PgConnection;
use tracing::{error, info, warn};

/// Name of the persisted snapshot table.
pub const TABLE: &str = "channel_user_status";

/// Schema tuning for one invocation.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    /// Compress chunks older than this many days.
    pub compress_after_days: u32,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            compress_after_days: 1,
        }
    }
}

const CREATE_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS channel_user_status (
    id SERIAL,
    timestamp TIMESTAMPTZ NOT NULL,
    team_id TEXT NOT NULL,
    team_name TEXT NOT NULL,
    channel_id TEXT NOT NULL,
    channel_name TEXT NOT NULL,
    user_id TEXT NOT NULL,
    username TEXT NOT NULL,
    status TEXT NOT NULL,
    PRIMARY KEY (id, timestamp)
);
";

const CREATE_HYPERTABLE_SQL: &str =
    "SELECT create_hypertable('channel_user_status', 'timestamp', if_not_exists => TRUE);";

// Segment by the columns occupancy queries group on; order by timestamp
// descending so recent data decompresses first.
const COMPRESSION_SETTINGS_SQL: &str = "
ALTER TABLE channel_user_status
SET (
    timescaledb.compress = 'on',
    timescaledb.compress_segmentby = 'team_id, channel_id, user_id',
    timescaledb.compress_orderby = 'timestamp DESC'
);
";

/// Provision the snapshot table. Runs once per invocation, before any write.
///
/// Each statement runs in its own implicit transaction, so a failed
/// best-effort step leaves nothing open to roll back.
///
/// # Errors
///
/// Returns [`SnapError::Provision`] if table creation or hypertable
/// conversion fails; all other steps degrade to warnings.
pub async fn provision(conn: &mut PgConnection, config: &SchemaConfig) -> Result<()> {
    // Enabling the extension may require superuser; a failure here is fine
    // if the extension is already installed database-wide.
    match sqlx::query("CREATE EXTENSION IF NOT EXISTS timescaledb CASCADE;")
        .execute(&mut *conn)
        .await
    {
        Ok(_) => info!("TimescaleDB extension ensured"),
        Err(e) => warn!(
            "Could not ensure TimescaleDB extension (may already be enabled, or insufficient privilege): {e}"
        ),
    }

    sqlx::query(CREATE_TABLE_SQL)
        .execute(&mut *conn)
        .await
        .map_err(|e| SnapError::provision("create table", e))?;
    info!("Table '{TABLE}' schema ensured");

    match sqlx::query(CREATE_HYPERTABLE_SQL).execute(&mut *conn).await {
        Ok(_) => info!("Table '{TABLE}' converted to hypertable or already is one"),
        Err(e) if is_already_hypertable(&e) => {
            info!("Table '{TABLE}' is already a hypertable");
        }
        Err(e) => {
            error!("Error converting table to hypertable: {e}");
            return Err(SnapError::provision("create hypertable", e));
        }
    }

    match sqlx::query(COMPRESSION_SETTINGS_SQL)
        .execute(&mut *conn)
        .await
    {
        Ok(_) => info!("Compression settings applied to '{TABLE}'"),
        Err(e) => warn!("Could not apply compression settings (may already be set): {e}"),
    }

    let policy_sql = format!(
        "SELECT add_compression_policy('{TABLE}', INTERVAL '{} days', if_not_exists => TRUE);",
        config.compress_after_days
    );
    match sqlx::query(&policy_sql).execute(&mut *conn).await {
        Ok(_) => info!("Compression policy added or already exists for '{TABLE}'"),
        Err(e) if is_duplicate_policy(&e) => {
            info!("Compression policy for '{TABLE}' already exists");
        }
        Err(e) => warn!("Could not add compression policy: {e}"),
    }

    Ok(())
}

/// SQLSTATE of a database-reported error, if this was one.
fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn is_already_hypertable(err: &sqlx::Error) -> bool {
    classify_already_hypertable(sqlstate(err).as_deref(), &err.to_string())
}

fn is_duplicate_policy(err: &sqlx::Error) -> bool {
    classify_duplicate_policy(sqlstate(err).as_deref(), &err.to_string())
}

/// `create_hypertable` raises `duplicate_table` (42P07) when the table is
/// already a hypertable. The message match is a compatibility shim for
/// server versions that report a generic code.
pub(crate) fn classify_already_hypertable(code: Option<&str>, message: &str) -> bool {
    code == Some("42P07") || message.to_lowercase().contains("already a hypertable")
}

/// `add_compression_policy` raises `duplicate_object` (42710) for an
/// existing policy; the message match is the same compatibility shim.
pub(crate) fn classify_duplicate_policy(code: Option<&str>, message: &str) -> bool {
    code == Some("42710")
        || message
            .to_lowercase()
            .contains("already has a compression policy")
}
