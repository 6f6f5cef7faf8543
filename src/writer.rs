//! Batched persistence of enriched membership records.
//!
//! Records are inserted one at a time but committed in fixed-size batches:
//! a transaction per `batch_size` insertions plus one final commit for the
//! remainder. Batches are independent — a database error aborts the run,
//! and everything committed so far stays durable. One crash loses at most
//! one batch of progress, and a large snapshot never holds a giant
//! transaction open.

use crate::error::Result;
use crate::model::{Directory, MembershipRecord};
use sqlx::{Connection, PgConnection};
use tracing::info;

const INSERT_SQL: &str = "
INSERT INTO channel_user_status
    (timestamp, team_id, team_name, channel_id, channel_name, user_id, username, status)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
";

/// Number of commits a run of `total` records issues at the given batch size.
#[must_use]
pub fn commit_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}

/// Persist all records, enriching each with the resolved username and status
/// (or the `"unknown"` sentinel). Returns the number of records written.
///
/// # Errors
///
/// Any database error aborts the run; previously committed batches remain
/// persisted.
pub async fn write_snapshot(
    conn: &mut PgConnection,
    records: &[MembershipRecord],
    directory: &Directory,
    batch_size: usize,
) -> Result<usize> {
    if records.is_empty() {
        info!("No records were processed or inserted");
        return Ok(0);
    }

    let batch_size = batch_size.max(1);
    info!(
        "Preparing to insert {} records across {} commits",
        records.len(),
        commit_count(records.len(), batch_size)
    );

    let mut written = 0usize;
    for batch in records.chunks(batch_size) {
        let mut tx = conn.begin().await?;
        for record in batch {
            sqlx::query(INSERT_SQL)
                .bind(record.capture_time)
                .bind(&record.team_id)
                .bind(&record.team_name)
                .bind(&record.channel_id)
                .bind(&record.channel_name)
                .bind(&record.user_id)
                .bind(directory.username(&record.user_id))
                .bind(directory.status(&record.user_id))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        written += batch.len();
        info!(
            "Committed batch of {} records. Total processed: {written}",
            batch.len()
        );
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_count_ceils() {
        assert_eq!(commit_count(0, 100), 0);
        assert_eq!(commit_count(1, 100), 1);
        assert_eq!(commit_count(100, 100), 1);
        assert_eq!(commit_count(101, 100), 2);
        assert_eq!(commit_count(250, 100), 3);
        assert_eq!(commit_count(300, 100), 3);
    }

    #[test]
    fn commit_count_tolerates_zero_batch_size() {
        assert_eq!(commit_count(10, 0), 10);
    }

    #[test]
    fn batch_boundaries_cover_every_record_exactly_once() {
        let sizes: Vec<usize> = (0..250)
            .collect::<Vec<u32>>()
            .chunks(100)
            .map(<[u32]>::len)
            .collect();
        assert_eq!(sizes, [100, 100, 50]);
        assert_eq!(sizes.len(), commit_count(250, 100));
    }
}
