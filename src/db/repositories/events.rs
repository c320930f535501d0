use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use log::{debug, info};
use rusqlite::{params, Row};
use serde::Serialize;

use super::{CLUSTERED_MIRROR_TABLE, CLUSTER_COLUMN, PROCESSED_EVENTS_TABLE};
use crate::db::{
    helpers::{
        column_exists, ensure_integer_column, format_date, format_time, parse_date, parse_time,
        table_exists,
    },
    models::{ClusterAssignment, ProcessedEvent, RawEvent, SlotCount},
    Database,
};

/// Outcome of persisting one run's cluster assignments.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WriteSummary {
    pub rows_updated: usize,
    /// Assignments whose eid no longer exists in `processed_events`.
    pub rows_unmatched: usize,
    pub rows_mirrored: usize,
    pub column_added: bool,
}

fn row_to_raw_event(row: &Row) -> Result<RawEvent> {
    let eid: i64 = row.get("eid")?;
    let date: String = row.get("date")?;
    let start_time: String = row.get("starttime")?;
    let end_time: String = row.get("endtime")?;

    Ok(RawEvent {
        eid,
        event_name: row.get("event_name")?,
        date: parse_date(&date, "date", eid)?,
        start_time: parse_time(&start_time, "starttime", eid)?,
        end_time: parse_time(&end_time, "endtime", eid)?,
        room_id: row.get("rid")?,
    })
}

fn row_to_processed_event(row: &Row) -> Result<ProcessedEvent> {
    let eid: i64 = row.get("eid")?;
    let date: String = row.get("date")?;
    let start_time: String = row.get("starttime")?;
    let end_time: String = row.get("endtime")?;

    Ok(ProcessedEvent {
        eid,
        event_name: row.get("event_name")?,
        date: parse_date(&date, "date", eid)?,
        start_time: parse_time(&start_time, "starttime", eid)?,
        end_time: parse_time(&end_time, "endtime", eid)?,
        room_id: row.get("rid")?,
        day_of_week: row.get("day_of_week")?,
        time_slot: row.get("time_slot")?,
        course_id: row.get("course_id")?,
    })
}

impl Database {
    /// Load every raw reservation ordered by eid.
    pub async fn load_raw_events(&self) -> Result<Vec<RawEvent>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT eid, event_name, date, starttime, endtime, rid
                 FROM events
                 ORDER BY eid ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_raw_event(row)?);
            }

            Ok(events)
        })
        .await
    }

    /// Load the clustering input ordered by eid.
    ///
    /// Any malformed date or time fails the whole load with an
    /// [`InputError`](crate::db::InputError) in the error chain.
    pub async fn load_processed_events(&self) -> Result<Vec<ProcessedEvent>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT eid, event_name, date, starttime, endtime, rid, day_of_week, time_slot, course_id
                 FROM processed_events
                 ORDER BY eid ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_processed_event(row)?);
            }

            Ok(events)
        })
        .await
    }

    /// Replace the contents of `processed_events` in one transaction.
    ///
    /// Existing rows (and their cluster ids) are removed; the new rows start
    /// without a cluster.
    pub async fn replace_processed_events(&self, events: &[ProcessedEvent]) -> Result<usize> {
        let events = events.to_vec();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open processed_events transaction")?;

            tx.execute("DELETE FROM processed_events", [])
                .context("failed to clear processed_events")?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO processed_events (
                        eid,
                        event_name,
                        date,
                        starttime,
                        endtime,
                        rid,
                        day_of_week,
                        time_slot,
                        course_id
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;

                for event in &events {
                    stmt.execute(params![
                        event.eid,
                        event.event_name,
                        format_date(&event.date),
                        format_time(&event.start_time),
                        format_time(&event.end_time),
                        event.room_id,
                        event.day_of_week,
                        event.time_slot,
                        event.course_id,
                    ])
                    .with_context(|| format!("failed to insert processed event {}", event.eid))?;
                }
            }

            tx.commit().context("failed to commit processed_events")?;
            Ok(events.len())
        })
        .await
    }

    /// Persist cluster ids keyed by eid.
    ///
    /// The `cluster_id` column is created first if missing. All updates,
    /// including the optional `events_clustered` mirror, share one
    /// transaction: a failing row rolls back every row.
    pub async fn write_cluster_assignments(
        &self,
        assignments: &[ClusterAssignment],
        mirror: bool,
    ) -> Result<WriteSummary> {
        let assignments = assignments.to_vec();
        self.execute(move |conn| {
            let mut summary = WriteSummary {
                column_added: ensure_integer_column(conn, PROCESSED_EVENTS_TABLE, CLUSTER_COLUMN)?,
                ..WriteSummary::default()
            };

            let mirror = mirror && table_exists(conn, CLUSTERED_MIRROR_TABLE)?;
            if mirror {
                ensure_integer_column(conn, CLUSTERED_MIRROR_TABLE, CLUSTER_COLUMN)?;
            }

            let tx = conn
                .transaction()
                .context("failed to open cluster assignment transaction")?;

            {
                let mut stmt = tx.prepare(
                    "UPDATE processed_events
                     SET cluster_id = ?1
                     WHERE eid = ?2",
                )?;
                for assignment in &assignments {
                    let changed = stmt
                        .execute(params![assignment.cluster_id, assignment.eid])
                        .with_context(|| {
                            format!("failed to assign cluster to event {}", assignment.eid)
                        })?;
                    if changed == 0 {
                        summary.rows_unmatched += 1;
                    } else {
                        summary.rows_updated += changed;
                    }
                }
            }

            if mirror {
                let mut stmt = tx.prepare(
                    "UPDATE events_clustered
                     SET cluster_id = ?1
                     WHERE eid = ?2",
                )?;
                for assignment in &assignments {
                    summary.rows_mirrored += stmt
                        .execute(params![assignment.cluster_id, assignment.eid])
                        .with_context(|| {
                            format!("failed to mirror cluster of event {}", assignment.eid)
                        })?;
                }
            }

            tx.commit().context("failed to commit cluster assignments")?;

            info!(
                "Committed cluster ids: {} updated, {} unmatched, {} mirrored",
                summary.rows_updated, summary.rows_unmatched, summary.rows_mirrored
            );
            Ok(summary)
        })
        .await
    }

    /// Committed cluster ids keyed by eid, for events that have one.
    pub async fn get_cluster_assignments(&self) -> Result<Vec<ClusterAssignment>> {
        self.execute(|conn| {
            if !column_exists(conn, PROCESSED_EVENTS_TABLE, CLUSTER_COLUMN)? {
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(
                "SELECT eid, cluster_id
                 FROM processed_events
                 WHERE cluster_id IS NOT NULL
                 ORDER BY eid ASC",
            )?;
            let assignments = stmt
                .query_map([], |row| {
                    Ok(ClusterAssignment {
                        eid: row.get(0)?,
                        cluster_id: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(assignments)
        })
        .await
    }

    /// Count committed events per `(cluster_id, day_of_week, starttime)`.
    ///
    /// Rows without a cluster are left out. Start times are grouped on their
    /// parsed value, so `14:00` and `14:00:00` count as one slot. A NULL day
    /// forms its own slot so per-cluster sums still match the cluster's event
    /// count. Slots come back ordered by cluster, day and start time.
    pub async fn cluster_slot_counts(&self) -> Result<Vec<SlotCount>> {
        self.execute(|conn| {
            if !column_exists(conn, PROCESSED_EVENTS_TABLE, CLUSTER_COLUMN)? {
                debug!("processed_events has no cluster_id column yet; no slots to count");
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(
                "SELECT eid, cluster_id, day_of_week, starttime
                 FROM processed_events
                 WHERE cluster_id IS NOT NULL
                 ORDER BY eid ASC",
            )?;

            let mut counts: BTreeMap<(i64, Option<String>, NaiveTime), i64> = BTreeMap::new();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let eid: i64 = row.get("eid")?;
                let cluster_id: i64 = row.get("cluster_id")?;
                let start_time: String = row.get("starttime")?;
                let start_time = parse_time(&start_time, "starttime", eid)
                    .with_context(|| format!("failed to count slot of cluster {cluster_id}"))?;

                *counts
                    .entry((cluster_id, row.get("day_of_week")?, start_time))
                    .or_insert(0) += 1;
            }

            Ok(counts
                .into_iter()
                .map(|((cluster_id, day_of_week, start_time), occurrence_count)| SlotCount {
                    cluster_id,
                    day_of_week,
                    start_time,
                    occurrence_count,
                })
                .collect())
        })
        .await
    }
}
