//! One batch run: cluster assignment, persistence, then pattern extraction.

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::clustering::{assign_clusters, dominant_patterns, score_slots, ClusteringConfig};
use crate::db::{ClusterAssignment, Database};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub event_count: usize,
    pub identified_events: usize,
    pub unidentified_events: usize,
    pub identified_clusters: usize,
    pub max_identified_id: i64,
    pub discovered_clusters: usize,
    pub noise_events: usize,
    pub skipped_events: usize,
    pub rows_updated: usize,
    pub rows_unmatched: usize,
    pub rows_mirrored: usize,
    pub pattern_rows: usize,
    pub patterns_retained: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub clustering: ClusteringConfig,
    /// Also update `events_clustered` when that table exists.
    pub mirror_clustered_events: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            clustering: ClusteringConfig::default(),
            mirror_clustered_events: true,
        }
    }
}

/// Recompute every cluster id and the pattern table from `processed_events`.
///
/// Stages run strictly in order against the same handle. Cluster ids are
/// committed before the slot counts are read back, and nothing is written
/// when loading or clustering fails.
pub async fn run_pipeline(db: &Database, options: &PipelineOptions) -> Result<PipelineReport> {
    let run_id = Uuid::new_v4();
    log_info!("Cluster run {run_id} starting on {}", db.path().display());

    let events = db
        .load_processed_events()
        .await
        .context("failed to load processed events")?;
    let event_count = events.len();

    let run = assign_clusters(events, &options.clustering)?;
    log_info!(
        "Run {run_id}: {} identified events in {} clusters, {} unidentified events in {} clusters",
        run.identified_events,
        run.identified_clusters,
        run.unidentified_events,
        run.discovered_clusters
    );

    let assignments: Vec<ClusterAssignment> =
        run.events.iter().map(|event| event.assignment()).collect();
    let written = db
        .write_cluster_assignments(&assignments, options.mirror_clustered_events)
        .await
        .context("failed to persist cluster assignments")?;
    if written.rows_unmatched > 0 {
        log_warn!(
            "Run {run_id}: {} assignments matched no processed event",
            written.rows_unmatched
        );
    }

    let slots = db
        .cluster_slot_counts()
        .await
        .context("failed to count cluster slots")?;
    let scored = score_slots(&slots);
    let retained = dominant_patterns(&scored, options.clustering.consistency_threshold);
    db.replace_cluster_patterns(&retained)
        .await
        .context("failed to replace cluster patterns")?;

    log_info!(
        "Run {run_id}: kept {} of {} slot patterns",
        retained.len(),
        scored.len()
    );

    Ok(PipelineReport {
        run_id,
        event_count,
        identified_events: run.identified_events,
        unidentified_events: run.unidentified_events,
        identified_clusters: run.identified_clusters,
        max_identified_id: run.max_identified_id,
        discovered_clusters: run.discovered_clusters,
        noise_events: run.noise_events,
        skipped_events: run.skipped_events,
        rows_updated: written.rows_updated,
        rows_unmatched: written.rows_unmatched,
        rows_mirrored: written.rows_mirrored,
        pattern_rows: scored.len(),
        patterns_retained: retained.len(),
    })
}
