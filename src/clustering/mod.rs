pub mod config;
pub mod dbscan;
pub mod encoding;
pub mod features;
pub mod labeler;
pub mod merge;
pub mod partition;
pub mod patterns;
pub mod scaler;
pub mod unidentified;

pub use config::ClusteringConfig;
pub use labeler::{label_identified, IdentifiedClusters};
pub use merge::merge_clusters;
pub use partition::{partition_by_course, Partitioned};
pub use patterns::{dominant_patterns, score_slots};
pub use unidentified::{cluster_unidentified, UnidentifiedClusters};

use anyhow::{Context, Result};

use crate::db::models::{ClusteredEvent, ProcessedEvent};

/// Cluster assignment for one full event set, before anything is persisted.
#[derive(Debug, Clone, Default)]
pub struct ClusterRun {
    pub events: Vec<ClusteredEvent>,
    pub identified_events: usize,
    pub unidentified_events: usize,
    pub identified_clusters: usize,
    pub max_identified_id: i64,
    pub discovered_clusters: usize,
    pub noise_events: usize,
    pub skipped_events: usize,
}

/// Partition, label, cluster and merge `events`.
///
/// Both partitions are processed whole and in order; the unidentified
/// offset depends on the identified result, so the steps stay sequential.
pub fn assign_clusters(
    events: Vec<ProcessedEvent>,
    config: &ClusteringConfig,
) -> Result<ClusterRun> {
    let Partitioned {
        identified,
        unidentified,
    } = partition_by_course(events);
    let identified_events = identified.len();
    let unidentified_events = unidentified.len();

    let identified = label_identified(identified);
    let unidentified = cluster_unidentified(unidentified, identified.max_cluster_id, config)
        .context("failed to cluster unidentified events")?;

    Ok(ClusterRun {
        identified_events,
        unidentified_events,
        identified_clusters: identified.cluster_count,
        max_identified_id: identified.max_cluster_id,
        discovered_clusters: unidentified.discovered_clusters,
        noise_events: unidentified.noise_events,
        skipped_events: unidentified.skipped_events,
        events: merge_clusters(identified.events, unidentified.events),
    })
}
