use anyhow::{Context, Result};
use ndarray::Array2;

use crate::clustering::{
    config::ClusteringConfig,
    dbscan::{cluster_count, DensityClusterer, NOISE},
    encoding::{NameEncoding, Unidentified},
    features::{EventFeatures, FeatureVector, FEATURE_COUNT},
    scaler::standardize,
};
use crate::db::models::{ClusteredEvent, ProcessedEvent};
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

/// Events without a course id after density clustering.
#[derive(Debug, Clone, Default)]
pub struct UnidentifiedClusters {
    pub events: Vec<ClusteredEvent>,
    pub discovered_clusters: usize,
    /// Events DBSCAN left unclustered; they share the gap id `offset - 1`.
    pub noise_events: usize,
    /// Events given the skipped id because they had no complete feature vector.
    pub skipped_events: usize,
    /// First id of the discovered range, `max_identified_id + cluster_gap`.
    pub offset: i64,
}

/// Cluster events without a course id and move their labels above the
/// identified id range.
///
/// Discovered clusters become `label + max_identified_id + cluster_gap`.
/// DBSCAN noise is shifted by the same offset and so lands on the gap id just
/// below the discovered range. Events with a missing feature, or every event
/// when none has a complete feature vector, get `skipped_cluster_id`.
pub fn cluster_unidentified(
    events: Vec<ProcessedEvent>,
    max_identified_id: i64,
    config: &ClusteringConfig,
) -> Result<UnidentifiedClusters> {
    let offset = max_identified_id + config.cluster_gap;
    if events.is_empty() {
        return Ok(UnidentifiedClusters {
            offset,
            ..UnidentifiedClusters::default()
        });
    }

    let names: Vec<&str> = events.iter().map(|e| e.event_name.as_str()).collect();
    let (encoding, codes) = NameEncoding::<Unidentified>::fit_transform(&names);
    log_debug!(
        "Encoded {} distinct {} event names",
        encoding.len(),
        encoding.scope_label()
    );

    let vectors: Vec<Option<FeatureVector>> = events
        .iter()
        .zip(&codes)
        .map(|(event, code)| EventFeatures::encode(event).vector(code.value()))
        .collect();
    let complete: Vec<FeatureVector> = vectors.iter().flatten().copied().collect();

    if complete.is_empty() {
        log_info!(
            "No complete feature rows among {} unidentified events; assigning cluster {}",
            events.len(),
            config.skipped_cluster_id
        );
        let skipped_events = events.len();
        return Ok(UnidentifiedClusters {
            events: events
                .into_iter()
                .map(|event| ClusteredEvent {
                    event,
                    cluster_id: config.skipped_cluster_id,
                })
                .collect(),
            skipped_events,
            offset,
            ..UnidentifiedClusters::default()
        });
    }

    let records = Array2::from_shape_vec(
        (complete.len(), FEATURE_COUNT),
        complete.iter().flatten().copied().collect(),
    )
    .context("failed to shape feature rows")?;
    let scaled = standardize(records)?;
    let labels = DensityClusterer::new(config.eps, config.min_samples).fit_predict(&scaled)?;
    let discovered_clusters = cluster_count(&labels);
    let noise_events = labels.iter().filter(|label| **label == NOISE).count();

    let mut labels = labels.into_iter();
    let mut skipped_events = 0;
    let events: Vec<ClusteredEvent> = events
        .into_iter()
        .zip(vectors)
        .map(|(event, vector)| {
            // Labels line up with the complete rows only.
            let cluster_id = match vector.and_then(|_| labels.next()) {
                Some(label) => label + offset,
                None => {
                    skipped_events += 1;
                    config.skipped_cluster_id
                }
            };
            ClusteredEvent { event, cluster_id }
        })
        .collect();

    log_info!(
        "DBSCAN over {} rows: {} clusters, {} noise, {} skipped (offset {})",
        complete.len(),
        discovered_clusters,
        noise_events,
        skipped_events,
        offset
    );

    Ok(UnidentifiedClusters {
        events,
        discovered_clusters,
        noise_events,
        skipped_events,
        offset,
    })
}
