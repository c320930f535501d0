//! Weekly slot consistency per cluster.

use std::collections::HashMap;

use crate::db::models::{ClusterPattern, SlotCount};

/// Attach each slot's share of its cluster's events.
///
/// The returned rows keep the input order and include every slot, so the
/// occurrence counts of one cluster always add up to its `total_count`.
pub fn score_slots(slots: &[SlotCount]) -> Vec<ClusterPattern> {
    let mut totals: HashMap<i64, i64> = HashMap::new();
    for slot in slots {
        *totals.entry(slot.cluster_id).or_insert(0) += slot.occurrence_count;
    }

    slots
        .iter()
        .map(|slot| {
            let total_count = totals.get(&slot.cluster_id).copied().unwrap_or(0);
            let consistency_ratio = if total_count > 0 {
                slot.occurrence_count as f64 / total_count as f64
            } else {
                0.0
            };
            ClusterPattern {
                cluster_id: slot.cluster_id,
                day_of_week: slot.day_of_week.clone(),
                start_time: slot.start_time,
                occurrence_count: slot.occurrence_count,
                total_count,
                consistency_ratio,
            }
        })
        .collect()
}

/// Slots whose consistency is at least `threshold`, ordered by cluster and
/// then by descending occurrence count.
pub fn dominant_patterns(scored: &[ClusterPattern], threshold: f64) -> Vec<ClusterPattern> {
    let mut kept: Vec<ClusterPattern> = scored
        .iter()
        .filter(|pattern| pattern.consistency_ratio >= threshold)
        .cloned()
        .collect();

    kept.sort_by(|a, b| {
        a.cluster_id
            .cmp(&b.cluster_id)
            .then(b.occurrence_count.cmp(&a.occurrence_count))
            .then_with(|| a.day_of_week.cmp(&b.day_of_week))
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
    kept
}
