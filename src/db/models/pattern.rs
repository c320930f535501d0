use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Number of committed events for one `(cluster, day, start time)` slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotCount {
    pub cluster_id: i64,
    pub day_of_week: Option<String>,
    pub start_time: NaiveTime,
    pub occurrence_count: i64,
}

/// One weekly slot of a cluster and how consistently the cluster uses it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPattern {
    pub cluster_id: i64,
    pub day_of_week: Option<String>,
    pub start_time: NaiveTime,
    pub occurrence_count: i64,
    pub total_count: i64,
    pub consistency_ratio: f64,
}
