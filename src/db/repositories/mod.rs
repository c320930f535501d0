pub mod events;
pub mod patterns;

pub(crate) const PROCESSED_EVENTS_TABLE: &str = "processed_events";
pub(crate) const CLUSTERED_MIRROR_TABLE: &str = "events_clustered";
pub(crate) const PATTERN_TABLE: &str = "cluster_key_details";
pub(crate) const CLUSTER_COLUMN: &str = "cluster_id";
