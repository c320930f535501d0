/// Constants of the cluster assignment and pattern extraction stages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringConfig {
    /// DBSCAN neighbourhood radius, in standardised feature space
    pub eps: f64,

    /// Points (including the point itself) a neighbourhood needs for a core point
    pub min_samples: usize,

    /// Discovered cluster labels start this far above the largest identified id
    pub cluster_gap: i64,

    /// Cluster id for unidentified events that could not be clustered at all
    pub skipped_cluster_id: i64,

    /// Minimum share of a cluster's events a slot needs to be kept as a pattern
    pub consistency_threshold: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples: 5,
            cluster_gap: 2,
            skipped_cluster_id: -1,
            consistency_threshold: 0.2,
        }
    }
}
