//! Density-based clustering (DBSCAN) over standardised feature rows.

use anyhow::{Context, Result};
use linfa::prelude::*;
use linfa_clustering::Dbscan;
use linfa_nn::{distance::L2Dist, LinearSearch};
use ndarray::Array2;

/// Label of a row that is not density-reachable from any core row.
pub const NOISE: i64 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct DensityClusterer {
    eps: f64,
    min_samples: usize,
}

impl DensityClusterer {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    /// Label every row. Clusters are numbered from 0 in order of their first
    /// core row; border rows keep the first cluster that reaches them.
    pub fn fit_predict(&self, records: &Array2<f64>) -> Result<Vec<i64>> {
        if records.nrows() == 0 {
            return Ok(Vec::new());
        }

        // Linear search keeps large runs of identical rows out of a kd-tree.
        let memberships = Dbscan::params_with(self.min_samples, L2Dist, LinearSearch::new())
            .tolerance(self.eps)
            .transform(records)
            .with_context(|| {
                format!(
                    "invalid DBSCAN parameters (eps {}, min_samples {})",
                    self.eps, self.min_samples
                )
            })?;

        Ok(memberships
            .iter()
            .map(|membership| membership.map_or(NOISE, |label| label as i64))
            .collect())
    }
}

/// Number of distinct non-noise labels.
pub fn cluster_count(labels: &[i64]) -> usize {
    labels
        .iter()
        .filter(|label| **label != NOISE)
        .max()
        .map_or(0, |max| (*max + 1) as usize)
}
