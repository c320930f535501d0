use anyhow::{Context, Result};
use rusqlite::{params, Row};

use super::PATTERN_TABLE;
use crate::db::{
    helpers::{format_time, parse_pattern_time, table_exists},
    models::ClusterPattern,
    Database,
};

fn row_to_pattern(row: &Row) -> Result<ClusterPattern> {
    let cluster_id: i64 = row.get("cluster_id")?;
    let start_time: String = row.get("start_time")?;

    Ok(ClusterPattern {
        cluster_id,
        day_of_week: row.get("day_of_week")?,
        start_time: parse_pattern_time(&start_time, "start_time", cluster_id)?,
        occurrence_count: row.get("occurrence_count")?,
        total_count: row.get("total_count")?,
        consistency_ratio: row.get("consistency_ratio")?,
    })
}

impl Database {
    /// Drop and rebuild `cluster_key_details` with `patterns`.
    ///
    /// Readers see either the previous table or the complete new one.
    pub async fn replace_cluster_patterns(&self, patterns: &[ClusterPattern]) -> Result<usize> {
        let patterns = patterns.to_vec();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open pattern transaction")?;

            tx.execute_batch(
                "DROP TABLE IF EXISTS cluster_key_details;
                 CREATE TABLE cluster_key_details (
                    cluster_id INTEGER NOT NULL,
                    day_of_week TEXT,
                    start_time TEXT NOT NULL,
                    occurrence_count INTEGER NOT NULL,
                    total_count INTEGER NOT NULL,
                    consistency_ratio REAL NOT NULL
                 );",
            )
            .context("failed to recreate cluster_key_details")?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO cluster_key_details (
                        cluster_id,
                        day_of_week,
                        start_time,
                        occurrence_count,
                        total_count,
                        consistency_ratio
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;

                for pattern in &patterns {
                    stmt.execute(params![
                        pattern.cluster_id,
                        pattern.day_of_week,
                        format_time(&pattern.start_time),
                        pattern.occurrence_count,
                        pattern.total_count,
                        pattern.consistency_ratio,
                    ])
                    .with_context(|| {
                        format!("failed to insert pattern for cluster {}", pattern.cluster_id)
                    })?;
                }
            }

            tx.commit().context("failed to commit cluster_key_details")?;
            Ok(patterns.len())
        })
        .await
    }

    /// Stored patterns ordered by cluster, then by descending occurrence count.
    pub async fn get_cluster_patterns(&self) -> Result<Vec<ClusterPattern>> {
        self.execute(|conn| {
            if !table_exists(conn, PATTERN_TABLE)? {
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(
                "SELECT cluster_id, day_of_week, start_time, occurrence_count, total_count, consistency_ratio
                 FROM cluster_key_details
                 ORDER BY cluster_id ASC, occurrence_count DESC, day_of_week ASC, start_time ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut patterns = Vec::new();
            while let Some(row) = rows.next()? {
                patterns.push(row_to_pattern(row)?);
            }

            Ok(patterns)
        })
        .await
    }
}
