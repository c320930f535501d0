use crate::db::models::ClusteredEvent;

/// Concatenate both labelled groups. Nothing is dropped or duplicated.
pub fn merge_clusters(
    identified: Vec<ClusteredEvent>,
    unidentified: Vec<ClusteredEvent>,
) -> Vec<ClusteredEvent> {
    let mut merged = identified;
    merged.extend(unidentified);
    merged
}
