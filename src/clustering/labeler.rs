use crate::clustering::encoding::{Identified, NameEncoding};
use crate::db::models::{ClusteredEvent, ProcessedEvent};

/// Course-identified events with one cluster per distinct event name.
#[derive(Debug, Clone, Default)]
pub struct IdentifiedClusters {
    pub events: Vec<ClusteredEvent>,
    pub cluster_count: usize,
    /// Largest id handed out, or 0 when there were no events.
    pub max_cluster_id: i64,
}

pub fn label_identified(events: Vec<ProcessedEvent>) -> IdentifiedClusters {
    if events.is_empty() {
        return IdentifiedClusters::default();
    }

    let names: Vec<&str> = events.iter().map(|e| e.event_name.as_str()).collect();
    let (encoding, codes) = NameEncoding::<Identified>::fit_transform(&names);

    let max_cluster_id = encoding
        .max_code()
        .map(|code| code.value() as i64)
        .unwrap_or(0);

    let events = events
        .into_iter()
        .zip(codes)
        .map(|(event, code)| ClusteredEvent {
            event,
            cluster_id: code.value() as i64,
        })
        .collect();

    IdentifiedClusters {
        events,
        cluster_count: encoding.len(),
        max_cluster_id,
    }
}
