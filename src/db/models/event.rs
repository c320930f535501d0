//! Reservation data models.
//!
//! `RawEvent` is what ingestion leaves in `events`; `ProcessedEvent` is a row
//! of `processed_events`, the table the clustering pipeline reads and writes.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A reservation as pulled from the source calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub eid: i64,
    pub event_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_id: Option<i64>,
}

/// A reservation with the derived fields the clustering stages consume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedEvent {
    pub eid: i64,
    pub event_name: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_id: Option<i64>,
    pub day_of_week: Option<String>,
    pub time_slot: Option<String>,
    pub course_id: Option<String>,
}

impl ProcessedEvent {
    /// Only a NULL course id counts as absent; the value itself is never inspected.
    pub fn has_course_id(&self) -> bool {
        self.course_id.is_some()
    }
}

/// An event together with the cluster it was placed in during this run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusteredEvent {
    pub event: ProcessedEvent,
    pub cluster_id: i64,
}

impl ClusteredEvent {
    pub fn assignment(&self) -> ClusterAssignment {
        ClusterAssignment {
            eid: self.event.eid,
            cluster_id: self.cluster_id,
        }
    }
}

/// The `(eid, cluster_id)` pair persisted by the cluster writer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    pub eid: i64,
    pub cluster_id: i64,
}
