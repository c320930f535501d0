//! Numeric features for density clustering.

use chrono::{NaiveTime, Timelike};

use crate::db::models::ProcessedEvent;

/// name code, day of week, start minutes, end minutes
pub const FEATURE_COUNT: usize = 4;

pub type FeatureVector = [f64; FEATURE_COUNT];

pub fn minutes_since_midnight(time: &NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// 1 for Monday through 7 for Sunday. Only exact English day names match.
pub fn day_of_week_num(label: &str) -> Option<u8> {
    match label {
        "Monday" => Some(1),
        "Tuesday" => Some(2),
        "Wednesday" => Some(3),
        "Thursday" => Some(4),
        "Friday" => Some(5),
        "Saturday" => Some(6),
        "Sunday" => Some(7),
        _ => None,
    }
}

/// Time-derived features of one event. The name code is added per partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFeatures {
    pub day_of_week_num: Option<u8>,
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl EventFeatures {
    pub fn encode(event: &ProcessedEvent) -> Self {
        Self {
            day_of_week_num: event.day_of_week.as_deref().and_then(day_of_week_num),
            start_minutes: minutes_since_midnight(&event.start_time),
            end_minutes: minutes_since_midnight(&event.end_time),
        }
    }

    /// The full clustering vector, or `None` when a feature is missing.
    pub fn vector(&self, name_code: usize) -> Option<FeatureVector> {
        let day = self.day_of_week_num?;
        Some([
            name_code as f64,
            f64::from(day),
            f64::from(self.start_minutes),
            f64::from(self.end_minutes),
        ])
    }
}
