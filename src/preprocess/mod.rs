//! Derives `processed_events` from raw reservations.
//!
//! Adds the weekday name, a `start-end` slot label and the course code found
//! in the event name, if any.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use serde::Serialize;

use crate::db::{
    helpers::format_time,
    models::{ProcessedEvent, RawEvent},
    Database,
};
use crate::log_info;

const ENABLE_LOGS: bool = true;

/// Department letters, a course number with optional decimal, and an
/// optional trailing section letter or digit, e.g. `CS 101`, `ME 352.1 A`.
const COURSE_CODE_PATTERN: &str = r"([A-Z]{2,4}\s+\d{2,3}(?:\.\d)?\s*(?:[A-Z]|\d)?)";

#[derive(Debug, Clone)]
pub struct CourseCodeMatcher {
    pattern: Regex,
}

impl CourseCodeMatcher {
    pub fn new() -> Result<Self> {
        let pattern =
            Regex::new(COURSE_CODE_PATTERN).context("failed to compile course code pattern")?;
        Ok(Self { pattern })
    }

    /// First course code in `event_name`, trimmed.
    pub fn extract(&self, event_name: &str) -> Option<String> {
        self.pattern
            .captures(event_name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|code| !code.is_empty())
    }
}

pub fn weekday_name(date: &NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn process_event(raw: RawEvent, matcher: &CourseCodeMatcher) -> ProcessedEvent {
    let day_of_week = weekday_name(&raw.date).to_string();
    let time_slot = format!(
        "{}-{}",
        format_time(&raw.start_time),
        format_time(&raw.end_time)
    );
    let course_id = matcher.extract(&raw.event_name);

    ProcessedEvent {
        eid: raw.eid,
        event_name: raw.event_name,
        date: raw.date,
        start_time: raw.start_time,
        end_time: raw.end_time,
        room_id: raw.room_id,
        day_of_week: Some(day_of_week),
        time_slot: Some(time_slot),
        course_id,
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessReport {
    pub raw_events: usize,
    pub with_course_id: usize,
    pub rows_written: usize,
}

/// Rebuild `processed_events` from `events`.
pub async fn run_preprocess(db: &Database) -> Result<PreprocessReport> {
    let matcher = CourseCodeMatcher::new()?;
    let raw = db
        .load_raw_events()
        .await
        .context("failed to load raw events")?;
    let raw_events = raw.len();

    let processed: Vec<ProcessedEvent> = raw
        .into_iter()
        .map(|event| process_event(event, &matcher))
        .collect();
    let with_course_id = processed.iter().filter(|e| e.has_course_id()).count();

    let rows_written = db
        .replace_processed_events(&processed)
        .await
        .context("failed to write processed events")?;

    log_info!(
        "Preprocessed {} events ({} with a course id)",
        raw_events,
        with_course_id
    );

    Ok(PreprocessReport {
        raw_events,
        with_course_id,
        rows_written,
    })
}
