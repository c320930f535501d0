use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection};
use thiserror::Error;

const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";
const STORED_TIME_FORMAT: &str = "%H:%M:%S";

/// Corrupt stored values. In the event table these abort a run before anything is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("event {eid}: malformed {field} '{value}'")]
    MalformedTime {
        eid: i64,
        field: &'static str,
        value: String,
    },
    #[error("event {eid}: malformed {field} '{value}'")]
    MalformedDate {
        eid: i64,
        field: &'static str,
        value: String,
    },
    #[error("cluster {cluster_id}: malformed pattern {field} '{value}'")]
    MalformedPatternTime {
        cluster_id: i64,
        field: &'static str,
        value: String,
    },
}

fn parse_time_layouts(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
}

pub fn parse_time(value: &str, field: &'static str, eid: i64) -> Result<NaiveTime, InputError> {
    parse_time_layouts(value).ok_or_else(|| InputError::MalformedTime {
        eid,
        field,
        value: value.to_string(),
    })
}

/// Like [`parse_time`] for `cluster_key_details` rows, which are keyed by cluster.
pub fn parse_pattern_time(
    value: &str,
    field: &'static str,
    cluster_id: i64,
) -> Result<NaiveTime, InputError> {
    parse_time_layouts(value).ok_or_else(|| InputError::MalformedPatternTime {
        cluster_id,
        field,
        value: value.to_string(),
    })
}

pub fn parse_date(value: &str, field: &'static str, eid: i64) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| InputError::MalformedDate {
        eid,
        field,
        value: value.to_string(),
    })
}

pub fn format_time(time: &NaiveTime) -> String {
    time.format(STORED_TIME_FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .with_context(|| format!("failed to look up table {table}"))?;
    Ok(count > 0)
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("failed to read columns of {table}"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Add an INTEGER column unless it is already there. A no-op on repeat calls.
pub fn ensure_integer_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    if column_exists(conn, table, column)? {
        return Ok(false);
    }
    conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} INTEGER"))
        .with_context(|| format!("failed to add {column} to {table}"))?;
    Ok(true)
}
