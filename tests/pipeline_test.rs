//! End-to-end runs against a temporary SQLite store.

use std::collections::{BTreeSet, HashMap};

use booker_cluster_lib::{
    clustering::ClusteringConfig,
    db::{ClusterAssignment, Database, InputError, ProcessedEvent},
    pipeline::{run_pipeline, PipelineOptions},
    preprocess::run_preprocess,
};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::params;
use tempfile::TempDir;

fn open_store() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("booker.sqlite3")).unwrap();
    (dir, db)
}

fn event(
    eid: i64,
    name: &str,
    course_id: Option<&str>,
    day: Option<&str>,
    start: (u32, u32),
    end: (u32, u32),
) -> ProcessedEvent {
    let start_time = NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap();
    let end_time = NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap();
    ProcessedEvent {
        eid,
        event_name: name.to_string(),
        date: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
        start_time,
        end_time,
        room_id: Some(101),
        day_of_week: day.map(str::to_string),
        time_slot: Some(format!("{start_time}-{end_time}")),
        course_id: course_id.map(str::to_string),
    }
}

/// 10 CS 101 sections split over Tuesday/Thursday, one MA 201 section,
/// six weekly chess club meetings and one alumni dinner.
fn campus_week() -> Vec<ProcessedEvent> {
    let mut events = Vec::new();
    for eid in 1..=10 {
        let day = if eid % 2 == 0 { "Tuesday" } else { "Thursday" };
        events.push(event(eid, "CS 101", Some("CS 101"), Some(day), (10, 0), (11, 15)));
    }
    events.push(event(11, "Math 201", Some("MA 201"), Some("Wednesday"), (13, 0), (14, 0)));
    for eid in 12..=17 {
        events.push(event(eid, "Chess club", None, Some("Monday"), (14, 0), (15, 0)));
    }
    events.push(event(18, "Alumni dinner", None, Some("Saturday"), (19, 0), (22, 0)));
    events
}

fn by_eid(assignments: &[ClusterAssignment]) -> HashMap<i64, i64> {
    assignments.iter().map(|a| (a.eid, a.cluster_id)).collect()
}

/// Cluster membership as a set of eid groups, independent of the id values.
fn groupings(assignments: &[ClusterAssignment]) -> BTreeSet<BTreeSet<i64>> {
    let mut groups: HashMap<i64, BTreeSet<i64>> = HashMap::new();
    for assignment in assignments {
        groups
            .entry(assignment.cluster_id)
            .or_default()
            .insert(assignment.eid);
    }
    groups.into_values().collect()
}

#[tokio::test]
async fn assigns_every_event_one_cluster() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();

    let report = run_pipeline(&db, &PipelineOptions::default()).await.unwrap();
    assert_eq!(report.event_count, 18);
    assert_eq!(report.identified_events, 11);
    assert_eq!(report.unidentified_events, 7);
    assert_eq!(report.identified_clusters, 2);
    assert_eq!(report.discovered_clusters, 1);
    assert_eq!(report.noise_events, 1);
    assert_eq!(report.skipped_events, 0);
    assert_eq!(report.rows_updated, 18);

    let assignments = by_eid(&db.get_cluster_assignments().await.unwrap());
    assert_eq!(assignments.len(), 18);

    let max_identified = report.max_identified_id;
    let cs = assignments[&1];
    assert!((1..=10).all(|eid| assignments[&eid] == cs));
    let math = assignments[&11];
    assert_ne!(cs, math);
    assert!(cs <= max_identified && math <= max_identified);

    let chess = assignments[&12];
    assert!((12..=17).all(|eid| assignments[&eid] == chess));
    assert!(chess >= max_identified + 2);

    // DBSCAN noise keeps the shifted noise label: the gap id.
    assert_eq!(assignments[&18], max_identified + 1);
}

#[tokio::test]
async fn weekly_meeting_yields_fully_consistent_pattern() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();
    run_pipeline(&db, &PipelineOptions::default()).await.unwrap();

    let assignments = by_eid(&db.get_cluster_assignments().await.unwrap());
    let chess = assignments[&12];
    let patterns = db.get_cluster_patterns().await.unwrap();

    let chess_patterns: Vec<_> = patterns.iter().filter(|p| p.cluster_id == chess).collect();
    assert_eq!(chess_patterns.len(), 1);
    assert_eq!(chess_patterns[0].day_of_week.as_deref(), Some("Monday"));
    assert_eq!(
        chess_patterns[0].start_time,
        NaiveTime::from_hms_opt(14, 0, 0).unwrap()
    );
    assert_eq!(chess_patterns[0].occurrence_count, 6);
    assert_eq!(chess_patterns[0].total_count, 6);
    assert_eq!(chess_patterns[0].consistency_ratio, 1.0);

    let cs_patterns: Vec<_> = patterns
        .iter()
        .filter(|p| p.cluster_id == assignments[&1])
        .collect();
    assert_eq!(cs_patterns.len(), 2);
    assert!(cs_patterns.iter().all(|p| p.consistency_ratio == 0.5));

    assert!(patterns.iter().all(|p| p.consistency_ratio >= 0.2));
}

#[tokio::test]
async fn slot_counts_add_up_to_cluster_sizes() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();
    run_pipeline(&db, &PipelineOptions::default()).await.unwrap();

    let assignments = db.get_cluster_assignments().await.unwrap();
    let mut sizes: HashMap<i64, i64> = HashMap::new();
    for assignment in &assignments {
        *sizes.entry(assignment.cluster_id).or_default() += 1;
    }

    let mut slot_sums: HashMap<i64, i64> = HashMap::new();
    for slot in db.cluster_slot_counts().await.unwrap() {
        *slot_sums.entry(slot.cluster_id).or_default() += slot.occurrence_count;
    }

    assert_eq!(sizes, slot_sums);
}

#[tokio::test]
async fn rerun_keeps_groupings_and_patterns() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();

    let first = run_pipeline(&db, &PipelineOptions::default()).await.unwrap();
    let first_assignments = db.get_cluster_assignments().await.unwrap();
    let first_patterns = db.get_cluster_patterns().await.unwrap();

    let second = run_pipeline(&db, &PipelineOptions::default()).await.unwrap();
    let second_assignments = db.get_cluster_assignments().await.unwrap();
    let second_patterns = db.get_cluster_patterns().await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(groupings(&first_assignments), groupings(&second_assignments));
    assert_eq!(first_patterns, second_patterns);
    // Replaced, not appended.
    assert_eq!(second_patterns.len(), second.patterns_retained);
}

#[tokio::test]
async fn malformed_time_aborts_before_writing() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();
    run_pipeline(&db, &PipelineOptions::default()).await.unwrap();

    let before_assignments = db.get_cluster_assignments().await.unwrap();
    let before_patterns = db.get_cluster_patterns().await.unwrap();

    db.execute(|conn| {
        conn.execute(
            "INSERT INTO processed_events (eid, event_name, date, starttime, endtime, day_of_week)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![99, "Broken", "2024-09-02", "14:00:00", "26:61", "Monday"],
        )?;
        Ok(())
    })
    .await
    .unwrap();

    let err = run_pipeline(&db, &PipelineOptions::default())
        .await
        .unwrap_err();
    let input_error = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<InputError>())
        .expect("input validation error in chain");
    assert!(matches!(
        input_error,
        InputError::MalformedTime { eid: 99, field: "endtime", .. }
    ));

    assert_eq!(db.get_cluster_assignments().await.unwrap(), before_assignments);
    assert_eq!(db.get_cluster_patterns().await.unwrap(), before_patterns);
}

#[tokio::test]
async fn failed_row_rolls_back_whole_batch() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();

    let first = db
        .write_cluster_assignments(
            &(1..=18)
                .map(|eid| ClusterAssignment { eid, cluster_id: 77 })
                .collect::<Vec<_>>(),
            false,
        )
        .await
        .unwrap();
    assert!(first.column_added);
    assert_eq!(first.rows_updated, 18);

    db.execute(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER reject_event_5 BEFORE UPDATE ON processed_events
             WHEN NEW.eid = 5
             BEGIN
                 SELECT RAISE(ABORT, 'event 5 is locked');
             END;",
        )?;
        Ok(())
    })
    .await
    .unwrap();

    let attempt: Vec<ClusterAssignment> = (1..=18)
        .map(|eid| ClusterAssignment { eid, cluster_id: 3 })
        .collect();
    assert!(db.write_cluster_assignments(&attempt, false).await.is_err());

    let assignments = db.get_cluster_assignments().await.unwrap();
    assert_eq!(assignments.len(), 18);
    assert!(assignments.iter().all(|a| a.cluster_id == 77));
}

#[tokio::test]
async fn cluster_column_is_created_once() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();

    let assignments = vec![ClusterAssignment { eid: 1, cluster_id: 0 }];
    let first = db.write_cluster_assignments(&assignments, true).await.unwrap();
    let second = db.write_cluster_assignments(&assignments, true).await.unwrap();

    assert!(first.column_added);
    assert!(!second.column_added);
    assert_eq!(second.rows_updated, 1);

    let unknown = vec![ClusterAssignment { eid: 500, cluster_id: 0 }];
    let missing = db.write_cluster_assignments(&unknown, true).await.unwrap();
    assert_eq!(missing.rows_updated, 0);
    assert_eq!(missing.rows_unmatched, 1);
}

#[tokio::test]
async fn mirrors_into_events_clustered_when_present() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();
    db.execute(|conn| {
        conn.execute_batch(
            "CREATE TABLE events_clustered (eid INTEGER PRIMARY KEY, event_name TEXT NOT NULL);
             INSERT INTO events_clustered (eid, event_name)
                SELECT eid, event_name FROM processed_events WHERE eid <= 12;",
        )?;
        Ok(())
    })
    .await
    .unwrap();

    let report = run_pipeline(&db, &PipelineOptions::default()).await.unwrap();
    assert_eq!(report.rows_mirrored, 12);

    let assignments = by_eid(&db.get_cluster_assignments().await.unwrap());
    let mirrored: Vec<(i64, i64)> = db
        .execute(|conn| {
            let mut stmt =
                conn.prepare("SELECT eid, cluster_id FROM events_clustered ORDER BY eid")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .unwrap();

    assert_eq!(mirrored.len(), 12);
    for (eid, cluster_id) in mirrored {
        assert_eq!(assignments[&eid], cluster_id);
    }

    let skip_mirror = PipelineOptions {
        mirror_clustered_events: false,
        ..PipelineOptions::default()
    };
    let report = run_pipeline(&db, &skip_mirror).await.unwrap();
    assert_eq!(report.rows_mirrored, 0);
}

#[tokio::test]
async fn unclusterable_events_get_skipped_id() {
    let (_dir, db) = open_store();
    let events = vec![
        event(1, "Open lab", None, None, (9, 0), (10, 0)),
        event(2, "Open lab", None, None, (9, 0), (10, 0)),
        event(3, "Guest talk", None, Some("Holiday"), (16, 0), (17, 0)),
    ];
    db.replace_processed_events(&events).await.unwrap();

    let config = ClusteringConfig::default();
    let report = run_pipeline(&db, &PipelineOptions::default()).await.unwrap();
    assert_eq!(report.skipped_events, 3);
    assert_eq!(report.discovered_clusters, 0);

    let assignments = db.get_cluster_assignments().await.unwrap();
    assert!(assignments
        .iter()
        .all(|a| a.cluster_id == config.skipped_cluster_id));

    // Two slots in the skipped bucket: NULL day at 09:00 (2/3) and Holiday (1/3).
    let patterns = db.get_cluster_patterns().await.unwrap();
    assert_eq!(patterns.len(), 2);
    assert_eq!(patterns[0].occurrence_count, 2);
    assert_eq!(patterns[0].day_of_week, None);
    assert_eq!(patterns[0].total_count, 3);
}

#[tokio::test]
async fn empty_store_runs_cleanly() {
    let (_dir, db) = open_store();
    let report = run_pipeline(&db, &PipelineOptions::default()).await.unwrap();

    assert_eq!(report.event_count, 0);
    assert_eq!(report.max_identified_id, 0);
    assert_eq!(report.patterns_retained, 0);
    assert!(db.get_cluster_patterns().await.unwrap().is_empty());
}

#[tokio::test]
async fn preprocess_feeds_the_pipeline() {
    let db = Database::open_in_memory().unwrap();
    db.execute(|conn| {
        let mut stmt = conn.prepare(
            "INSERT INTO events (eid, event_name, date, starttime, endtime, rid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        // Mondays in September 2024
        for (i, date) in ["2024-09-02", "2024-09-09", "2024-09-16", "2024-09-23", "2024-09-30"]
            .iter()
            .enumerate()
        {
            stmt.execute(params![i as i64 + 1, "EID 101", date, "09:00", "10:15", 4])?;
            stmt.execute(params![i as i64 + 10, "Robotics club", date, "17:00:00", "18:00:00", 4])?;
        }
        Ok(())
    })
    .await
    .unwrap();

    let preprocessed = run_preprocess(&db).await.unwrap();
    assert_eq!(preprocessed.raw_events, 10);
    assert_eq!(preprocessed.with_course_id, 5);
    assert_eq!(preprocessed.rows_written, 10);

    let processed = db.load_processed_events().await.unwrap();
    assert!(processed
        .iter()
        .all(|e| e.day_of_week.as_deref() == Some("Monday")));

    let report = run_pipeline(&db, &PipelineOptions::default()).await.unwrap();
    assert_eq!(report.identified_clusters, 1);
    assert_eq!(report.discovered_clusters, 1);
    assert_eq!(report.noise_events, 0);

    let patterns = db.get_cluster_patterns().await.unwrap();
    assert_eq!(patterns.len(), 2);
    assert!(patterns.iter().all(|p| p.consistency_ratio == 1.0));
    assert_eq!(patterns[0].cluster_id, 0);
    assert_eq!(patterns[1].cluster_id, 2);
}

#[tokio::test]
async fn start_time_layouts_share_one_slot() {
    let (_dir, db) = open_store();
    db.execute(|conn| {
        let mut stmt = conn.prepare(
            "INSERT INTO processed_events (eid, event_name, date, starttime, endtime, day_of_week)
             VALUES (?1, 'Yoga', '2024-09-02', ?2, '15:00:00', 'Monday')",
        )?;
        for eid in 1..=6i64 {
            let start = if eid % 2 == 0 { "14:00:00" } else { "14:00" };
            stmt.execute(params![eid, start])?;
        }
        Ok(())
    })
    .await
    .unwrap();

    let report = run_pipeline(&db, &PipelineOptions::default()).await.unwrap();
    assert_eq!(report.discovered_clusters, 1);
    assert_eq!(report.pattern_rows, 1);

    let slots = db.cluster_slot_counts().await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].occurrence_count, 6);

    let patterns = db.get_cluster_patterns().await.unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].day_of_week.as_deref(), Some("Monday"));
    assert_eq!(patterns[0].start_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
    assert_eq!(patterns[0].occurrence_count, 6);
    assert_eq!(patterns[0].total_count, 6);
    assert_eq!(patterns[0].consistency_ratio, 1.0);
}

#[tokio::test]
async fn malformed_slot_time_keeps_typed_error() {
    let (_dir, db) = open_store();
    db.replace_processed_events(&campus_week()).await.unwrap();
    run_pipeline(&db, &PipelineOptions::default()).await.unwrap();

    db.execute(|conn| {
        conn.execute_batch(
            "UPDATE processed_events SET starttime = 'later' WHERE eid = 3;
             INSERT INTO cluster_key_details
                (cluster_id, day_of_week, start_time, occurrence_count, total_count, consistency_ratio)
                VALUES (42, 'Friday', 'noonish', 1, 1, 1.0);",
        )?;
        Ok(())
    })
    .await
    .unwrap();

    let err = db.cluster_slot_counts().await.unwrap_err();
    let input_error = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<InputError>())
        .expect("input validation error in chain");
    assert!(matches!(
        input_error,
        InputError::MalformedTime { eid: 3, field: "starttime", .. }
    ));

    let err = db.get_cluster_patterns().await.unwrap_err();
    let input_error = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<InputError>())
        .expect("input validation error in chain");
    assert!(matches!(
        input_error,
        InputError::MalformedPatternTime { cluster_id: 42, .. }
    ));
}
