use crate::db::models::ProcessedEvent;

/// Events split by whether preprocessing recognised a course code.
#[derive(Debug, Clone, Default)]
pub struct Partitioned {
    pub identified: Vec<ProcessedEvent>,
    pub unidentified: Vec<ProcessedEvent>,
}

/// Split `events` into course-identified and unidentified groups.
/// Every event lands in exactly one group; relative order is kept.
pub fn partition_by_course(events: Vec<ProcessedEvent>) -> Partitioned {
    let (identified, unidentified) = events.into_iter().partition(ProcessedEvent::has_course_id);
    Partitioned {
        identified,
        unidentified,
    }
}
