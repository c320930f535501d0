pub mod event;
pub mod pattern;

pub use event::{ClusterAssignment, ClusteredEvent, ProcessedEvent, RawEvent};
pub use pattern::{ClusterPattern, SlotCount};
