pub mod backup;
pub mod document;
pub mod export;
pub mod merge;
pub mod parse;
pub mod structural;
pub mod template;
pub mod write;

pub use backup::{backup_tracker_file, backup_tracker_file_keeping};
pub use document::TrackerDocument;
pub use export::{export_tracker, ExportFormat};
pub use merge::merge_trackers;
pub use parse::{parse_tracker_file, MINI_TRACKER_END_MARKER, MINI_TRACKER_START_MARKER};
pub use template::default_mini_tracker_template;
pub use structural::{compute_structural_update, SuggestedEdge, TrackerUpdateInput, TrackerUpdateResult};
pub use write::{write_tracker_file, write_tracker_file_with_template};
