pub mod events;
pub mod harvest;
pub mod pager;
pub mod sink;

pub use events::{EventSink, HarvestEvent, LogSink, NullSink};
pub use harvest::{run_harvest, BucketOutcome, HarvestSummary, SubjectOutcome};
pub use pager::{harvest_bucket, BucketHarvest, Terminal};
pub use sink::{CsvSink, RecordSink, SinkError};
