pub mod config;
pub mod paths;

pub use config::{
    CommentFeedConfig, Config, HarvestOptions, ReviewFeedConfig, SourceConfig, SubjectEntry,
};
pub use paths::{container_base_path, PathManager};
