//! Harvest orchestrator: walks subjects sequentially, runs the
//! pagination controller per (source, bucket), and flushes each subject
//! to the persistence sink as it completes.
//!
//! Subjects are processed one at a time on purpose: the render source
//! holds a single exclusive browser session, and conservative pacing is
//! part of the contract with the target site.

use crate::events::{EventSink, HarvestEvent};
use crate::pager::{harvest_bucket, Terminal};
use crate::sink::RecordSink;
use review_harvest_config::HarvestOptions;
use review_harvest_models::Subject;
use review_harvest_sources::ReviewSource;
use std::path::PathBuf;
use tracing::{info, warn};

/// Outcome of one bucket run, kept for the summary.
#[derive(Debug)]
pub struct BucketOutcome {
    pub source: String,
    pub bucket: Option<u8>,
    pub terminal: Terminal,
    pub records: usize,
}

/// Everything that happened for one subject.
#[derive(Debug)]
pub struct SubjectOutcome {
    pub subject: Subject,
    pub records: usize,
    pub buckets: Vec<BucketOutcome>,
    pub destination: Option<PathBuf>,
    pub sink_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct HarvestSummary {
    pub outcomes: Vec<SubjectOutcome>,
}

impl HarvestSummary {
    pub fn total_records(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.records).sum()
    }

    pub fn sink_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.sink_error.is_some())
            .count()
    }

    /// Buckets that ended blocked or at the safety ceiling.
    pub fn truncated_buckets(&self) -> usize {
        self.outcomes
            .iter()
            .flat_map(|outcome| outcome.buckets.iter())
            .filter(|bucket| bucket.terminal != Terminal::LastPage)
            .count()
    }
}

/// Run the full harvest. Infallible by design: no failure scoped to one
/// subject may prevent the remaining subjects from being attempted, and
/// sources are shut down on the way out regardless of what happened.
pub async fn run_harvest(
    sources: &mut [Box<dyn ReviewSource>],
    subjects: &[Subject],
    options: &HarvestOptions,
    sink: &dyn RecordSink,
    events: &dyn EventSink,
) -> HarvestSummary {
    let mut summary = HarvestSummary::default();

    for subject in subjects {
        info!(subject = %subject.title, id = %subject.id, "harvesting subject");
        let mut records = Vec::new();
        let mut buckets = Vec::new();

        for source in sources.iter() {
            for bucket in source.rating_buckets() {
                let result =
                    harvest_bucket(source.as_ref(), subject, bucket, options, events).await;
                buckets.push(BucketOutcome {
                    source: source.source_name().to_string(),
                    bucket,
                    terminal: result.terminal,
                    records: result.records.len(),
                });
                records.extend(result.records);
            }
        }

        // Flush once the subject completes. A sink failure is reported
        // and the run moves on; already-accumulated records are never
        // rolled back or retried.
        let (destination, sink_error) = match sink.write(subject, &records) {
            Ok(path) => {
                events.on_event(&HarvestEvent::SubjectFlushed {
                    subject_id: subject.id.clone(),
                    written: records.len(),
                    destination: path.display().to_string(),
                });
                (Some(path), None)
            }
            Err(e) => {
                events.on_event(&HarvestEvent::SinkFailed {
                    subject_id: subject.id.clone(),
                    error: e.to_string(),
                });
                (None, Some(e.to_string()))
            }
        };

        summary.outcomes.push(SubjectOutcome {
            subject: subject.clone(),
            records: records.len(),
            buckets,
            destination,
            sink_error,
        });
    }

    for source in sources.iter_mut() {
        if let Err(e) = source.shutdown().await {
            warn!(source = source.source_name(), error = %e, "source shutdown failed");
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::sink::SinkError;
    use async_trait::async_trait;
    use review_harvest_models::{FetchedPage, ItemNode, ReviewRecord};
    use review_harvest_sources::{ExtractRules, SourceError};
    use std::sync::{Arc, Mutex};

    static TEST_RULES: ExtractRules = ExtractRules {
        star_class_prefix: "allstar",
        star_increment: 10,
        rating_range: (0, 5),
        url_template: None,
    };

    /// Serves one short page per (subject, bucket) and counts shutdowns.
    struct OnePageSource {
        buckets: Vec<Option<u8>>,
        shutdowns: Arc<Mutex<u32>>,
    }

    impl OnePageSource {
        fn new(buckets: Vec<Option<u8>>) -> Self {
            Self {
                buckets,
                shutdowns: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl ReviewSource for OnePageSource {
        fn source_name(&self) -> &str {
            "one-page"
        }

        fn page_size(&self) -> u32 {
            20
        }

        fn rating_buckets(&self) -> Vec<Option<u8>> {
            self.buckets.clone()
        }

        fn extract_rules(&self) -> &ExtractRules {
            &TEST_RULES
        }

        async fn fetch_page(
            &self,
            _subject: &Subject,
            bucket: Option<u8>,
            _offset: u32,
        ) -> Result<FetchedPage, SourceError> {
            let mut node = ItemNode::with_id("item");
            node.content_text = format!("review for bucket {:?}", bucket);
            Ok(FetchedPage::success(vec![node]))
        }

        async fn shutdown(&mut self) -> Result<(), SourceError> {
            *self.shutdowns.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct MemorySink {
        written: Mutex<Vec<(String, usize)>>,
    }

    impl MemorySink {
        fn new() -> Self {
            Self {
                written: Mutex::new(Vec::new()),
            }
        }
    }

    impl RecordSink for MemorySink {
        fn write(
            &self,
            subject: &Subject,
            records: &[ReviewRecord],
        ) -> Result<PathBuf, SinkError> {
            self.written
                .lock()
                .unwrap()
                .push((subject.id.clone(), records.len()));
            Ok(PathBuf::from(format!("{}.csv", subject.id)))
        }
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn write(
            &self,
            _subject: &Subject,
            _records: &[ReviewRecord],
        ) -> Result<PathBuf, SinkError> {
            Err(SinkError::CreateDir {
                path: PathBuf::from("/nowhere"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    fn fast_options() -> HarvestOptions {
        HarvestOptions {
            delay_min_secs: 0,
            delay_max_secs: 0,
            ..HarvestOptions::default()
        }
    }

    #[tokio::test]
    async fn test_buckets_iterated_per_subject_and_flushed_once() {
        let mut sources: Vec<Box<dyn ReviewSource>> =
            vec![Box::new(OnePageSource::new(vec![Some(1), Some(2)]))];
        let subjects = vec![
            Subject::new("1", "First"),
            Subject::new("2", "Second"),
        ];
        let sink = MemorySink::new();

        let summary =
            run_harvest(&mut sources, &subjects, &fast_options(), &sink, &NullSink).await;

        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.total_records(), 4);
        let written = sink.written.lock().unwrap();
        assert_eq!(
            *written,
            vec![("1".to_string(), 2), ("2".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_the_run() {
        let mut sources: Vec<Box<dyn ReviewSource>> =
            vec![Box::new(OnePageSource::new(vec![None]))];
        let subjects = vec![
            Subject::new("1", "First"),
            Subject::new("2", "Second"),
        ];

        let summary =
            run_harvest(&mut sources, &subjects, &fast_options(), &FailingSink, &NullSink)
                .await;

        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.sink_failures(), 2);
        assert_eq!(summary.total_records(), 2);
    }

    #[tokio::test]
    async fn test_sources_shut_down_at_run_end() {
        let source = OnePageSource::new(vec![None]);
        let shutdowns = Arc::clone(&source.shutdowns);
        let mut sources: Vec<Box<dyn ReviewSource>> = vec![Box::new(source)];
        let subjects = vec![Subject::new("1", "Only")];
        let sink = MemorySink::new();

        run_harvest(&mut sources, &subjects, &fast_options(), &sink, &NullSink).await;

        assert_eq!(*shutdowns.lock().unwrap(), 1);
    }
}
