use color_eyre::eyre::{bail, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use review_harvest_config::{Config, PathManager};
use review_harvest_core::{
    run_harvest as run_engine, CsvSink, EventSink, HarvestEvent, HarvestSummary, LogSink,
    Terminal,
};
use review_harvest_sources::{BrowserSession, CommentFeed, ReviewFeed, ReviewSource};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::output::{Output, OutputFormat};

/// Drives the per-subject progress bar off harvest events.
struct ProgressSink {
    bar: ProgressBar,
}

impl EventSink for ProgressSink {
    fn on_event(&self, event: &HarvestEvent) {
        match event {
            HarvestEvent::PageStarted {
                source,
                subject_id,
                bucket,
                offset,
            } => {
                let bucket_label = bucket.map(|b| format!(" {}-star", b)).unwrap_or_default();
                self.bar
                    .set_message(format!("{} {}{} @{}", source, subject_id, bucket_label, offset));
            }
            HarvestEvent::SubjectFlushed { .. } | HarvestEvent::SinkFailed { .. } => {
                self.bar.inc(1);
            }
            _ => {}
        }
    }
}

pub async fn run_harvest(
    comments: bool,
    reviews: bool,
    all: bool,
    subject_filter: Option<String>,
    out: Option<PathBuf>,
    output: &Output,
) -> color_eyre::Result<()> {
    let paths = PathManager::default();
    let config_path = paths.config_file();
    if !config_path.exists() {
        bail!(
            "no config file at {}; run `reviewharvest config init` first",
            config_path.display()
        );
    }

    let config = Config::load(&config_path).map_err(|e| eyre!("{:#}", e))?;
    config.validate().map_err(|e| eyre!("{:#}", e))?;

    let run_everything = all || (!comments && !reviews);
    let want_comments = comments || run_everything;
    let want_reviews = reviews || run_everything;

    let mut subjects = config.subjects();
    if let Some(id) = subject_filter {
        subjects.retain(|subject| subject.id == id);
        if subjects.is_empty() {
            bail!("subject id {} is not in the configuration", id);
        }
    }
    if subjects.is_empty() {
        bail!(
            "no subjects configured; add [[subjects]] entries to {}",
            config_path.display()
        );
    }

    let mut sources: Vec<Box<dyn ReviewSource>> = Vec::new();

    let comments_enabled = config
        .sources
        .comments
        .as_ref()
        .map(|c| c.enabled)
        .unwrap_or(false);
    if want_comments && comments_enabled {
        let feed = CommentFeed::new(&config.harvest).map_err(|e| eyre!("{:#}", e))?;
        sources.push(Box::new(feed));
    }

    let reviews_config = config.sources.reviews.as_ref().filter(|c| c.enabled);
    if want_reviews {
        if let Some(cfg) = reviews_config {
            output.info("launching browser for the review feed...");
            let session = BrowserSession::launch(&paths.browser_dir())
                .await
                .map_err(|e| eyre!("{:#}", e))?;
            let feed = ReviewFeed::open(session, &config.harvest, cfg.buckets.clone())
                .await
                .map_err(|e| eyre!("{:#}", e))?;
            sources.push(Box::new(feed));
        }
    }

    if sources.is_empty() {
        bail!(
            "no sources to run; enable them in {} or pass --comments/--reviews",
            config_path.display()
        );
    }

    let out_dir = out.unwrap_or_else(|| paths.output_dir());
    let sink = CsvSink::new(out_dir.clone());
    info!(
        subjects = subjects.len(),
        sources = sources.len(),
        out_dir = %out_dir.display(),
        "starting harvest run"
    );

    let progress = if output.format() == OutputFormat::Human && !output.is_quiet() {
        let bar = ProgressBar::new(subjects.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} subjects {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let events: Box<dyn EventSink> = match &progress {
        Some(bar) => Box::new(ProgressSink { bar: bar.clone() }),
        None => Box::new(LogSink),
    };

    let summary = run_engine(
        &mut sources,
        &subjects,
        &config.harvest,
        &sink,
        events.as_ref(),
    )
    .await;

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    report_summary(&summary, &out_dir, output);
    Ok(())
}

/// Per-subject failures are reported here, not turned into a non-zero
/// exit: a run that harvested nine of ten subjects still did its job.
fn report_summary(summary: &HarvestSummary, out_dir: &Path, output: &Output) {
    match output.format() {
        OutputFormat::Human => {
            for outcome in &summary.outcomes {
                match (&outcome.destination, &outcome.sink_error) {
                    (Some(path), None) if outcome.records > 0 => {
                        output.success(format!(
                            "{}: {} records -> {}",
                            outcome.subject.title,
                            outcome.records,
                            path.display()
                        ));
                    }
                    (_, Some(error)) => {
                        output.error(format!(
                            "{}: {} records collected but not written: {}",
                            outcome.subject.title, outcome.records, error
                        ));
                    }
                    _ => {
                        output.info(format!("{}: no records", outcome.subject.title));
                    }
                }
                for bucket in &outcome.buckets {
                    if bucket.terminal != Terminal::LastPage {
                        let bucket_label = bucket
                            .bucket
                            .map(|b| format!(", {}-star bucket", b))
                            .unwrap_or_default();
                        output.warn(format!(
                            "  {}{}: {}",
                            bucket.source, bucket_label, bucket.terminal
                        ));
                    }
                }
            }
            output.info(format!(
                "total: {} records across {} subjects in {}",
                summary.total_records(),
                summary.outcomes.len(),
                out_dir.display()
            ));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let subjects: Vec<_> = summary
                .outcomes
                .iter()
                .map(|outcome| {
                    json!({
                        "subject_id": outcome.subject.id,
                        "title": outcome.subject.title,
                        "records": outcome.records,
                        "destination": outcome.destination.as_ref().map(|p| p.display().to_string()),
                        "sink_error": outcome.sink_error,
                        "buckets": outcome.buckets.iter().map(|b| json!({
                            "source": b.source,
                            "bucket": b.bucket,
                            "terminal": b.terminal.to_string(),
                            "records": b.records,
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect();

            output.json(&json!({
                "type": "summary",
                "total_records": summary.total_records(),
                "truncated_buckets": summary.truncated_buckets(),
                "sink_failures": summary.sink_failures(),
                "subjects": subjects,
            }));
        }
    }
}
