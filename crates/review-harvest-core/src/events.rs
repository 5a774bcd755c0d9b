//! Structured progress events, decoupled from the engine's control flow.
//!
//! The pagination controller and orchestrator report through an
//! [`EventSink`] instead of printing; callers decide how to surface
//! progress (tracing, a progress bar, nothing at all).

use crate::pager::Terminal;
use review_harvest_models::PageStatus;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
pub enum HarvestEvent {
    PageStarted {
        source: String,
        subject_id: String,
        bucket: Option<u8>,
        offset: u32,
    },
    PageFinished {
        source: String,
        subject_id: String,
        bucket: Option<u8>,
        offset: u32,
        status: PageStatus,
        item_count: usize,
    },
    RecordProduced {
        source: String,
        subject_id: String,
        author: String,
    },
    ItemDropped {
        source: String,
        subject_id: String,
        item_id: String,
        reason: &'static str,
    },
    BucketFinished {
        source: String,
        subject_id: String,
        bucket: Option<u8>,
        terminal: Terminal,
        records: usize,
        pages: u32,
    },
    SubjectFlushed {
        subject_id: String,
        written: usize,
        destination: String,
    },
    SinkFailed {
        subject_id: String,
        error: String,
    },
}

pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &HarvestEvent);
}

/// Routes events onto the tracing subscriber. Terminal states that cut a
/// harvest short surface as warnings; per-item noise stays at debug.
pub struct LogSink;

impl EventSink for LogSink {
    fn on_event(&self, event: &HarvestEvent) {
        match event {
            HarvestEvent::PageStarted {
                source,
                subject_id,
                bucket,
                offset,
            } => {
                debug!(%source, %subject_id, ?bucket, offset, "page started");
            }
            HarvestEvent::PageFinished {
                source,
                subject_id,
                bucket,
                offset,
                status,
                item_count,
            } => {
                debug!(
                    %source,
                    %subject_id,
                    ?bucket,
                    offset,
                    ?status,
                    item_count,
                    "page finished"
                );
            }
            HarvestEvent::RecordProduced {
                source,
                subject_id,
                author,
            } => {
                trace!(%source, %subject_id, %author, "record produced");
            }
            HarvestEvent::ItemDropped {
                source,
                subject_id,
                item_id,
                reason,
            } => {
                debug!(%source, %subject_id, %item_id, reason, "item dropped");
            }
            HarvestEvent::BucketFinished {
                source,
                subject_id,
                bucket,
                terminal,
                records,
                pages,
            } => match terminal {
                Terminal::LastPage => {
                    info!(%source, %subject_id, ?bucket, records, pages, "bucket finished");
                }
                Terminal::Blocked => {
                    warn!(
                        %source,
                        %subject_id,
                        ?bucket,
                        records,
                        pages,
                        "bucket blocked by anti-automation challenge, partial results kept"
                    );
                }
                Terminal::MaxPagesReached => {
                    warn!(
                        %source,
                        %subject_id,
                        ?bucket,
                        records,
                        pages,
                        "page safety ceiling reached, more data may remain"
                    );
                }
            },
            HarvestEvent::SubjectFlushed {
                subject_id,
                written,
                destination,
            } => {
                info!(%subject_id, written, %destination, "subject flushed");
            }
            HarvestEvent::SinkFailed { subject_id, error } => {
                warn!(%subject_id, %error, "failed to persist subject records");
            }
        }
    }
}

/// Discards everything. For tests and quiet embedding.
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&self, _event: &HarvestEvent) {}
}
