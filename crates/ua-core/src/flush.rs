//! Flush-and-send protocol.
//!
//! The scheduler swaps its aggregator for an empty one *before* handing the old
//! batch to a [`Flusher`]. Whatever happens to the send afterwards, the
//! snapshot is never merged back: a failed send loses that batch.

use std::error::Error;
use std::future::Future;

use tracing::{debug, info, warn};

use crate::types::Platform;
use crate::usage::UsageBatch;

/// A batch ready to leave the process, with the context reported alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReport {
    /// Machine or user name, when identity reporting is enabled.
    pub identity: Option<String>,
    /// Platform the samples were taken on.
    pub platform: Platform,
    pub batch: UsageBatch,
}

/// Outbound transport for usage reports.
pub trait UsageSink {
    type Error: Error;

    /// Submits a report and returns the HTTP-like status code of the response.
    fn send(&self, report: &UsageReport) -> impl Future<Output = Result<u16, Self::Error>>;
}

/// What happened to a flushed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was accumulated, so nothing was sent.
    Empty,
    /// The collector answered. The status is logged but never acted upon.
    Delivered { records: usize, status: u16 },
    /// The transport failed and the batch was dropped.
    Dropped { records: usize },
}

/// Hands snapshotted batches to a [`UsageSink`].
///
/// Holds no batch state of its own; each call carries its snapshot.
#[derive(Debug)]
pub struct Flusher<S> {
    sink: S,
    identity: Option<String>,
    platform: Platform,
}

impl<S: UsageSink> Flusher<S> {
    pub const fn new(sink: S, identity: Option<String>, platform: Platform) -> Self {
        Self {
            sink,
            identity,
            platform,
        }
    }

    /// Sends a batch. Never fails: transport errors are logged and the batch is lost.
    pub async fn flush(&self, batch: UsageBatch) -> FlushOutcome {
        if batch.is_empty() {
            debug!("nothing to flush");
            return FlushOutcome::Empty;
        }

        let records = batch.len();
        let total_seconds = batch.total_seconds();
        let report = UsageReport {
            identity: self.identity.clone(),
            platform: self.platform,
            batch,
        };

        match self.sink.send(&report).await {
            Ok(status) => {
                if (200..300).contains(&status) {
                    info!(records, total_seconds, status, "usage report sent");
                } else {
                    warn!(records, total_seconds, status, "collector rejected usage report");
                }
                FlushOutcome::Delivered { records, status }
            }
            Err(err) => {
                warn!(records, total_seconds, error = %err, "failed to send usage report, dropping batch");
                FlushOutcome::Dropped { records }
            }
        }
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}
