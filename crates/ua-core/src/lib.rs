//! Core engine for the usage agent.
//!
//! This crate contains the sampling and reporting logic:
//! - Aggregation: per-application buckets of active seconds
//! - Scheduling: the fixed-rate tick loop with its idle gate and flush clock
//! - Flushing: handing snapshotted batches to an outbound sink
//!
//! Platform probes and the HTTP transport live in their own crates and plug in
//! through [`EnvironmentProbe`] and [`UsageSink`].

mod clock;
mod flush;
mod probe;
mod scheduler;
mod shutdown;
mod types;
mod usage;

pub use clock::FlushClock;
pub use flush::{FlushOutcome, Flusher, UsageReport, UsageSink};
pub use probe::EnvironmentProbe;
pub use scheduler::{RunSummary, SampleScheduler, SchedulerConfig, TickOutcome};
pub use shutdown::{ShutdownSender, ShutdownToken, shutdown_channel};
pub use types::{ApplicationId, Platform, ValidationError};
pub use usage::{UsageAggregator, UsageBatch, UsageRecord};
