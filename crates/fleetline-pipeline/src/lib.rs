//! The Fleetline ingestion pipeline.
//!
//! This is the core of the system: the concurrent queue that decouples
//! message arrival from processing, the time-windowed batch accumulator,
//! the persistence and alert fan-out, and the latest-value cell the read
//! surface serves from.
//!
//! Control flow per flush interval:
//!
//! ```text
//! subscriber ─▶ event queue ─▶ accumulator ─┬─▶ batch sink (persistence)
//!                                           └─▶ scorer ─▶ alert publisher
//!                                           then: latest cell update
//! ```
//!
//! Persistence and scoring are independent per batch: a failure in one
//! never prevents the other, and no failure of any kind stops the timer
//! loop. The pipeline reaches the outside world only through the
//! [`BatchSink`] / [`AlertSink`] seams and the bus subscription, which
//! keeps every external collaborator replaceable (and mockable in tests).

mod accumulator;
mod alert;
mod latest;
mod queue;
mod sink;
mod stats;
mod subscriber;

pub use accumulator::Accumulator;
pub use alert::AlertPublisher;
pub use latest::LatestCell;
pub use queue::{EventQueue, QueuePolicy};
pub use sink::{AlertSink, BatchSink, SinkError};
pub use stats::{PipelineStats, StatsSnapshot};
pub use subscriber::run_subscriber;
