//! Durable telemetry log for Fleetline.
//!
//! Implements the persistence sink of the pipeline: transactional bulk
//! append of a batch of telemetry records, plus the read queries the HTTP
//! surface consumes (list-all, read-latest).
//!
//! Persistence is best-effort at the batch granularity: the accumulator
//! treats an append failure as "batch lost for durability" and carries on.
//! Within one append the semantics are all-or-nothing — every record in the
//! batch lands in the same transaction under one batch id, or none do.

mod error;
mod log;

pub use error::StoreError;
pub use log::{append_batch, latest_record, list_records, record_count, StoredRecord};

#[cfg(test)]
mod tests;
