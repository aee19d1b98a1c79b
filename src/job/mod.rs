//! Periodic redelivery of stream entries stuck in pending lists.
//!
//! ```text
//!   RedeliveryJobThread ──(Schedule slot)──► PendingRedeliveryJob::run
//!                                                │
//!                          LockManager::get_lock ┤ try_lock, else Skipped
//!                                                ▼
//!            for each StreamConsumer: pending summary ─► pending detail
//!                         stale entry: range(id) ─► append ─► ack(id)
//! ```

mod redelivery;
mod schedule;
mod thread;

pub use redelivery::{PendingRedeliveryJob, SweepOutcome, SweepReport};
pub use schedule::Schedule;
pub use thread::{JobStats, RedeliveryJobThread};
