//! Cluster-wide mutual exclusion used to single-flight periodic jobs.
//!
//! The messaging layer only needs a non-blocking `try_lock`: a job that
//! cannot get its lock skips the run instead of queueing behind the holder.
//! `InMemoryLockManager` covers one process (or several sharing one manager
//! in tests); distributed implementations might use Redis `SET NX PX`,
//! Postgres advisory locks or etcd leases.

mod error;
mod in_memory;
#[allow(clippy::module_inception)]
mod lock;
mod lock_manager;

pub use error::LockError;
pub use in_memory::{InMemoryLock, InMemoryLockManager, DEFAULT_LEASE};
pub use lock::{HeldLock, Lock, LockToken};
pub use lock_manager::LockManager;
