use std::sync::Arc;

use super::{Lock, LockError};

/// Hands out locks by key.
///
/// Repeated calls with the same key must return the same logical lock (the
/// same `Arc` in memory, or the same key on a distributed backend), so that
/// every process asking for `key` contends on one lock.
pub trait LockManager: Send + Sync {
    /// The concrete lock type returned by this manager.
    type Lock: Lock;

    fn get_lock(&self, key: &str) -> Result<Arc<Self::Lock>, LockError>;
}
