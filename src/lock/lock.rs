use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::LockError;

/// Proof of one acquisition, handed back to [`Lock::unlock`].
///
/// Every successful `try_lock` yields a fresh token, so a holder whose lease
/// ran out cannot release the lock out from under the next holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken(pub u64);

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single named lock.
pub trait Lock: Send + Sync {
    /// Try to acquire the lock without blocking.
    /// Returns `Ok(Some(token))` if acquired, `Ok(None)` if someone else holds it.
    fn try_lock(&self) -> Result<Option<LockToken>, LockError>;

    /// Release the lock if `token` still owns it.
    /// Returns `Ok(false)` when the lease was already lost to another holder.
    fn unlock(&self, token: LockToken) -> Result<bool, LockError>;
}

/// An acquired lock, released when dropped (including during a panic).
pub struct HeldLock<L: Lock> {
    lock: Arc<L>,
    key: String,
    token: LockToken,
}

impl<L: Lock> HeldLock<L> {
    /// Try once to acquire `lock`; `None` means it is busy.
    pub fn try_acquire(lock: Arc<L>, key: impl Into<String>) -> Result<Option<Self>, LockError> {
        Ok(lock.try_lock()?.map(|token| Self {
            lock,
            key: key.into(),
            token,
        }))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> LockToken {
        self.token
    }
}

impl<L: Lock> Drop for HeldLock<L> {
    fn drop(&mut self) {
        match self.lock.unlock(self.token) {
            Ok(true) => {}
            Ok(false) => {
                debug!(key = %self.key, token = %self.token, "lease expired before release")
            }
            Err(err) => warn!(key = %self.key, error = %err, "failed to release lock"),
        }
    }
}
