use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{Lock, LockError, LockManager, LockToken};

/// Lease applied when none is configured, matching the usual watchdog
/// timeout of Redis-backed locks.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(30);

/// In-memory lock with a lease.
///
/// A holder that never unlocks (it crashed, or leaked the lock) loses it once
/// the lease runs out, so a periodic job is never blocked forever. The lease
/// must outlast the work done under the lock; a holder that overruns it can no
/// longer release the lock once someone else has taken it over.
pub struct InMemoryLock {
    state: Mutex<LeaseState>,
    lease: Duration,
}

#[derive(Default)]
struct LeaseState {
    holder: Option<(LockToken, Instant)>,
    next_token: u64,
}

impl InMemoryLock {
    pub fn new() -> Self {
        Self::with_lease(DEFAULT_LEASE)
    }

    pub fn with_lease(lease: Duration) -> Self {
        InMemoryLock {
            state: Mutex::new(LeaseState::default()),
            lease,
        }
    }

    /// Whether the lock is held and its lease has not run out.
    pub fn is_held(&self) -> bool {
        self.state
            .lock()
            .map(|state| matches!(state.holder, Some((_, at)) if at > Instant::now()))
            .unwrap_or(false)
    }
}

impl Default for InMemoryLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Lock for InMemoryLock {
    fn try_lock(&self) -> Result<Option<LockToken>, LockError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        let now = Instant::now();
        if matches!(state.holder, Some((_, at)) if at > now) {
            return Ok(None);
        }
        state.next_token += 1;
        let token = LockToken(state.next_token);
        state.holder = Some((token, now + self.lease));
        Ok(Some(token))
    }

    fn unlock(&self, token: LockToken) -> Result<bool, LockError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;
        match state.holder {
            Some((owner, _)) if owner == token => {
                state.holder = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory lock manager backed by a `HashMap<String, Arc<InMemoryLock>>`.
///
/// Lazily creates one lock per key and returns the same `Arc` for repeated
/// lookups. Share one manager (behind an `Arc`) between job instances to
/// model several processes contending on one cluster lock.
pub struct InMemoryLockManager {
    locks: Mutex<HashMap<String, Arc<InMemoryLock>>>,
    lease: Duration,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::with_lease(DEFAULT_LEASE)
    }

    /// Manager whose locks use the given lease.
    pub fn with_lease(lease: Duration) -> Self {
        InMemoryLockManager {
            locks: Mutex::new(HashMap::new()),
            lease,
        }
    }
}

impl Default for InMemoryLockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager for InMemoryLockManager {
    type Lock = InMemoryLock;

    fn get_lock(&self, key: &str) -> Result<Arc<InMemoryLock>, LockError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| LockError::Poisoned("lock manager map poisoned".into()))?;
        Ok(locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(InMemoryLock::with_lease(self.lease)))
            .clone())
    }
}
