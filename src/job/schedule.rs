use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A fixed-rate wall-clock schedule: one slot per `period`, `offset` into it.
///
/// Slots line up across processes because they are derived from the Unix
/// epoch, not from when each process started. With the defaults (60 s
/// period, 35 s offset) every process wakes at second 35 of every minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    period: Duration,
    offset: Duration,
}

impl Schedule {
    /// `period` is at least one millisecond; `offset` is taken modulo it.
    pub fn new(period: Duration, offset: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let offset = Duration::from_millis((offset.as_millis() % period.as_millis()) as u64);
        Self { period, offset }
    }

    /// Once a minute, at second `second`.
    pub fn every_minute_at(second: u64) -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(second))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// Time from `now` until the next slot. A `now` exactly on a slot waits a
    /// full period.
    pub fn delay_until_next(&self, now: SystemTime) -> Duration {
        let now = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let period = self.period.as_millis();
        let offset = self.offset.as_millis();
        let position = now % period;

        let wait = if position < offset {
            offset - position
        } else {
            period - position + offset
        };
        Duration::from_millis(wait as u64)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::every_minute_at(35)
    }
}
