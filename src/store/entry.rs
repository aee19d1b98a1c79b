use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Store-assigned stream entry ID (`<millis>-<seq>`).
///
/// IDs are totally ordered: a later append always gets a greater ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntryId {
    pub millis: u64,
    pub seq: u64,
}

impl EntryId {
    pub const MIN: EntryId = EntryId { millis: 0, seq: 0 };

    pub fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }

    /// The smallest ID strictly greater than `self` at the given time.
    pub(crate) fn next_after(self, now_millis: u64) -> Self {
        if now_millis > self.millis {
            EntryId::new(now_millis, 0)
        } else {
            EntryId::new(self.millis, self.seq + 1)
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid stream entry id: {0}")]
pub struct ParseEntryIdError(String);

impl FromStr for EntryId {
    type Err = ParseEntryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseEntryIdError(s.to_string());
        let (millis, seq) = match s.split_once('-') {
            Some((millis, seq)) => (millis, seq),
            None => (s, "0"),
        };
        Ok(EntryId {
            millis: millis.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

/// Inclusive ID range; `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryRange {
    pub start: Option<EntryId>,
    pub end: Option<EntryId>,
}

impl EntryRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Range matching exactly one ID.
    pub fn single(id: EntryId) -> Self {
        Self {
            start: Some(id),
            end: Some(id),
        }
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.start.map_or(true, |start| *id >= start) && self.end.map_or(true, |end| *id <= end)
    }
}

/// One entry of a stream: its ID and the raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: EntryId,
    pub payload: Vec<u8>,
}

impl StreamEntry {
    pub fn new(id: EntryId, payload: Vec<u8>) -> Self {
        Self { id, payload }
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Summary of a group's pending-entry list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingSummary {
    pub total: u64,
    pub lowest: Option<EntryId>,
    pub highest: Option<EntryId>,
    /// Pending count per consumer name.
    pub consumers: BTreeMap<String, u64>,
}

impl PendingSummary {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// A delivered-but-unacknowledged entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub id: EntryId,
    pub consumer: String,
    /// Time since the entry was last delivered to `consumer`.
    pub elapsed: Duration,
    pub delivery_count: u64,
}
