use thiserror::Error;

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the command.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The consumer group (or its stream) does not exist.
    #[error("no such consumer group {group} on stream {stream}")]
    NoSuchGroup { stream: String, group: String },
    /// `stream_create_group` found the group already present.
    #[error("consumer group {group} already exists on stream {stream}")]
    GroupExists { stream: String, group: String },
    /// An internal lock of an in-process store was poisoned.
    #[error("store state poisoned during {0}")]
    Poisoned(&'static str),
}
