//! Store abstraction the messaging layer runs on.
//!
//! ```text
//! ┌──────────────────────────────┐    ┌──────────────────────────────┐
//! │  MqTemplate (producers)      │    │  Listener containers          │
//! │  publish / stream_append     │    │  subscribe / stream_read_group│
//! └──────────────────────────────┘    └──────────────────────────────┘
//!                 │                                   │
//!                 ▼                                   ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Store trait                             │
//! └──────────────────────────────────────────────────────────────────┘
//!          │                                     │
//!          ▼                                     ▼
//!  ┌───────────────┐                    ┌─────────────────┐
//!  │ InMemoryStore │                    │  Redis client   │
//!  │  (included)   │                    │   (external)    │
//!  └───────────────┘                    └─────────────────┘
//! ```

mod entry;
mod error;
mod in_memory;
#[allow(clippy::module_inception)]
mod store;

pub use entry::{EntryId, EntryRange, ParseEntryIdError, PendingEntry, PendingSummary, StreamEntry};
pub use error::StoreError;
pub use in_memory::InMemoryStore;
pub use store::{Store, SubscriptionCallback, SubscriptionId};
