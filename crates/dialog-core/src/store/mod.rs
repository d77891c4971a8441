//! Dialog and registration storage
//!
//! [`DialogStore`] is the in-memory, Call-ID indexed view shared by every
//! in-flight transaction. It is backed by a [`DialogPersistence`]
//! collaborator, refreshed by a background sweeper and loaded back from
//! persistence at startup.

pub mod cache;
pub mod dialog_store;
pub mod persistence;
pub mod retransmit;
pub mod sweeper;

pub use cache::{CacheEntry, ExpiringCache};
pub use dialog_store::{DialogMatch, DialogStore, SweepStats};
pub use persistence::{DialogPersistence, InMemoryPersistence};
pub use retransmit::RetransmitCache;
pub use sweeper::{SweeperHandle, spawn_sweeper};
