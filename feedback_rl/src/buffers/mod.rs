//! Experience storage for off-policy learning.
//!
//! - [`ReplayStore`]: ring buffer that inserts each transition `count` times
//!   and samples uniformly over all stored entries.

pub mod replay_store;

pub use replay_store::{ReplayStore, ReplayStoreConfig};
