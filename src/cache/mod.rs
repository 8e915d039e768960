//! Local persistence of the user list for offline reads.
//!
//! The cache is a single full-replace record set keyed by user id. It is
//! written after every successful network fetch and read back only when the
//! sync policy decides to serve from cache.

mod storage;

pub use storage::{MemoryStorage, SqliteStorage, UserStore};
