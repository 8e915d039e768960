//! Offline-first synchronization of the user list.
//!
//! One refresh = one decision: fetch from the network (and write the result
//! through to the cache) or serve the cache, depending on the configured
//! [`SyncPolicy`]. Progress and outcome are published on three watch signals
//! (see [`SyncState`]); nothing is returned to or thrown at the caller of
//! [`SyncOrchestrator::refresh`].

mod error;
mod orchestrator;
mod source;
mod state;

#[cfg(test)]
mod testing;

pub use error::SyncError;
pub use orchestrator::{SyncOrchestrator, SyncPolicy};
pub use source::{
  ConnectivityProbe, FetchFailure, FetchOutcome, RemoteSource, StaticProbe, TcpProbe,
};
pub use state::SyncState;
