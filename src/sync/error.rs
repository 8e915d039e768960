use super::source::FetchFailure;

/// Terminal failure of one refresh, as published on the `error` signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
  /// Network was reachable but the call failed or was rejected
  #[error("network call failed: {0}")]
  NetworkCallFailed(FetchFailure),
  /// Could not reach the server at all
  #[error("network unreachable")]
  Unreachable,
  /// Offline and the local cache is empty
  #[error("no connectivity and no cached data")]
  NoCachedData,
  /// Panic or unclassified fault inside the fetch or store calls
  #[error("unexpected fault: {0}")]
  UnexpectedFault(String),
}
