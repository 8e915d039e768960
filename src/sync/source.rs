//! Seams the orchestrator consumes: the remote source and the connectivity probe.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

use crate::users::User;

/// Why a single network attempt did not yield records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
  /// Transport completed but the server answered with a non-success status
  #[error("server responded with status {0}")]
  Status(u16),
  #[error("request timed out")]
  Timeout,
  /// Could not open a connection to the server
  #[error("connection failed: {0}")]
  Connect(String),
  #[error("transport error: {0}")]
  Transport(String),
  /// Response body was not a valid user list
  #[error("malformed payload: {0}")]
  Decode(String),
}

/// Outcome of one remote attempt. `Ok(vec![])` is an empty success, not a failure.
pub type FetchOutcome = Result<Vec<User>, FetchFailure>;

/// One network round trip returning the authoritative user list.
///
/// Implementations must not retry internally.
#[async_trait]
pub trait RemoteSource: Send + Sync {
  async fn fetch(&self) -> FetchOutcome;
}

#[async_trait]
impl<T: RemoteSource + ?Sized> RemoteSource for Box<T> {
  async fn fetch(&self) -> FetchOutcome {
    (**self).fetch().await
  }
}

#[async_trait]
impl<T: RemoteSource + ?Sized> RemoteSource for Arc<T> {
  async fn fetch(&self) -> FetchOutcome {
    (**self).fetch().await
  }
}

/// Answers "is the network reachable right now".
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
  async fn is_reachable(&self) -> bool;
}

#[async_trait]
impl<T: ConnectivityProbe + ?Sized> ConnectivityProbe for Box<T> {
  async fn is_reachable(&self) -> bool {
    (**self).is_reachable().await
  }
}

#[async_trait]
impl<T: ConnectivityProbe + ?Sized> ConnectivityProbe for Arc<T> {
  async fn is_reachable(&self) -> bool {
    (**self).is_reachable().await
  }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

#[async_trait]
impl ConnectivityProbe for StaticProbe {
  async fn is_reachable(&self) -> bool {
    self.0
  }
}

/// Probe that tries a TCP connect to the API host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
  host: String,
  port: u16,
  timeout: Duration,
}

impl TcpProbe {
  pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
    Self {
      host: host.into(),
      port,
      timeout,
    }
  }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
  async fn is_reachable(&self) -> bool {
    let addr = (self.host.as_str(), self.port);
    match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
      Ok(Ok(_)) => true,
      Ok(Err(e)) => {
        debug!(host = %self.host, port = self.port, error = %e, "connectivity probe failed");
        false
      }
      Err(_) => {
        debug!(host = %self.host, port = self.port, "connectivity probe timed out");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::net::TcpListener;

  #[tokio::test]
  async fn test_static_probe() {
    assert!(StaticProbe(true).is_reachable().await);
    assert!(!StaticProbe(false).is_reachable().await);
  }

  #[tokio::test]
  async fn test_tcp_probe_reaches_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(1));
    assert!(probe.is_reachable().await);
  }

  #[tokio::test]
  async fn test_tcp_probe_closed_port() {
    // Bind then drop to get a port nothing listens on
    let port = {
      let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
      listener.local_addr().unwrap().port()
    };

    let probe = TcpProbe::new("127.0.0.1", port, Duration::from_millis(500));
    assert!(!probe.is_reachable().await);
  }

  #[tokio::test]
  async fn test_boxed_probe_delegates() {
    let probe: Box<dyn ConnectivityProbe> = Box::new(StaticProbe(true));
    assert!(probe.is_reachable().await);
  }
}
