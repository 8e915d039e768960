use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::sync::{FetchFailure, FetchOutcome, RemoteSource};

use super::api_types::parse_users;

/// HTTP client for the users endpoint
#[derive(Clone)]
pub struct UserApiClient {
  client: Client,
  endpoint: Url,
}

impl UserApiClient {
  pub fn new(config: &Config) -> Result<Self> {
    let endpoint = config.api_url()?;
    Self::with_endpoint(endpoint, Duration::from_secs(config.api.timeout_secs))
  }

  pub fn with_endpoint(endpoint: Url, timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, endpoint })
  }
}

#[async_trait]
impl RemoteSource for UserApiClient {
  async fn fetch(&self) -> FetchOutcome {
    debug!(endpoint = %self.endpoint, "fetching users");

    let response = self
      .client
      .get(self.endpoint.clone())
      .header(reqwest::header::ACCEPT, "application/json")
      .send()
      .await
      .map_err(map_transport_error)?;

    let status = response.status();
    if !status.is_success() {
      warn!(status = status.as_u16(), "users request rejected");
      return Err(FetchFailure::Status(status.as_u16()));
    }

    let body = response.bytes().await.map_err(map_transport_error)?;
    let users = parse_users(&body).map_err(|e| FetchFailure::Decode(e.to_string()))?;

    debug!(count = users.len(), "fetched users");
    Ok(users)
  }
}

fn map_transport_error(error: reqwest::Error) -> FetchFailure {
  if error.is_timeout() {
    FetchFailure::Timeout
  } else if error.is_connect() {
    FetchFailure::Connect(error.to_string())
  } else {
    FetchFailure::Transport(error.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  /// Serve exactly one canned HTTP response on a local port.
  async fn serve_once(status_line: &'static str, body: &'static str) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = [0u8; 2048];
      let _ = socket.read(&mut buf).await;
      let response = format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
      );
      let _ = socket.write_all(response.as_bytes()).await;
      let _ = socket.shutdown().await;
    });

    Url::parse(&format!("http://{}/users", addr)).unwrap()
  }

  fn client_for(url: Url) -> UserApiClient {
    UserApiClient::with_endpoint(url, Duration::from_secs(5)).unwrap()
  }

  #[tokio::test]
  async fn test_fetch_success() {
    let url = serve_once(
      "200 OK",
      r#"[{"id":1001,"img":"https://randomuser.me/api/portraits/men/9.jpg","name":"Eduardo Santos","username":"@eduardo.santos"}]"#,
    )
    .await;

    let users = client_for(url).fetch().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, 1001);
    assert_eq!(users[0].username, "@eduardo.santos");
  }

  #[tokio::test]
  async fn test_fetch_server_error_is_failure() {
    let url = serve_once("500 Internal Server Error", "{}").await;
    assert_eq!(client_for(url).fetch().await, Err(FetchFailure::Status(500)));
  }

  #[tokio::test]
  async fn test_fetch_malformed_payload() {
    let url = serve_once("200 OK", "not json").await;
    assert!(matches!(
      client_for(url).fetch().await,
      Err(FetchFailure::Decode(_))
    ));
  }

  #[tokio::test]
  async fn test_fetch_connection_refused() {
    let port = {
      let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
      listener.local_addr().unwrap().port()
    };
    let url = Url::parse(&format!("http://127.0.0.1:{}/users", port)).unwrap();

    assert!(matches!(
      client_for(url).fetch().await,
      Err(FetchFailure::Connect(_))
    ));
  }
}
