//! Transaction log sink

use crate::config::Config;
use crate::error::Result;
use crate::request::ProxyRequest;
use crate::response::ProxyResponse;
use http::Method;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Sink for request and response records.
///
/// Opened once at startup (a file, or standard output) and held for the
/// process lifetime. Each record is written as one block under the sink
/// lock so concurrent transactions never interleave within a record.
pub struct TransactionLog {
  sink: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
  post_only: bool,
  responses: bool,
}

impl TransactionLog {
  /// Open the sink named by the configuration.
  ///
  /// A failure to create the log file is a fatal startup error.
  pub async fn open(config: &Config) -> Result<Self> {
    let sink: Box<dyn AsyncWrite + Send + Unpin> = match &config.filename {
      Some(path) => Box::new(tokio::fs::File::create(path).await?),
      None => Box::new(tokio::io::stdout()),
    };
    Ok(Self::with_sink(sink, config.post_only, config.log_response))
  }

  /// Build a log over an arbitrary sink.
  pub fn with_sink(
    sink: Box<dyn AsyncWrite + Send + Unpin>,
    post_only: bool,
    responses: bool,
  ) -> Self {
    Self {
      sink: Mutex::new(sink),
      post_only,
      responses,
    }
  }

  /// Write an incoming request record, honoring `post_only`.
  pub async fn record_request(&self, request: &ProxyRequest) -> Result<()> {
    if self.post_only && request.method != Method::POST {
      return Ok(());
    }
    let record = format!(
      "{:?} {:?} {:?} {:?}\nHeaders: {:?}\nBody: {:?}\n\n",
      timestamp(),
      request.peer,
      request.method.as_str(),
      request.target.as_str(),
      request.headers,
      String::from_utf8_lossy(&request.body),
    );
    self.write(record.as_bytes()).await
  }

  /// Write an outgoing response record, if response logging is on.
  pub async fn record_response(
    &self,
    request: &ProxyRequest,
    response: &ProxyResponse,
  ) -> Result<()> {
    if !self.responses {
      return Ok(());
    }
    let record = format!(
      "{:?} {:?} {} {:?} {:?}\nHeaders: {:?}\nBody: {:?}\n\n",
      timestamp(),
      request.peer,
      response.status.as_u16(),
      response.status_text(),
      request.target.as_str(),
      response.headers,
      String::from_utf8_lossy(&response.body),
    );
    self.write(record.as_bytes()).await
  }

  async fn write(&self, record: &[u8]) -> Result<()> {
    let mut sink = self.sink.lock().await;
    sink.write_all(record).await?;
    sink.flush().await?;
    Ok(())
  }
}

/// RFC 850 timestamp, e.g. `Sunday, 06-Nov-94 08:49:37 GMT`.
fn timestamp() -> String {
  OffsetDateTime::now_utc()
    .format(format_description!(
      "[weekday], [day]-[month repr:short]-[year repr:last_two] [hour]:[minute]:[second] GMT"
    ))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use bytes::Bytes;
  use http::{HeaderMap, Version};
  use tokio::io::AsyncReadExt;
  use url::Url;

  fn request(method: Method) -> ProxyRequest {
    ProxyRequest {
      peer: "10.0.0.1:51823".to_owned(),
      method,
      version: Version::HTTP_11,
      target: Url::parse("http://x.test/login").unwrap(),
      headers: HeaderMap::new(),
      body: Bytes::from_static(b"user=victim"),
    }
  }

  #[tokio::test]
  async fn post_only_skips_other_methods() {
    let (tx, mut rx) = tokio::io::duplex(64 * 1024);
    let log = TransactionLog::with_sink(Box::new(tx), true, false);

    log.record_request(&request(Method::GET)).await.unwrap();
    log.record_request(&request(Method::POST)).await.unwrap();
    drop(log);

    let mut written = Vec::new();
    rx.read_to_end(&mut written).await.unwrap();
    let written = String::from_utf8_lossy(&written);
    assert!(!written.contains("\"GET\""));
    assert!(written.contains("\"POST\""));
    assert!(written.contains("user=victim"));
  }

  #[tokio::test]
  async fn records_end_with_a_blank_line() {
    let (tx, mut rx) = tokio::io::duplex(64 * 1024);
    let log = TransactionLog::with_sink(Box::new(tx), false, false);

    log.record_request(&request(Method::GET)).await.unwrap();
    drop(log);

    let mut written = Vec::new();
    rx.read_to_end(&mut written).await.unwrap();
    assert!(written.ends_with(b"\n\n"));
  }
}
