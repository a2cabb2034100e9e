//! Upstream response snapshot

use crate::error::Result;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// A fully buffered upstream response.
///
/// The body is held in memory because the rewriting pass needs random
/// access over the whole thing; the rewriter replaces it in place.
#[derive(Clone, Debug)]
pub struct ProxyResponse {
  /// Response status code
  pub status: StatusCode,
  /// Response headers
  pub headers: HeaderMap,
  /// Response body, possibly rewritten
  pub body: Bytes,
}

impl ProxyResponse {
  /// Snapshot an upstream response, draining its body.
  pub async fn from_upstream(response: reqwest::Response) -> Result<Self> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;
    Ok(ProxyResponse {
      status,
      headers,
      body,
    })
  }

  /// Canonical status text for the status code.
  pub fn status_text(&self) -> &'static str {
    self.status.canonical_reason().unwrap_or("Unknown")
  }

  /// Serialize as an HTTP/1.1 response for the victim socket.
  pub fn to_raw(&self) -> Bytes {
    let mut buf = Vec::with_capacity(self.body.len() + 256);
    buf.extend_from_slice(
      format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), self.status_text()).as_bytes(),
    );
    for (name, value) in self.headers.iter() {
      buf.extend_from_slice(name.as_str().as_bytes());
      buf.extend_from_slice(b": ");
      buf.extend_from_slice(value.as_bytes());
      buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(&self.body);
    Bytes::from(buf)
  }
}
