//! Victim-side request parsing

use crate::error::{Error, Result};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{Method, Version};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use url::Url;

const MAX_REQUEST_LINE: usize = 8 * 1024;
const MAX_HEADERS_SIZE: usize = 64 * 1024;

/// A parsed victim request, body fully buffered.
///
/// `target` starts out as the url the victim asked for and is replaced
/// with the original https url when the rewriter finds a cached link.
#[derive(Clone, Debug)]
pub struct ProxyRequest {
  /// Victim peer string (`host:port`)
  pub peer: String,
  /// Request method
  pub method: Method,
  /// HTTP version of the victim leg
  pub version: Version,
  /// Absolute request target
  pub target: Url,
  /// Request headers
  pub headers: HeaderMap,
  /// Fully drained request body
  pub body: Bytes,
}

impl ProxyRequest {
  /// Read one request off the victim connection.
  ///
  /// Parses the request line and headers in origin-form or
  /// absolute-form, then drains the body per `Content-Length` or
  /// chunked framing so the same bytes are available for logging and
  /// for the upstream dispatch.
  pub async fn read<R>(reader: &mut BufReader<R>, peer: SocketAddr) -> Result<Self>
  where
    R: AsyncRead + Unpin,
  {
    let mut request_line = Vec::new();
    let n = reader.read_until(b'\n', &mut request_line).await?;
    if n == 0 {
      return Err(Error::invalid_request("connection closed before request"));
    }
    if request_line.len() > MAX_REQUEST_LINE {
      return Err(Error::invalid_request("request line too long"));
    }

    let request_line = String::from_utf8_lossy(&request_line);
    let mut parts = request_line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
      (Some(m), Some(t), Some(v)) => (m, t, v),
      _ => return Err(Error::invalid_request("invalid request line")),
    };

    let method = Method::from_bytes(method.as_bytes())?;
    let version = match version {
      "HTTP/1.0" => Version::HTTP_10,
      "HTTP/1.1" => Version::HTTP_11,
      other => {
        return Err(Error::invalid_request(format!(
          "unsupported http version {other}"
        )))
      }
    };

    let headers = read_headers(reader).await?;

    let target = if target.starts_with("http://") || target.starts_with("https://") {
      Url::parse(target)?
    } else {
      let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::invalid_request("missing host header"))?;
      Url::parse(&format!("http://{host}{target}"))?
    };

    let body = read_body(reader, &headers).await?;

    Ok(ProxyRequest {
      peer: peer.to_string(),
      method,
      version,
      target,
      headers,
      body,
    })
  }
}

async fn read_headers<R>(reader: &mut BufReader<R>) -> Result<HeaderMap>
where
  R: AsyncRead + Unpin,
{
  let mut headers = HeaderMap::new();
  let mut header_line = Vec::new();
  let mut total = 0;
  loop {
    header_line.clear();
    let n = reader.read_until(b'\n', &mut header_line).await?;
    if n == 0 || header_line == b"\r\n" || header_line == b"\n" {
      break;
    }
    total += n;
    if total > MAX_HEADERS_SIZE {
      return Err(Error::invalid_request("headers size exceeds maximum allowed"));
    }
    if let (Some(k), Some(v)) = parse_header(&header_line)? {
      if headers.contains_key(&k) {
        headers.append(k, v);
      } else {
        headers.insert(k, v);
      }
    }
  }
  Ok(headers)
}

fn parse_header(buffer: &[u8]) -> Result<(Option<HeaderName>, Option<HeaderValue>)> {
  let mut k = None;
  let mut v = None;
  let buffer = buffer
    .strip_suffix(b"\r\n")
    .or_else(|| buffer.strip_suffix(b"\n"))
    .unwrap_or(buffer);
  for (index, part) in buffer.splitn(2, |b| *b == b':').enumerate() {
    let part = part.strip_prefix(b" ").unwrap_or(part);
    match index {
      0 => k = Some(HeaderName::from_bytes(part)?),
      1 => v = Some(HeaderValue::from_bytes(part)?),
      _ => {}
    }
  }
  Ok((k, v))
}

async fn read_body<R>(reader: &mut BufReader<R>, headers: &HeaderMap) -> Result<Bytes>
where
  R: AsyncRead + Unpin,
{
  if let Some(te) = headers.get(TRANSFER_ENCODING) {
    if te == "chunked" {
      return read_chunked_body(reader).await;
    }
  }
  let content_length: usize = headers
    .get(CONTENT_LENGTH)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.parse().ok())
    .unwrap_or(0);
  if content_length == 0 {
    return Ok(Bytes::new());
  }
  let mut body = vec![0u8; content_length];
  reader.read_exact(&mut body).await?;
  Ok(Bytes::from(body))
}

async fn read_chunked_body<R>(reader: &mut BufReader<R>) -> Result<Bytes>
where
  R: AsyncRead + Unpin,
{
  let mut body = Vec::new();
  loop {
    let mut size_line = Vec::new();
    let n = reader.read_until(b'\n', &mut size_line).await?;
    if n == 0 {
      return Err(Error::invalid_request("unexpected end of chunked body"));
    }
    let size_line = String::from_utf8_lossy(&size_line);
    let size = size_line
      .trim()
      .split(';')
      .next()
      .and_then(|s| usize::from_str_radix(s, 16).ok())
      .ok_or_else(|| Error::invalid_request("invalid chunk size"))?;
    if size == 0 {
      break;
    }
    let mut chunk = vec![0u8; size];
    reader.read_exact(&mut chunk).await?;
    body.extend_from_slice(&chunk);
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf).await?;
  }
  // trailers, if any, up to the final blank line
  let mut line = Vec::new();
  loop {
    line.clear();
    let n = reader.read_until(b'\n', &mut line).await?;
    if n == 0 || line == b"\r\n" || line == b"\n" {
      break;
    }
  }
  Ok(Bytes::from(body))
}
