//! Header deny lists and filtering

use http::header::{
  HeaderMap, HeaderName, CACHE_CONTROL, CONTENT_LENGTH, IF_MODIFIED_SINCE, IF_NONE_MATCH,
  PUBLIC_KEY_PINS, PUBLIC_KEY_PINS_REPORT_ONLY, STRICT_TRANSPORT_SECURITY,
};

/// Request headers dropped before dispatching upstream so the origin is
/// forced to serve fresh content the rewriter can inspect.
pub const IGNORED_REQUEST_HEADERS: [HeaderName; 3] =
  [CACHE_CONTROL, IF_MODIFIED_SINCE, IF_NONE_MATCH];

/// Response headers dropped before writing back to the victim.
///
/// `Content-Length` changes after stripping; the HSTS and HPKP headers
/// would defeat future stripping.
pub const IGNORED_RESPONSE_HEADERS: [HeaderName; 4] = [
  CONTENT_LENGTH,
  PUBLIC_KEY_PINS,
  PUBLIC_KEY_PINS_REPORT_ONLY,
  STRICT_TRANSPORT_SECURITY,
];

/// Copy `source` into a new header set, skipping names in `deny`.
///
/// Retained entries keep their insertion-equivalent order and the full
/// multi-value structure, one slot per original header line. Header
/// names are canonicalized to lowercase by `HeaderMap`, so deny-list
/// matching is case-insensitive on the wire form.
pub fn filter_headers(source: &HeaderMap, deny: &[HeaderName]) -> HeaderMap {
  let mut filtered = HeaderMap::with_capacity(source.len());
  for (name, value) in source.iter() {
    if deny.contains(name) {
      continue;
    }
    filtered.append(name.clone(), value.clone());
  }
  filtered
}

#[cfg(test)]
mod tests {
  use super::*;
  use http::header::{HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};

  #[test]
  fn request_deny_list_is_dropped() {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(IF_MODIFIED_SINCE, HeaderValue::from_static("yesterday"));
    headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"etag\""));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));

    let filtered = filter_headers(&headers, &IGNORED_REQUEST_HEADERS);
    assert_eq!(filtered.len(), 1);
    assert!(filtered.contains_key(CONTENT_TYPE));
  }

  #[test]
  fn response_deny_list_is_dropped() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
    headers.insert(
      STRICT_TRANSPORT_SECURITY,
      HeaderValue::from_static("max-age=31536000"),
    );
    headers.insert(PUBLIC_KEY_PINS, HeaderValue::from_static("pin-sha256=x"));
    headers.insert(
      PUBLIC_KEY_PINS_REPORT_ONLY,
      HeaderValue::from_static("pin-sha256=y"),
    );
    headers.insert(LOCATION, HeaderValue::from_static("http://x.test/"));

    let filtered = filter_headers(&headers, &IGNORED_RESPONSE_HEADERS);
    assert_eq!(filtered.len(), 1);
    assert!(filtered.contains_key(LOCATION));
  }

  #[test]
  fn multi_value_structure_is_preserved() {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
    headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
    headers.append(SET_COOKIE, HeaderValue::from_static("c=3"));

    let filtered = filter_headers(&headers, &IGNORED_RESPONSE_HEADERS);
    let cookies: Vec<_> = filtered.get_all(SET_COOKIE).iter().collect();
    assert_eq!(cookies.len(), 3);
    assert_eq!(cookies[0], "a=1");
    assert_eq!(cookies[1], "b=2");
    assert_eq!(cookies[2], "c=3");
  }
}
