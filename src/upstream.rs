//! Upstream dispatch through a non-redirecting HTTP client

use crate::error::Result;
use crate::request::ProxyRequest;
use crate::response::ProxyResponse;
use http::header::{HeaderName, CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use reqwest::redirect;

/// The client used for all upstream requests.
///
/// Redirects are NOT followed: a redirect is a product to be rewritten,
/// not consumed. Automatic decompression stays off so gzip bodies reach
/// the rewriter verbatim.
#[derive(Clone, Debug)]
pub struct Upstream {
  client: reqwest::Client,
}

impl Upstream {
  /// Build the upstream client.
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .redirect(redirect::Policy::none())
      .http1_only()
      .build()?;
    Ok(Self { client })
  }

  /// Execute the rewritten request and snapshot the response.
  pub async fn send(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
    let mut headers = request.headers.clone();
    // framing and connection management belong to this leg, not the
    // victim's
    for name in [CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION] {
      headers.remove(name);
    }
    headers.remove(HeaderName::from_static("proxy-connection"));

    let response = self
      .client
      .request(request.method.clone(), request.target.clone())
      .headers(headers)
      .body(request.body.clone())
      .send()
      .await?;
    ProxyResponse::from_upstream(response).await
  }
}
