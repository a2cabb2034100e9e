//! SSL-stripping interception proxy
//!
//! This crate sits in the path of victim-to-origin HTTP traffic (put
//! there by external network-layer redirection such as ARP spoofing and
//! NAT rules), forwards each request upstream and rewrites the origin's
//! response so that every https reference is downgraded to http. Each
//! rewrite is remembered per client, so a later insecure request can be
//! transparently upgraded back to https upstream — the victim browses
//! over cleartext while the origin sees a normal secure session.
//!
//! # Pipeline
//!
//! victim → [`ProxyServer`] → [`Rewriter::upgrade_request`] → upstream
//! client → [`Rewriter::strip_response`] (consulting and seeding the
//! [`LinkMap`], gzip round trip included) → header projection → victim.
//!
//! # Example
//!
//! ```no_run
//! use sslstrip::{Config, StripProxy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let proxy = StripProxy::new(Config::default()).await?;
//!     proxy.start().await?;
//!     Ok(())
//! }
//! ```
//!
//! This tool performs a man-in-the-middle attack. Use it only against
//! traffic you are authorized to intercept.

mod cache;
mod config;
mod error;
mod headers;
mod logger;
mod normalize;
mod proxy;
mod request;
mod response;
mod rewrite;
mod server;
mod upstream;

pub use cache::{LinkKey, LinkMap};
pub use config::Config;
pub use error::{Error, Result};
pub use headers::{filter_headers, IGNORED_REQUEST_HEADERS, IGNORED_RESPONSE_HEADERS};
pub use logger::TransactionLog;
pub use normalize::{client_id, normalize_url};
pub use proxy::StripProxy;
pub use request::ProxyRequest;
pub use response::ProxyResponse;
pub use rewrite::Rewriter;
pub use server::ProxyServer;
pub use upstream::Upstream;
