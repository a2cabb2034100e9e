//! Proxy configuration

use std::path::PathBuf;

/// Configuration for the stripping proxy.
///
/// Fixed at startup and immutable for the process lifetime.
#[derive(Clone, Debug)]
pub struct Config {
  /// TCP port the victim-facing listener binds to. `0` picks an
  /// ephemeral port, which is reported by the bound server.
  pub port: u16,
  /// Target path for the transaction log, or `None` for standard output
  pub filename: Option<PathBuf>,
  /// Restrict request logging to `POST` requests
  pub post_only: bool,
  /// Log rewritten responses in addition to requests
  pub log_response: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      port: 8000,
      filename: None,
      post_only: false,
      log_response: false,
    }
  }
}
