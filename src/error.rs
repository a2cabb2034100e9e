//! Error types for the stripping proxy
use thiserror::Error as ThisError;

/// A `Result` alias where the `Err` case is `sslstrip::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors that may occur while proxying a transaction.
#[derive(ThisError, Debug)]
pub enum Error {
  /// IO error on the victim socket or the log sink
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  /// http::Error
  #[error("HTTP error: {0}")]
  Http(http::Error),
  /// URL parse error
  #[error("URL error: {0}")]
  Url(#[from] url::ParseError),
  /// Upstream transport error
  #[error("upstream error: {0}")]
  Upstream(#[from] reqwest::Error),
  /// Malformed victim request
  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

impl Error {
  /// Create an invalid request error and log it
  pub fn invalid_request(msg: impl Into<String>) -> Self {
    let error = Error::InvalidRequest(msg.into());
    tracing::error!("Invalid request: {}", error);
    error
  }
}

impl From<http::Error> for Error {
  fn from(value: http::Error) -> Self {
    Error::Http(value)
  }
}

impl From<http::header::InvalidHeaderName> for Error {
  fn from(value: http::header::InvalidHeaderName) -> Self {
    Error::Http(http::Error::from(value))
  }
}

impl From<http::header::InvalidHeaderValue> for Error {
  fn from(value: http::header::InvalidHeaderValue) -> Self {
    Error::Http(http::Error::from(value))
  }
}

impl From<http::method::InvalidMethod> for Error {
  fn from(value: http::method::InvalidMethod) -> Self {
    Error::Http(http::Error::from(value))
  }
}
