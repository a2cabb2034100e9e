//! Per-client cache mapping stripped links to their https originals

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cache key pairing a client identity with a stripped url.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LinkKey {
  /// Client identity (host portion of the victim peer string)
  pub client: String,
  /// Normalized stripped url as served to the victim
  pub url: String,
}

impl LinkKey {
  /// Build a key from a client identity and a stripped url.
  pub fn new(client: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      client: client.into(),
      url: url.into(),
    }
  }
}

/// Mapping from stripped urls back to the https originals observed
/// upstream, partitioned per client.
///
/// Shared by all in-flight transactions under a reader-writer
/// discipline: lookups proceed concurrently, stores are exclusive.
/// Entries never expire; a later store for the same key silently
/// overwrites. The map is owned by the proxy instance and handed to
/// transactions behind an `Arc`.
#[derive(Debug, Default)]
pub struct LinkMap {
  inner: RwLock<HashMap<LinkKey, String>>,
}

impl LinkMap {
  /// Create an empty map.
  pub fn new() -> Self {
    Self::default()
  }

  /// Return the original url recorded for `key`, if any.
  pub async fn lookup(&self, key: &LinkKey) -> Option<String> {
    self.inner.read().await.get(key).cloned()
  }

  /// Record `original` as the url that was stripped down to `key`.
  pub async fn store(&self, key: LinkKey, original: impl Into<String>) {
    self.inner.write().await.insert(key, original.into());
  }

  /// Number of recorded links.
  pub async fn len(&self) -> usize {
    self.inner.read().await.len()
  }

  /// Whether any link has been recorded yet.
  pub async fn is_empty(&self) -> bool {
    self.inner.read().await.is_empty()
  }
}
