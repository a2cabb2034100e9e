//! Top-level proxy instance

use crate::cache::LinkMap;
use crate::config::Config;
use crate::error::Result;
use crate::logger::TransactionLog;
use crate::rewrite::Rewriter;
use crate::server::ProxyServer;
use crate::upstream::Upstream;
use std::sync::Arc;

/// The stripping proxy: configuration, link map, upstream client and
/// transaction log, wired together.
///
/// Each instance owns its own [`LinkMap`], so several proxies can run
/// side by side (and be tested) without sharing state.
pub struct StripProxy {
  config: Config,
  links: Arc<LinkMap>,
  upstream: Arc<Upstream>,
  log: Arc<TransactionLog>,
}

impl StripProxy {
  /// Create a proxy for the given configuration.
  ///
  /// Opens the transaction log sink; a failure here is fatal.
  pub async fn new(config: Config) -> Result<Self> {
    let log = Arc::new(TransactionLog::open(&config).await?);
    Ok(Self {
      config,
      links: Arc::new(LinkMap::new()),
      upstream: Arc::new(Upstream::new()?),
      log,
    })
  }

  /// The link map shared by this proxy's transactions.
  pub fn link_map(&self) -> Arc<LinkMap> {
    self.links.clone()
  }

  /// Bind the victim-facing listener for this proxy.
  pub async fn server(&self) -> Result<ProxyServer> {
    let addr = format!("0.0.0.0:{}", self.config.port);
    ProxyServer::bind(
      &addr,
      Rewriter::new(self.links.clone()),
      self.upstream.clone(),
      self.log.clone(),
    )
    .await
  }

  /// Bind and serve until the process exits.
  pub async fn start(&self) -> Result<()> {
    let server = self.server().await?;
    tracing::info!("listening on {}", server.local_addr()?);
    server.serve().await
  }
}
