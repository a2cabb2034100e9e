//! Victim-facing proxy server

use crate::error::Result;
use crate::headers::{filter_headers, IGNORED_RESPONSE_HEADERS};
use crate::logger::TransactionLog;
use crate::request::ProxyRequest;
use crate::rewrite::Rewriter;
use crate::upstream::Upstream;
use http::header::{HeaderValue, CONNECTION, TRANSFER_ENCODING};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Victim-facing listener plus the shared transaction machinery.
pub struct ProxyServer {
  listener: TcpListener,
  rewriter: Rewriter,
  upstream: Arc<Upstream>,
  log: Arc<TransactionLog>,
}

impl ProxyServer {
  /// Bind the listener. A bind failure is a fatal startup error.
  pub async fn bind(
    addr: &str,
    rewriter: Rewriter,
    upstream: Arc<Upstream>,
    log: Arc<TransactionLog>,
  ) -> Result<Self> {
    let listener = TcpListener::bind(addr).await?;
    Ok(Self {
      listener,
      rewriter,
      upstream,
      log,
    })
  }

  /// The address the listener actually bound to.
  pub fn local_addr(&self) -> Result<SocketAddr> {
    Ok(self.listener.local_addr()?)
  }

  /// Accept victim connections forever, one spawned task each.
  ///
  /// Per-transaction failures are logged and the victim connection is
  /// closed without a response; they never take the server down.
  pub async fn serve(self) -> Result<()> {
    loop {
      match self.listener.accept().await {
        Ok((stream, peer)) => {
          let rewriter = self.rewriter.clone();
          let upstream = self.upstream.clone();
          let log = self.log.clone();
          tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer, rewriter, upstream, log).await {
              tracing::error!("error handling connection from {}: {}", peer, err);
            }
          });
        }
        Err(err) => {
          tracing::error!("failed to accept connection: {}", err);
        }
      }
    }
  }
}

/// One proxy transaction: parse, log, upgrade, dispatch, strip, log,
/// write back. The connection is closed after one response; with
/// `Content-Length` stripped, close is what delimits the body.
async fn handle_connection(
  stream: TcpStream,
  peer: SocketAddr,
  rewriter: Rewriter,
  upstream: Arc<Upstream>,
  log: Arc<TransactionLog>,
) -> Result<()> {
  let (read_half, mut write_half) = stream.into_split();
  let mut reader = BufReader::new(read_half);

  let mut request = ProxyRequest::read(&mut reader, peer).await?;
  log.record_request(&request).await?;

  rewriter.upgrade_request(&mut request).await?;
  let mut response = upstream.send(&request).await?;
  rewriter.strip_response(&request, &mut response).await?;
  log.record_response(&request, &response).await?;

  response.headers = filter_headers(&response.headers, &IGNORED_RESPONSE_HEADERS);
  response.headers.remove(TRANSFER_ENCODING);
  response
    .headers
    .insert(CONNECTION, HeaderValue::from_static("close"));

  write_half.write_all(&response.to_raw()).await?;
  write_half.shutdown().await?;
  Ok(())
}
