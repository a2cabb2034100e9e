use anyhow::Result;
use clap::Parser;
use sslstrip::{Config, StripProxy};
use std::path::PathBuf;

/// SSL-stripping interception proxy.
///
/// Accepts plaintext HTTP on the listen port, forwards upstream and
/// downgrades every https reference in the response. Use only against
/// traffic you are authorized to intercept.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
  /// Port to listen on.
  #[arg(long, default_value_t = 8000)]
  port: u16,

  /// The output log file, or empty for stdout.
  #[arg(long)]
  filename: Option<PathBuf>,

  /// Log only POST requests.
  #[arg(long)]
  post_only: bool,

  /// Log responses.
  #[arg(long)]
  log_response: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = Config {
    port: args.port,
    filename: args.filename,
    post_only: args.post_only,
    log_response: args.log_response,
  };

  let proxy = StripProxy::new(config).await?;
  proxy.start().await?;
  Ok(())
}
