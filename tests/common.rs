// tests/common.rs
#![allow(dead_code)]

use rsock::transport::FrameCodec;
use rsock::{Client, Config, Params};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use std::sync::Once;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

static TRACING_INIT: Once = Once::new();

fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    let default_filter = "rsock=trace,info";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_line_number(true)
      .with_span_events(FmtSpan::CLOSE)
      .with_test_writer()
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

/// Loopback listener on an ephemeral port, plus its `tcp://` address.
pub async fn bind_loopback() -> (TcpListener, String) {
  setup_tracing();
  let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
  let addr = listener.local_addr().expect("local addr");
  (listener, format!("tcp://{}", addr))
}

/// Accepts one peer and frames it the way the client does.
pub async fn accept_framed(listener: &TcpListener, within: Duration) -> Framed<TcpStream, FrameCodec> {
  let (stream, _) = tokio::time::timeout(within, listener.accept())
    .await
    .expect("peer should connect in time")
    .expect("accept");
  Framed::new(stream, FrameCodec::new())
}

/// A TCP client for `address` that ignores process signals.
pub fn tcp_client(address: &str, config: Config) -> Client {
  setup_tracing();
  Client::new(
    Params::default()
      .with_config(config.with_address(address))
      .with_signal_handling(false),
  )
}
