// tests/tcp_client.rs

use futures::{SinkExt, StreamExt};
use rsock::{factory_fn, Config, Connection, ConnectionFactory, Frame, SocketErrorKind, TcpConnectionFactory};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
mod common;

const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
const LONG_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_tcp_send_and_listen_roundtrip() -> anyhow::Result<()> {
  let (listener, address) = common::bind_loopback().await;
  let client = common::tcp_client(&address, Config::default());

  let (connected, mut peer) = tokio::join!(client.connect(), common::accept_framed(&listener, LONG_TIMEOUT));
  connected?;
  assert!(client.is_connected());

  client.send("ping").await?;
  let received = timeout(SHORT_TIMEOUT, peer.next())
    .await?
    .expect("peer stream open")?;
  assert_eq!(received, Frame::new(0, &b"ping"[..]));

  peer.send(Frame::new(7, &b"pong"[..])).await?;
  let reply = timeout(SHORT_TIMEOUT, client.listen().recv()).await??;
  let reply = reply?;
  assert_eq!(reply.message_type, 7);
  assert_eq!(&reply.payload[..], b"pong");

  client.disconnect().await?;
  assert!(!client.is_connected());

  // The peer sees the stream end rather than another frame.
  let end = timeout(SHORT_TIMEOUT, peer.next()).await?;
  assert!(!matches!(end, Some(Ok(_))));
  Ok(())
}

#[tokio::test]
async fn test_peer_hangup_surfaces_as_read_error() -> anyhow::Result<()> {
  let (listener, address) = common::bind_loopback().await;
  let client = common::tcp_client(&address, Config::default());

  let (connected, peer) = tokio::join!(client.connect(), common::accept_framed(&listener, LONG_TIMEOUT));
  connected?;
  drop(peer);

  let item = timeout(SHORT_TIMEOUT, client.listen().recv()).await??;
  let err = item.expect_err("hangup should be reported as a read failure");
  assert!(err.is(SocketErrorKind::UnexpectedSocketError));
  assert!(client.is_connected(), "read failures never disconnect on their own");

  client.disconnect().await?;
  Ok(())
}

#[tokio::test]
async fn test_connect_refused_leaves_client_disconnected() {
  let (listener, address) = common::bind_loopback().await;
  drop(listener);

  let client = common::tcp_client(&address, Config::default().with_connect_timeout(LONG_TIMEOUT));
  let err = client.connect().await.expect_err("nobody is listening");
  assert_eq!(err.kind(), SocketErrorKind::FailedToConnect);
  assert!(!client.is_connected());
  assert!(!client.is_connecting());
}

#[tokio::test]
async fn test_zero_connect_timeout_never_dials() {
  let (listener, address) = common::bind_loopback().await;
  let client = common::tcp_client(&address, Config::default().with_connect_timeout(Duration::ZERO));

  let err = client.connect().await.expect_err("zero timeout must fail");
  assert!(err.is(SocketErrorKind::FailedToConnect));
  assert_eq!(err.interrupted(), Some(rsock::Interrupted::DeadlineExceeded));
  assert!(!client.is_connected());

  let accepted = timeout(Duration::from_millis(50), listener.accept()).await;
  assert!(accepted.is_err(), "no connection attempt should reach the listener");
}

#[tokio::test]
async fn test_unsupported_scheme_fails_to_connect() {
  let client = common::tcp_client("wss://localhost:3333", Config::default());
  let err = client.connect().await.expect_err("only tcp is dialed");
  assert!(err.is(SocketErrorKind::FailedToConnect));
}

#[tokio::test]
async fn test_closure_factory_is_used() -> anyhow::Result<()> {
  let (listener, address) = common::bind_loopback().await;
  let dials = Arc::new(AtomicUsize::new(0));

  let counter = dials.clone();
  let factory = factory_fn(move |address: String, cancel| {
    let counter = counter.clone();
    async move {
      counter.fetch_add(1, Ordering::SeqCst);
      let conn: Arc<dyn Connection> = TcpConnectionFactory::new().connect(&address, cancel).await?;
      Ok::<_, rsock::BoxError>(conn)
    }
  });

  let client = rsock::Client::new(
    rsock::Params::default()
      .with_config(Config::default().with_address(address))
      .with_factory(factory)
      .with_signal_handling(false),
  );

  let (connected, mut peer) = tokio::join!(client.connect(), common::accept_framed(&listener, LONG_TIMEOUT));
  connected?;
  assert_eq!(dials.load(Ordering::SeqCst), 1);

  client.send_with_type(3, vec![0xde, 0xad]).await?;
  let frame = timeout(SHORT_TIMEOUT, peer.next()).await?.expect("peer stream open")?;
  assert_eq!(frame, Frame::new(3, vec![0xde, 0xad]));

  client.disconnect().await?;
  Ok(())
}
