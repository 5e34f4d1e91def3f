// src/transport/tcp.rs

use super::codec::FrameCodec;
use super::{Connection, ConnectionFactory, Frame};
use crate::error::{BoxError, Interrupted};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::io;
use std::sync::Arc;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

/// Dials `tcp://host:port` (or a bare `host:port`) and frames messages with
/// `FrameCodec`. Installed by `Client::new` when `Params` carries no factory.
#[derive(Debug, Clone)]
pub struct TcpConnectionFactory {
  tcp_nodelay: bool,
  max_frame_size: usize,
}

impl Default for TcpConnectionFactory {
  fn default() -> Self {
    Self {
      tcp_nodelay: true,
      max_frame_size: super::codec::DEFAULT_MAX_FRAME_SIZE,
    }
  }
}

impl TcpConnectionFactory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_nodelay(mut self, enabled: bool) -> Self {
    self.tcp_nodelay = enabled;
    self
  }

  pub fn with_max_frame_size(mut self, max: usize) -> Self {
    self.max_frame_size = max;
    self
  }
}

/// Strips the optional `tcp://` scheme. Other schemes are rejected.
pub(crate) fn parse_tcp_address(address: &str) -> Result<&str, io::Error> {
  let target = match address.split_once("://") {
    Some(("tcp", rest)) => rest,
    Some((scheme, _)) => {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("unsupported transport scheme '{}' in {}", scheme, address),
      ))
    }
    None => address,
  };
  if target.is_empty() {
    return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty address"));
  }
  Ok(target)
}

#[async_trait]
impl ConnectionFactory for TcpConnectionFactory {
  async fn connect(&self, address: &str, cancel: CancellationToken) -> Result<Arc<dyn Connection>, BoxError> {
    let target = parse_tcp_address(address)?;
    tracing::debug!(address = %address, "Dialing TCP endpoint");

    let stream = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(Box::new(Interrupted::Cancelled)),
      res = TcpStream::connect(target) => res?,
    };
    stream.set_nodelay(self.tcp_nodelay)?;

    let peer = stream
      .peer_addr()
      .map(|a| a.to_string())
      .unwrap_or_else(|_| target.to_string());
    tracing::info!(peer = %peer, "TCP connection established");

    let codec = FrameCodec::with_max_frame_size(self.max_frame_size);
    Ok(Arc::new(TcpConnection::new(stream, peer, codec)))
  }
}

/// A framed TCP stream split into independently locked read and write halves,
/// so the receive pump and senders never contend with each other.
///
/// `close` first trips `closed`, which aborts any read or write still waiting
/// on the socket, so it never queues behind a write stalled by backpressure.
#[derive(Debug)]
pub struct TcpConnection {
  peer: String,
  closed: CancellationToken,
  reader: Mutex<FramedRead<OwnedReadHalf, FrameCodec>>,
  writer: Mutex<FramedWrite<OwnedWriteHalf, FrameCodec>>,
}

impl TcpConnection {
  pub fn new(stream: TcpStream, peer: String, codec: FrameCodec) -> Self {
    let (read_half, write_half) = stream.into_split();
    Self {
      peer,
      closed: CancellationToken::new(),
      reader: Mutex::new(FramedRead::new(read_half, codec.clone())),
      writer: Mutex::new(FramedWrite::new(write_half, codec)),
    }
  }

  pub fn peer(&self) -> &str {
    &self.peer
  }
}

#[async_trait]
impl Connection for TcpConnection {
  async fn read_message(&self) -> Result<Frame, BoxError> {
    let mut reader = self.reader.lock().await;
    let next = tokio::select! {
      biased;
      _ = self.closed.cancelled() => return Err(Box::new(connection_closed())),
      next = reader.next() => next,
    };
    match next {
      Some(Ok(frame)) => Ok(frame),
      Some(Err(e)) => Err(Box::new(e)),
      None => Err(Box::new(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed by peer",
      ))),
    }
  }

  async fn write_message(&self, message_type: i32, payload: Bytes) -> Result<(), BoxError> {
    let write = async {
      let mut writer = self.writer.lock().await;
      writer.send(Frame { message_type, payload }).await
    };
    tokio::select! {
      biased;
      _ = self.closed.cancelled() => Err(Box::new(connection_closed()) as BoxError),
      res = write => Ok(res?),
    }
  }

  async fn close(&self) -> Result<(), BoxError> {
    tracing::debug!(peer = %self.peer, "Closing TCP connection");
    self.closed.cancel();
    // Every send flushes, so anything still buffered belongs to an aborted
    // write and is discarded.
    let mut writer = self.writer.lock().await;
    writer.get_mut().shutdown().await?;
    Ok(())
  }
}

fn connection_closed() -> io::Error {
  io::Error::new(io::ErrorKind::NotConnected, "connection closed")
}
