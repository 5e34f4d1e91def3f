// src/transport/mock.rs

//! In-memory connection doubles for exercising `Client` without a network.
//!
//! A `MockFactory` hands out `MockConnection`s that share one `MockPeer`
//! state: tests push inbound frames or read errors into it, observe the frames
//! the client wrote, and script connect/close failures and write latency.

use super::{Connection, ConnectionFactory, Frame};
use crate::error::{BoxError, Interrupted};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct MockPeer {
  inbound_tx: async_channel::Sender<Result<Frame, String>>,
  inbound_rx: async_channel::Receiver<Result<Frame, String>>,
  written_tx: async_channel::Sender<Frame>,
  written_rx: async_channel::Receiver<Frame>,
  connect_error: Mutex<Option<String>>,
  close_error: Mutex<Option<String>>,
  connect_delay: Mutex<Duration>,
  write_delay: Mutex<Duration>,
  connects: AtomicUsize,
  writes: AtomicUsize,
  closes: AtomicUsize,
}

/// Factory handing out connections backed by the shared in-memory peer.
#[derive(Debug, Clone)]
pub struct MockFactory {
  peer: Arc<MockPeer>,
}

impl Default for MockFactory {
  fn default() -> Self {
    Self::new()
  }
}

impl MockFactory {
  pub fn new() -> Self {
    let (inbound_tx, inbound_rx) = async_channel::unbounded();
    let (written_tx, written_rx) = async_channel::unbounded();
    Self {
      peer: Arc::new(MockPeer {
        inbound_tx,
        inbound_rx,
        written_tx,
        written_rx,
        connect_error: Mutex::new(None),
        close_error: Mutex::new(None),
        connect_delay: Mutex::new(Duration::ZERO),
        write_delay: Mutex::new(Duration::ZERO),
        connects: AtomicUsize::new(0),
        writes: AtomicUsize::new(0),
        closes: AtomicUsize::new(0),
      }),
    }
  }

  /// Makes every following connect attempt fail with `message`.
  pub fn fail_connect(&self, message: impl Into<String>) {
    *self.peer.connect_error.lock() = Some(message.into());
  }

  pub fn clear_connect_failure(&self) {
    *self.peer.connect_error.lock() = None;
  }

  /// Makes every following close fail with `message`.
  pub fn fail_close(&self, message: impl Into<String>) {
    *self.peer.close_error.lock() = Some(message.into());
  }

  pub fn set_connect_delay(&self, delay: Duration) {
    *self.peer.connect_delay.lock() = delay;
  }

  /// Delay applied before a written frame becomes observable.
  pub fn set_write_delay(&self, delay: Duration) {
    *self.peer.write_delay.lock() = delay;
  }

  /// Queues a frame for the next `read_message`.
  pub fn push_inbound(&self, frame: Frame) {
    let _ = self.peer.inbound_tx.try_send(Ok(frame));
  }

  /// Queues a failure for the next `read_message`.
  pub fn push_read_error(&self, message: impl Into<String>) {
    let _ = self.peer.inbound_tx.try_send(Err(message.into()));
  }

  /// Frames written through any connection of this factory, in write order.
  pub fn written(&self) -> async_channel::Receiver<Frame> {
    self.peer.written_rx.clone()
  }

  pub fn connect_count(&self) -> usize {
    self.peer.connects.load(Ordering::Acquire)
  }

  /// Writes that started, including ones whose caller gave up waiting.
  pub fn write_count(&self) -> usize {
    self.peer.writes.load(Ordering::Acquire)
  }

  pub fn close_count(&self) -> usize {
    self.peer.closes.load(Ordering::Acquire)
  }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
  async fn connect(&self, address: &str, cancel: CancellationToken) -> Result<Arc<dyn Connection>, BoxError> {
    let delay = *self.peer.connect_delay.lock();
    if !delay.is_zero() {
      tokio::select! {
        _ = cancel.cancelled() => return Err(Box::new(Interrupted::Cancelled)),
        _ = tokio::time::sleep(delay) => {}
      }
    }
    if let Some(message) = self.peer.connect_error.lock().clone() {
      return Err(message.into());
    }
    self.peer.connects.fetch_add(1, Ordering::AcqRel);
    Ok(Arc::new(MockConnection {
      address: address.to_string(),
      peer: self.peer.clone(),
    }))
  }
}

/// Connection handed out by `MockFactory`.
#[derive(Debug)]
pub struct MockConnection {
  address: String,
  peer: Arc<MockPeer>,
}

impl MockConnection {
  pub fn address(&self) -> &str {
    &self.address
  }
}

#[async_trait]
impl Connection for MockConnection {
  async fn read_message(&self) -> Result<Frame, BoxError> {
    // The peer keeps a sender alive, so this only resolves on pushed input.
    match self.peer.inbound_rx.recv().await {
      Ok(Ok(frame)) => Ok(frame),
      Ok(Err(message)) => Err(message.into()),
      Err(e) => Err(Box::new(e)),
    }
  }

  async fn write_message(&self, message_type: i32, payload: Bytes) -> Result<(), BoxError> {
    self.peer.writes.fetch_add(1, Ordering::AcqRel);
    let delay = *self.peer.write_delay.lock();
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
    self
      .peer
      .written_tx
      .send(Frame { message_type, payload })
      .await
      .map_err(|e| Box::new(e) as BoxError)
  }

  async fn close(&self) -> Result<(), BoxError> {
    self.peer.closes.fetch_add(1, Ordering::AcqRel);
    match self.peer.close_error.lock().clone() {
      Some(message) => Err(message.into()),
      None => Ok(()),
    }
  }
}
