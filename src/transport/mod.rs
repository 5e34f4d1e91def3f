// src/transport/mod.rs

//! The seams between the client and the network: the `Connection`
//! capability, the `ConnectionFactory` that produces it, and the built-in TCP
//! implementation used when no factory is injected.

pub mod codec;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod tcp;

pub use codec::{CodecError, FrameCodec};
pub use tcp::{TcpConnection, TcpConnectionFactory};

use crate::error::BoxError;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Message type used by `Client::send`.
pub const DEFAULT_MESSAGE_TYPE: i32 = 0;

/// One message as exchanged with a `Connection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  pub message_type: i32,
  pub payload: Bytes,
}

impl Frame {
  pub fn new(message_type: i32, payload: impl Into<Bytes>) -> Self {
    Self {
      message_type,
      payload: payload.into(),
    }
  }
}

/// An established duplex connection.
///
/// One reader and one writer (or closer) may call into the same instance
/// concurrently. `read_message` is raced against cancellation by the receive
/// pump and must therefore be cancel-safe: dropping the future must not lose
/// a partially received message.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
  /// Waits for the next inbound message.
  async fn read_message(&self) -> Result<Frame, BoxError>;

  /// Writes one message.
  async fn write_message(&self, message_type: i32, payload: Bytes) -> Result<(), BoxError>;

  /// Closes the connection. Pending and later reads should fail, and a write
  /// still in flight must not keep `close` waiting.
  async fn close(&self) -> Result<(), BoxError>;
}

/// Produces connections for a `Client`.
///
/// Implementations must return promptly once `cancel` fires. The client
/// additionally bounds the call by the configured connect timeout.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
  async fn connect(&self, address: &str, cancel: CancellationToken) -> Result<Arc<dyn Connection>, BoxError>;
}

/// Adapts an async closure into a `ConnectionFactory`.
pub fn factory_fn<F, Fut>(f: F) -> FactoryFn<F>
where
  F: Fn(String, CancellationToken) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Arc<dyn Connection>, BoxError>> + Send + 'static,
{
  FactoryFn { f }
}

/// See [`factory_fn`].
#[derive(Clone)]
pub struct FactoryFn<F> {
  f: F,
}

#[async_trait]
impl<F, Fut> ConnectionFactory for FactoryFn<F>
where
  F: Fn(String, CancellationToken) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Arc<dyn Connection>, BoxError>> + Send + 'static,
{
  async fn connect(&self, address: &str, cancel: CancellationToken) -> Result<Arc<dyn Connection>, BoxError> {
    (self.f)(address.to_string(), cancel).await
  }
}

impl<F> fmt::Debug for FactoryFn<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FactoryFn").finish_non_exhaustive()
  }
}
