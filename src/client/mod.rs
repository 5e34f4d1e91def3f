// src/client/mod.rs

//! The connection lifecycle: `Client` state transitions, the send path and the
//! receive pump that feeds `listen`.

mod pump;
mod state;

use crate::error::{BoxError, Interrupted, SocketError};
use crate::params::Params;
use crate::transport::{Connection, ConnectionFactory, Frame, TcpConnectionFactory, DEFAULT_MESSAGE_TYPE};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use pump::ReceivePump;
use state::{ClientState, ConnectingGuard, PumpHandle, SharedState};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;

/// Slots in the outbound sequence. The pump reads at most this many frames
/// ahead of the consumer.
pub const OUTBOUND_CAPACITY: usize = 1;

/// One unit delivered by the receive pump: a frame, or the failure of one read.
pub type SocketData = Result<Frame, SocketError>;

/// The outbound sequence of one connected period. It yields `SocketData`
/// until the pump stops, then reports closed. Clones compete for items.
pub type Listener = async_channel::Receiver<SocketData>;

fn interrupted(reason: Interrupted) -> BoxError {
  Box::new(reason)
}

/// The connect/disconnect/send/listen surface of a socket client.
#[async_trait]
pub trait SocketClient: Send + Sync {
  async fn connect(&self) -> Result<(), SocketError>;
  async fn disconnect(&self) -> Result<(), SocketError>;
  async fn send(&self, message: Bytes) -> Result<(), SocketError>;
  fn listen(&self) -> Listener;
}

/// Lifecycle wrapper around one duplex connection.
///
/// All methods take `&self`; share a client between tasks with `Arc<Client>`.
/// `connect` and `disconnect` are serialized against each other, while `send`
/// and `listen` only take a short read of the state and are never held up by
/// a slow dial or close.
///
/// Call `disconnect` before dropping a connected client: dropping stops the
/// receive pump but does not close the connection.
pub struct Client {
  params: Params,
  factory: Arc<dyn ConnectionFactory>,
  // Serializes connect/disconnect. Held across the dial and the teardown.
  transition: Mutex<()>,
  state: SharedState,
}

impl Client {
  pub fn new(params: Params) -> Self {
    let factory: Arc<dyn ConnectionFactory> = match &params.factory {
      Some(factory) => factory.clone(),
      None => Arc::new(TcpConnectionFactory::default()),
    };
    Self {
      params,
      factory,
      transition: Mutex::new(()),
      state: Arc::new(RwLock::new(ClientState::new())),
    }
  }

  pub fn params(&self) -> &Params {
    &self.params
  }

  pub fn is_connected(&self) -> bool {
    self.state.read().connected
  }

  pub fn is_connecting(&self) -> bool {
    self.state.read().connecting
  }

  /// Dials the configured address and starts the receive pump.
  ///
  /// Returns `Ok(())` without doing anything if the client is already
  /// connected or another connect is in flight. Fails with
  /// `SocketError::FailedToConnect` if the factory fails, the connect timeout
  /// elapses, or the params cancellation token fires; the client then stays
  /// disconnected.
  pub async fn connect(&self) -> Result<(), SocketError> {
    if self.state.read().is_active() {
      return Ok(());
    }
    self.connect_locked().instrument(self.params.span.clone()).await
  }

  async fn connect_locked(&self) -> Result<(), SocketError> {
    let _transition = self.transition.lock().await;
    {
      let mut state = self.state.write();
      if state.connecting {
        panic!("connecting flag set inside the connect transition; client state is corrupt");
      }
      if state.connected {
        return Ok(());
      }
      state.connecting = true;
    }
    let mut connecting = ConnectingGuard::new(&self.state);

    let address = self.params.config.address.as_str();
    tracing::debug!(address = %address, timeout = ?self.params.config.connect_timeout, "Connecting");

    let connection = match self.dial().await {
      Ok(connection) => connection,
      Err(cause) => {
        tracing::warn!(address = %address, error = %cause, "Connect failed");
        return Err(SocketError::FailedToConnect(cause));
      }
    };

    let (tx, rx) = async_channel::bounded(OUTBOUND_CAPACITY);
    let pump_cancel = self.params.cancel.child_token();
    let pump = ReceivePump {
      connection: connection.clone(),
      state: self.state.clone(),
      outbound: tx,
      cancel: pump_cancel.clone(),
      handle_signals: self.params.handle_signals,
    };

    {
      let mut state = self.state.write();
      state.connection = Some(connection);
      state.connecting = false;
      state.connected = true;
      state.outbound = rx;
      state.pump = Some(PumpHandle {
        cancel: pump_cancel,
        task: pump.spawn(address),
      });
    }
    connecting.disarm();

    tracing::info!(address = %address, "Connected");
    Ok(())
  }

  /// Runs the factory under the connect timeout and the params token. A zero
  /// timeout is a deadline that has already passed.
  async fn dial(&self) -> Result<Arc<dyn Connection>, BoxError> {
    let config = &self.params.config;
    if config.connect_timeout.is_zero() {
      return Err(interrupted(Interrupted::DeadlineExceeded));
    }

    // The factory's token is scoped to this attempt and cancelled on return.
    let dial_cancel = self.params.cancel.child_token();
    let _dial_scope = dial_cancel.clone().drop_guard();

    tokio::select! {
      biased;
      _ = self.params.cancel.cancelled() => Err(interrupted(Interrupted::Cancelled)),
      _ = tokio::time::sleep(config.connect_timeout) => Err(interrupted(Interrupted::DeadlineExceeded)),
      res = self.factory.connect(&config.address, dial_cancel) => res,
    }
  }

  /// Closes the connection and stops the receive pump.
  ///
  /// A no-op when already disconnected. When this returns, the sequence
  /// handed out by `listen` for the ending period is closed. A failing close
  /// is reported as `SocketError::UnexpectedSocketError`, but the client is
  /// disconnected either way.
  pub async fn disconnect(&self) -> Result<(), SocketError> {
    if !self.state.read().connected {
      return Ok(());
    }
    self.disconnect_locked().instrument(self.params.span.clone()).await
  }

  async fn disconnect_locked(&self) -> Result<(), SocketError> {
    let _transition = self.transition.lock().await;
    let (connection, pump) = {
      let mut state = self.state.write();
      if !state.connected {
        return Ok(());
      }
      state.connected = false;
      (state.connection.take(), state.pump.take())
    };

    // Stop the pump before closing so it does not publish the read failure
    // the close would provoke.
    if let Some(pump) = &pump {
      pump.cancel.cancel();
    }

    let result = match connection {
      Some(connection) => connection.close().await.map_err(|e| {
        tracing::warn!(error = %e, "Close failed");
        SocketError::UnexpectedSocketError(e)
      }),
      None => Ok(()),
    };

    if let Some(pump) = pump {
      if let Err(e) = pump.task.await {
        if e.is_panic() {
          tracing::error!(error = %e, "Receive pump panicked");
        }
      }
    }

    tracing::info!(address = %self.params.config.address, "Disconnected");
    result
  }

  /// Sends `message` with the default message type. See `send_with_type`.
  pub async fn send(&self, message: impl Into<Bytes>) -> Result<(), SocketError> {
    self.send_with_type(DEFAULT_MESSAGE_TYPE, message).await
  }

  /// Writes one message, racing the write against the send timeout and the
  /// params token.
  ///
  /// Fails with `InvalidSocketState` without writing when not connected, with
  /// `UnexpectedSocketError` when the write fails, and with `SocketTimeout`
  /// when the timeout or cancellation wins. A write that loses the race is
  /// dropped and its outcome discarded. An already cancelled token fails the
  /// send before anything is written.
  pub async fn send_with_type(&self, message_type: i32, message: impl Into<Bytes>) -> Result<(), SocketError> {
    let connection = {
      let state = self.state.read();
      match (&state.connection, state.connected) {
        (Some(connection), true) => connection.clone(),
        _ => return Err(SocketError::InvalidSocketState("client is disconnected".into())),
      }
    };
    let payload = message.into();
    self
      .write_raced(connection, message_type, payload)
      .instrument(self.params.span.clone())
      .await
  }

  async fn write_raced(&self, connection: Arc<dyn Connection>, message_type: i32, payload: Bytes) -> Result<(), SocketError> {
    let deadline = self.params.config.send_deadline();
    let expired = async move {
      match deadline {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending::<()>().await,
      }
    };

    let result = tokio::select! {
      biased;
      _ = self.params.cancel.cancelled() => Err(SocketError::SocketTimeout(interrupted(Interrupted::Cancelled))),
      res = connection.write_message(message_type, payload) => res.map_err(SocketError::UnexpectedSocketError),
      _ = expired => Err(SocketError::SocketTimeout(interrupted(Interrupted::DeadlineExceeded))),
    };
    if let Err(e) = &result {
      tracing::debug!(error = %e, "Send failed");
    }
    result
  }

  /// The outbound sequence of the current connected period.
  ///
  /// Before the first connect this is an empty, closed sequence. After a
  /// disconnect it is the finished period's sequence until the next connect.
  pub fn listen(&self) -> Listener {
    self.state.read().outbound.clone()
  }
}

#[async_trait]
impl SocketClient for Client {
  async fn connect(&self) -> Result<(), SocketError> {
    Client::connect(self).await
  }

  async fn disconnect(&self) -> Result<(), SocketError> {
    Client::disconnect(self).await
  }

  async fn send(&self, message: Bytes) -> Result<(), SocketError> {
    Client::send(self, message).await
  }

  fn listen(&self) -> Listener {
    Client::listen(self)
  }
}

impl Drop for Client {
  fn drop(&mut self) {
    let state = self.state.read();
    if let Some(pump) = &state.pump {
      pump.cancel.cancel();
    }
    if state.connected {
      self.params.span.in_scope(|| {
        tracing::warn!(
          address = %self.params.config.address,
          "Client dropped while connected; connection was not closed"
        )
      });
    }
  }
}

impl fmt::Debug for Client {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.read();
    f.debug_struct("Client")
      .field("address", &self.params.config.address)
      .field("connecting", &state.connecting)
      .field("connected", &state.connected)
      .finish_non_exhaustive()
  }
}
