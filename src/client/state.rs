// src/client/state.rs

use super::{Listener, SocketData};
use crate::transport::Connection;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lock shared between the client and its receive pump. Never held across an
/// `.await`.
pub(crate) type SharedState = Arc<RwLock<ClientState>>;

/// Handle on the running pump of the current connected period.
#[derive(Debug)]
pub(crate) struct PumpHandle {
  pub(crate) cancel: CancellationToken,
  pub(crate) task: JoinHandle<()>,
}

/// Invariants:
/// - `connecting` and `connected` are never both true;
/// - `connection.is_some() == connected`;
/// - `pump.is_some() == connected`.
pub(crate) struct ClientState {
  pub(crate) connecting: bool,
  pub(crate) connected: bool,
  pub(crate) connection: Option<Arc<dyn Connection>>,
  pub(crate) outbound: Listener,
  pub(crate) pump: Option<PumpHandle>,
}

impl ClientState {
  pub(crate) fn new() -> Self {
    Self {
      connecting: false,
      connected: false,
      connection: None,
      outbound: closed_listener(),
      pump: None,
    }
  }

  /// Connected or a connect is in flight.
  pub(crate) fn is_active(&self) -> bool {
    self.connected || self.connecting
  }
}

/// An empty sequence that is already closed; handed out before the first
/// connect.
pub(crate) fn closed_listener() -> Listener {
  let (_, rx) = async_channel::bounded::<SocketData>(1);
  rx
}

/// Reverts `connecting` if a connect attempt is abandoned before it settles,
/// including when the connect future itself is dropped mid-dial.
pub(crate) struct ConnectingGuard<'a> {
  state: &'a SharedState,
  armed: bool,
}

impl<'a> ConnectingGuard<'a> {
  pub(crate) fn new(state: &'a SharedState) -> Self {
    Self { state, armed: true }
  }

  pub(crate) fn disarm(&mut self) {
    self.armed = false;
  }
}

impl Drop for ConnectingGuard<'_> {
  fn drop(&mut self) {
    if self.armed {
      self.state.write().connecting = false;
    }
  }
}
