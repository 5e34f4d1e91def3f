// src/client/pump.rs

use super::state::SharedState;
use super::SocketData;
use crate::error::SocketError;
use crate::runtime::termination_signal;
use crate::transport::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Wait applied when the pump runs ahead of the connected flag.
pub(crate) const PUMP_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
  Cancelled,
  Signal,
  ListenersGone,
}

/// Background task draining one connected period's inbound messages into the
/// outbound sequence. It owns the only sender, so the sequence closes exactly
/// when the pump exits.
pub(crate) struct ReceivePump {
  pub(crate) connection: Arc<dyn Connection>,
  pub(crate) state: SharedState,
  pub(crate) outbound: async_channel::Sender<SocketData>,
  pub(crate) cancel: CancellationToken,
  pub(crate) handle_signals: bool,
}

impl ReceivePump {
  pub(crate) fn spawn(self, address: &str) -> JoinHandle<()> {
    let span = tracing::debug_span!("receive_pump", address = %address);
    tokio::spawn(self.run().instrument(span))
  }

  async fn run(self) {
    let termination = termination_signal(self.handle_signals);
    tokio::pin!(termination);
    tracing::debug!("Receive pump started");

    let reason = loop {
      if self.cancel.is_cancelled() {
        break StopReason::Cancelled;
      }

      let connected = self.state.read().connected;
      if !connected {
        tokio::select! {
          biased;
          _ = self.cancel.cancelled() => break StopReason::Cancelled,
          _ = &mut termination => break StopReason::Signal,
          _ = tokio::time::sleep(PUMP_RETRY_DELAY) => continue,
        }
      }

      let item: SocketData = tokio::select! {
        biased;
        _ = self.cancel.cancelled() => break StopReason::Cancelled,
        _ = &mut termination => break StopReason::Signal,
        res = self.connection.read_message() => match res {
          Ok(frame) => {
            tracing::trace!(message_type = frame.message_type, size = frame.payload.len(), "Frame received");
            Ok(frame)
          }
          Err(e) => {
            tracing::debug!(error = %e, "Socket read failed");
            Err(SocketError::UnexpectedSocketError(e))
          }
        },
      };

      tokio::select! {
        biased;
        _ = self.cancel.cancelled() => break StopReason::Cancelled,
        _ = &mut termination => break StopReason::Signal,
        sent = self.outbound.send(item) => {
          if sent.is_err() {
            break StopReason::ListenersGone;
          }
        }
      }
    };

    // Dropping the sole sender closes the sequence handed out by `listen`.
    drop(self.outbound);
    tracing::debug!(reason = ?reason, "Receive pump stopped");
  }
}
