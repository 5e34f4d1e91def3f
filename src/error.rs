// src/error.rs

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Boxed cause carried by every `SocketError`. Capabilities and factories
/// report their failures in this shape.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure kinds reported by the client. Callers match on the variant (or on
/// `kind()`), never on the message text.
#[derive(Error, Debug)]
pub enum SocketError {
  #[error("Failed to connect: {0}")]
  FailedToConnect(#[source] BoxError),

  #[error("Unexpected socket error: {0}")]
  UnexpectedSocketError(#[source] BoxError),

  #[error("Invalid socket state: {0}")]
  InvalidSocketState(#[source] BoxError),

  #[error("Socket timed out: {0}")]
  SocketTimeout(#[source] BoxError),
}

/// Tag of a `SocketError`, without the attached cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketErrorKind {
  FailedToConnect,
  UnexpectedSocketError,
  InvalidSocketState,
  SocketTimeout,
}

impl SocketError {
  pub fn kind(&self) -> SocketErrorKind {
    match self {
      SocketError::FailedToConnect(_) => SocketErrorKind::FailedToConnect,
      SocketError::UnexpectedSocketError(_) => SocketErrorKind::UnexpectedSocketError,
      SocketError::InvalidSocketState(_) => SocketErrorKind::InvalidSocketState,
      SocketError::SocketTimeout(_) => SocketErrorKind::SocketTimeout,
    }
  }

  /// Shorthand for `self.kind() == kind`.
  pub fn is(&self, kind: SocketErrorKind) -> bool {
    self.kind() == kind
  }

  /// The underlying cause this error wraps.
  pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
    match self {
      SocketError::FailedToConnect(e)
      | SocketError::UnexpectedSocketError(e)
      | SocketError::InvalidSocketState(e)
      | SocketError::SocketTimeout(e) => &**e,
    }
  }

  /// Returns the cause as an `Interrupted` if the operation was cut short by a
  /// deadline or by cancellation.
  pub fn interrupted(&self) -> Option<Interrupted> {
    self.inner().downcast_ref::<Interrupted>().copied()
  }
}

impl fmt::Display for SocketErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      SocketErrorKind::FailedToConnect => "FailedToConnect",
      SocketErrorKind::UnexpectedSocketError => "UnexpectedSocketError",
      SocketErrorKind::InvalidSocketState => "InvalidSocketState",
      SocketErrorKind::SocketTimeout => "SocketTimeout",
    };
    f.write_str(name)
  }
}

/// Why an operation stopped waiting before its work finished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
  #[error("deadline exceeded")]
  DeadlineExceeded,
  #[error("operation cancelled")]
  Cancelled,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_matches_variant() {
    let err = SocketError::FailedToConnect("refused".into());
    assert_eq!(err.kind(), SocketErrorKind::FailedToConnect);
    assert!(err.is(SocketErrorKind::FailedToConnect));
    assert!(!err.is(SocketErrorKind::SocketTimeout));
  }

  #[test]
  fn source_exposes_inner_cause() {
    let err = SocketError::SocketTimeout(Box::new(Interrupted::DeadlineExceeded));
    let source = err.source().expect("timeout should carry a cause");
    assert_eq!(source.to_string(), "deadline exceeded");
    assert_eq!(err.interrupted(), Some(Interrupted::DeadlineExceeded));
    assert_eq!(err.to_string(), "Socket timed out: deadline exceeded");
  }

  #[test]
  fn interrupted_is_none_for_foreign_causes() {
    let err = SocketError::UnexpectedSocketError(Box::new(std::io::Error::from(std::io::ErrorKind::BrokenPipe)));
    assert_eq!(err.interrupted(), None);
    assert_eq!(err.inner().to_string(), std::io::Error::from(std::io::ErrorKind::BrokenPipe).to_string());
  }
}
