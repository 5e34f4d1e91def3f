// src/config.rs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on a connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bound on a single send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a `Client`.
///
/// Durations are (de)serialized as integer nanoseconds under the keys
/// `connTimeout` and `sendTimeout`. A zero `send_timeout` means sends wait
/// indefinitely; a zero `connect_timeout` makes every connect attempt fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub address: String,
  #[serde(rename = "connTimeout", with = "duration_nanos")]
  pub connect_timeout: Duration,
  #[serde(rename = "sendTimeout", with = "duration_nanos")]
  pub send_timeout: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      address: String::new(),
      connect_timeout: DEFAULT_CONNECT_TIMEOUT,
      send_timeout: DEFAULT_SEND_TIMEOUT,
    }
  }
}

impl Config {
  pub fn with_address(mut self, address: impl Into<String>) -> Self {
    self.address = address.into();
    self
  }

  pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
    self.connect_timeout = timeout;
    self
  }

  pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
    self.send_timeout = timeout;
    self
  }

  /// The send bound, or `None` when sends are unbounded.
  pub(crate) fn send_deadline(&self) -> Option<Duration> {
    if self.send_timeout.is_zero() {
      None
    } else {
      Some(self.send_timeout)
    }
  }
}

mod duration_nanos {
  use serde::{Deserialize, Deserializer, Serializer};
  use std::time::Duration;

  pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    let nanos = u64::try_from(value.as_nanos()).map_err(serde::ser::Error::custom)?;
    serializer.serialize_u64(nanos)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let nanos = u64::deserialize(deserializer)?;
    Ok(Duration::from_nanos(nanos))
  }
}
