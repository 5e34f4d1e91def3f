// src/params.rs

use crate::config::Config;
use crate::transport::ConnectionFactory;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Everything a `Client` is built from. Assemble it with `Params::default()`
/// and the `with_*` overrides; the client takes ownership on construction.
#[derive(Clone)]
pub struct Params {
  pub(crate) config: Config,
  pub(crate) cancel: CancellationToken,
  pub(crate) factory: Option<Arc<dyn ConnectionFactory>>,
  pub(crate) span: Span,
  pub(crate) handle_signals: bool,
}

impl Default for Params {
  fn default() -> Self {
    Self {
      config: Config::default(),
      cancel: CancellationToken::new(),
      factory: None,
      span: Span::none(),
      handle_signals: true,
    }
  }
}

impl Params {
  pub fn with_config(mut self, config: Config) -> Self {
    self.config = config;
    self
  }

  /// Process-wide cancellation. Cancelling it stops the receive pump and
  /// aborts in-flight sends and connects of every client built from these
  /// params.
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// Overrides how connections are dialed. Without one, `Client::new` uses
  /// `TcpConnectionFactory`.
  pub fn with_factory(mut self, factory: impl ConnectionFactory) -> Self {
    self.factory = Some(Arc::new(factory));
    self
  }

  pub fn with_shared_factory(mut self, factory: Arc<dyn ConnectionFactory>) -> Self {
    self.factory = Some(factory);
    self
  }

  /// Span that client events and the receive pump are recorded under.
  pub fn with_span(mut self, span: Span) -> Self {
    self.span = span;
    self
  }

  /// Whether SIGINT/SIGTERM stop the receive pump. Enabled by default.
  pub fn with_signal_handling(mut self, enabled: bool) -> Self {
    self.handle_signals = enabled;
    self
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn cancellation(&self) -> &CancellationToken {
    &self.cancel
  }

  pub fn span(&self) -> &Span {
    &self.span
  }
}

impl fmt::Debug for Params {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Params")
      .field("config", &self.config)
      .field("cancelled", &self.cancel.is_cancelled())
      .field("custom_factory", &self.factory.is_some())
      .field("handle_signals", &self.handle_signals)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::transport::mock::MockFactory;
  use std::time::Duration;

  #[test]
  fn with_config_replaces_config() {
    let params = Params::default().with_config(Config::default().with_address("test1"));
    assert_eq!(params.config().address, "test1");
  }

  #[test]
  fn with_factory_installs_factory() {
    assert!(Params::default().factory.is_none());
    let params = Params::default().with_factory(MockFactory::new());
    assert!(params.factory.is_some());
  }

  #[test]
  fn with_span_records_span() {
    tracing::subscriber::with_default(tracing_subscriber::registry(), || {
      let span = tracing::info_span!("socket", id = 7);
      let params = Params::default().with_span(span.clone());
      assert!(span.id().is_some());
      assert_eq!(params.span().id(), span.id());
      assert_eq!(params.span().metadata().map(|m| m.name()), Some("socket"));
    });
    assert!(Params::default().span().is_none());
  }

  #[tokio::test]
  async fn with_cancellation_shares_token() {
    let cancel = CancellationToken::new();
    let params = Params::default().with_cancellation(cancel.clone());
    cancel.cancel();
    tokio::time::timeout(Duration::from_millis(10), params.cancellation().cancelled())
      .await
      .expect("params token should observe the cancellation");
  }
}
