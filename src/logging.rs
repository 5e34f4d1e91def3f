// src/logging.rs

//! Builders for a `tracing` subscriber suited to applications embedding the
//! client.
//!
//! Nothing here touches global state on its own. `subscriber` hands back a
//! value the caller can scope with `tracing::subscriber::with_default` or
//! install once with `init`.

use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "rsock=debug,info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  /// Human readable, one event per line.
  #[default]
  Pretty,
  /// Newline-delimited JSON objects.
  Json,
}

fn env_filter(default_directive: &str) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Builds a subscriber writing to stdout. `RUST_LOG` takes precedence over
/// `default_directive`.
pub fn subscriber(default_directive: &str, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
  let builder = tracing_subscriber::fmt()
    .with_env_filter(env_filter(default_directive))
    .with_target(true)
    .with_line_number(true)
    .with_span_events(FmtSpan::CLOSE);

  match format {
    LogFormat::Pretty => Box::new(builder.finish()),
    LogFormat::Json => Box::new(builder.json().finish()),
  }
}

/// Installs `subscriber(default_directive, format)` as the process-wide
/// default. Fails if another subscriber is already installed.
pub fn init(default_directive: &str, format: LogFormat) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
  tracing::subscriber::set_global_default(subscriber(default_directive, format))
}
