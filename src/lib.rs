// src/lib.rs

//! rsock - a concurrency-safe lifecycle client for duplex socket connections.
//!
//! A `Client` owns one connection at a time. `connect` dials through a
//! pluggable `ConnectionFactory` and starts a background receive pump;
//! `send` writes one message under a bounded timeout; `listen` hands out the
//! stream of inbound `SocketData`; `disconnect` closes the connection and
//! stops the pump. The pump also stops on the params cancellation token and
//! on SIGINT/SIGTERM.
//!
//! ```no_run
//! use rsock::{Client, Config, Params};
//!
//! # async fn run() -> Result<(), rsock::SocketError> {
//! let params = Params::default().with_config(Config::default().with_address("tcp://127.0.0.1:5555"));
//! let client = Client::new(params);
//! client.connect().await?;
//! client.send("hello").await?;
//! if let Ok(item) = client.listen().recv().await {
//!   let frame = item?;
//!   println!("type {} payload {:?}", frame.message_type, frame.payload);
//! }
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

/// Connection lifecycle, send path and receive pump.
pub mod client;
/// Connection settings.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Optional `tracing` subscriber setup.
pub mod logging;
/// Client construction parameters.
pub mod params;
/// Process signal handling.
pub mod runtime;
/// Connection capability, factories and the TCP transport.
pub mod transport;

pub use client::{Client, Listener, SocketClient, SocketData};
pub use config::Config;
pub use error::{BoxError, Interrupted, SocketError, SocketErrorKind};
pub use params::Params;
pub use transport::{factory_fn, Connection, ConnectionFactory, Frame, TcpConnectionFactory};

// Re-exported so callers can build `Params::with_cancellation` without
// naming tokio-util themselves.
pub use tokio_util::sync::CancellationToken;
