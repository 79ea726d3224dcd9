//! Native API server: accept loop and graceful shutdown.
//!
//! [`MockDeviceServer::bind`] validates the configuration, binds the
//! listener and creates the shared [`DeviceHub`].  [`MockDeviceServer::run`]
//! then accepts connections until the shutdown token is cancelled, spawning
//! one task per connection into a `JoinSet` so shutdown can wait for all of
//! them.
//!
//! # For beginners: why a CancellationToken?
//!
//! A token is a one-way "stop" signal that any number of tasks can await in
//! a `tokio::select!`.  Cancelling it wakes the accept loop, every
//! connection's read loop and the heartbeat at once, instead of each of them
//! polling a flag on a timer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use espmock_core::{PayloadCodec, ProstCodec};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::device_state::DeviceHub;
use crate::domain::{ConfigError, MockDeviceConfig};
use crate::infrastructure::connection::serve_connection;

/// How long `run` waits for connections after shutdown before aborting them.
/// Longer than a connection's own flush grace.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The listener could not be bound (port in use, no permission).
    #[error("failed to bind Native API listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A bound, not yet running, mock device.
pub struct MockDeviceServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    hub: Arc<DeviceHub>,
    shutdown: CancellationToken,
}

impl MockDeviceServer {
    /// Validates `config` and binds the listener, using the prost codec.
    ///
    /// Port `0` binds an ephemeral port; read it back with
    /// [`local_addr`](Self::local_addr).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] for an invalid config or a failed bind.
    pub async fn bind(config: MockDeviceConfig) -> Result<Self, ServerError> {
        Self::bind_with_codec(config, Arc::new(ProstCodec)).await
    }

    /// Like [`bind`](Self::bind) with a caller-supplied payload codec.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] for an invalid config or a failed bind.
    pub async fn bind_with_codec(
        config: MockDeviceConfig,
        codec: Arc<dyn PayloadCodec>,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let addr = config.socket_addr()?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        info!(
            "mock device '{}' ({}) listening on {local_addr}",
            config.device.name, config.device.mac_address
        );

        let shutdown = CancellationToken::new();
        let hub = DeviceHub::new(Arc::new(config), codec, shutdown.child_token());

        Ok(Self {
            listener,
            local_addr,
            hub,
            shutdown,
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared device state, for inspection.
    pub fn hub(&self) -> Arc<DeviceHub> {
        Arc::clone(&self.hub)
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accepts connections until the shutdown token is cancelled, then waits
    /// for every connection task to finish.
    ///
    /// Each connection closes within its own flush grace; anything still
    /// running after a further deadline is aborted.
    ///
    /// Accept errors are logged and do not stop the server.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; the `Result` leaves room for fatal
    /// listener errors.
    pub async fn run(self) -> Result<(), ServerError> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("shutdown requested; stopping accept loop");
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("cannot set TCP_NODELAY for {peer}: {e}");
                        }
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            Arc::clone(&self.hub),
                            self.shutdown.child_token(),
                        ));
                    }
                    Err(e) => error!("accept error: {e}"),
                },

                // Reap finished connections so the set does not grow forever.
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!("connection task failed: {e}");
                    }
                }
            }
        }

        drop(self.listener);

        info!("waiting for {} connection(s) to close", connections.len());
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while let Some(joined) = connections.join_next().await {
                if let Err(e) = joined {
                    warn!("connection task failed: {e}");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("aborting {} connection(s) that did not close in time", connections.len());
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }

        info!("mock device '{}' stopped", self.hub.config().device.name);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
