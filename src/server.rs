//! TCP collector for product frames.
//!
//! Accepts connections, reads one newline-delimited JSON frame from each,
//! stores the product and answers with one envelope frame before closing.

use crate::config::ServerConfig;
use crate::envelope::Envelope;
use crate::frame::{self, FrameError};
use crate::storage::ProductStore;
use serde_json::Value;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Delay before accepting again after a non-transient accept error
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Server instance
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    store: Arc<ProductStore>,
    connection_limit: Arc<Semaphore>,
}

/// How one connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Peer closed before sending anything; no reply
    Empty,
    /// Product stored and acknowledged
    Stored,
    /// Payload was not JSON; error envelope sent
    Rejected,
    /// Payload exceeded the frame limit; error envelope sent best-effort
    TooLarge,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Server {
    /// Bind the listening socket. Failure here is fatal to startup.
    pub async fn bind(config: ServerConfig, store: Arc<ProductStore>) -> io::Result<Self> {
        let addr = config
            .listen_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = create_listener(addr, config.backlog)?;
        let listener = TcpListener::from_std(listener)?;

        info!(
            address = %listener.local_addr()?,
            max_connections = config.max_connections,
            max_frame_size = config.max_frame_size,
            "Collector listening"
        );

        Ok(Server {
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            config,
            listener,
            store,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> &Arc<ProductStore> {
        &self.store
    }

    /// Accept connections forever.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tokio::select! {
            result = self.accept_loop() => result,
            _ = &mut shutdown => {
                info!(products = self.store.len(), "Collector shutting down");
                Ok(())
            }
        }
    }

    async fn accept_loop(&self) -> io::Result<()> {
        loop {
            // Wait for a connection slot
            let permit = self
                .connection_limit
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "New connection");

                    let store = Arc::clone(&self.store);
                    let config = self.config.clone();

                    tokio::spawn(async move {
                        match handle_connection(stream, peer, &store, &config).await {
                            Ok(outcome) => debug!(%peer, ?outcome, "Connection closed"),
                            Err(e) => warn!(%peer, error = %e, "Connection error"),
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    if let Some(delay) = accept_backoff(&e) {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

/// Pause before retrying `accept` after an error. Failures tied to a single
/// aborted handshake retry at once; anything else (EMFILE, ENOBUFS, ...) tends
/// to repeat until resources free up.
fn accept_backoff(error: &io::Error) -> Option<Duration> {
    match error.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

/// Create a TCP listener with SO_REUSEADDR so restarts can rebind at once.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

/// Serve one connection: read a frame, store it, reply, close.
///
/// The stream is dropped (closed) on every return path.
pub async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    store: &ProductStore,
    config: &ServerConfig,
) -> Result<Outcome, HandlerError> {
    let frame = match frame::read_frame_timeout(
        &mut stream,
        config.max_frame_size,
        config.read_timeout(),
    )
    .await
    {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            warn!(%peer, "No data received");
            return Ok(Outcome::Empty);
        }
        Err(FrameError::FrameTooLarge { limit }) => {
            warn!(%peer, limit, "Request frame too large");
            let reply = Envelope::frame_too_large(peer).to_bytes()?;
            // The peer may still be sending; the reply is not guaranteed
            if let Err(e) =
                frame::write_frame_timeout(&mut stream, &reply, config.write_timeout()).await
            {
                debug!(%peer, error = %e, "Failed to send frame size error");
            }
            return Ok(Outcome::TooLarge);
        }
        Err(e) => return Err(e.into()),
    };

    let (envelope, outcome) = match serde_json::from_slice(&frame) {
        Ok(product) => {
            info!(%peer, %product, "Product received");
            store.append(Value::clone(&product));
            (Envelope::ack(peer, product), Outcome::Stored)
        }
        Err(e) => {
            warn!(%peer, bytes = frame.len(), error = %e, "Invalid JSON received");
            (Envelope::invalid_json(peer), Outcome::Rejected)
        }
    };

    let reply = envelope.to_bytes()?;
    frame::write_frame_timeout(&mut stream, &reply, config.write_timeout()).await?;

    Ok(outcome)
}
