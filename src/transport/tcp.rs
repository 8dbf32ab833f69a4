//! # TCP Transport
//!
//! Accept loop and client dial for the wire protocol over TCP.
//!
//! Both sides of the wire run the same connection driver; the only
//! asymmetry is who listens and who dials. Servers get graceful shutdown: a
//! signal stops the accept loop, live connections are given the configured
//! window to finish, then the process moves on.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::config::{ClientConfig, ServerConfig};
use crate::core::codec::Packet;
use crate::error::{Result, WireError};
use crate::protocol::dispatcher::SessionState;
use crate::protocol::Protocol;
use crate::transport::connection::{self, ConnectionHandle};

/// Start a server that shuts down on CTRL+C.
pub async fn start_server<P, S>(protocol: Arc<Protocol<P, S>>, config: &ServerConfig) -> Result<()>
where
    P: Packet,
    S: SessionState,
{
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    start_server_with_shutdown(protocol, config, shutdown_rx).await
}

/// Start a server with an external shutdown channel.
#[instrument(skip_all, fields(address = %config.address))]
pub async fn start_server_with_shutdown<P, S>(
    protocol: Arc<Protocol<P, S>>,
    config: &ServerConfig,
    shutdown_rx: mpsc::Receiver<()>,
) -> Result<()>
where
    P: Packet,
    S: SessionState,
{
    let listener = TcpListener::bind(&config.address).await?;
    info!(address = %config.address, "listening");
    serve(listener, protocol, config, shutdown_rx).await
}

/// Accept loop over an existing listener.
///
/// Separated from [`start_server_with_shutdown`] so callers (and tests) can
/// bind to an ephemeral port themselves and learn the address first.
pub async fn serve<P, S>(
    listener: TcpListener,
    protocol: Arc<Protocol<P, S>>,
    config: &ServerConfig,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()>
where
    P: Packet,
    S: SessionState,
{
    let active = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("shutting down server, waiting for connections to close");
                drain_connections(&active, config.shutdown_timeout).await;
                return Ok(());
            }

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        if active.load(Ordering::Acquire) >= config.max_connections {
                            warn!(peer = %peer, limit = config.max_connections, "connection limit reached, refusing");
                            continue;
                        }

                        info!(peer = %peer, "connection accepted");
                        active.fetch_add(1, Ordering::AcqRel);

                        let active = Arc::clone(&active);
                        let handle = connection::spawn(stream, &protocol);
                        tokio::spawn(async move {
                            handle.closed().await;
                            active.fetch_sub(1, Ordering::AcqRel);
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "error accepting connection");
                    }
                }
            }
        }
    }
}

async fn drain_connections(active: &AtomicUsize, shutdown_timeout: Duration) {
    let deadline = tokio::time::sleep(shutdown_timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                warn!("shutdown timeout reached, forcing exit");
                return;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                let open = active.load(Ordering::Acquire);
                if open == 0 {
                    info!("all connections closed, shutting down");
                    return;
                }
                info!(connections = open, "waiting for connections to close");
            }
        }
    }
}

/// Dial a server and spawn the connection driver for the stream.
#[instrument(skip_all, fields(address = %config.address))]
pub async fn connect<P, S>(
    protocol: &Protocol<P, S>,
    config: &ClientConfig,
) -> Result<ConnectionHandle<P>>
where
    P: Packet,
    S: SessionState,
{
    let stream = tokio::time::timeout(
        config.connection_timeout,
        TcpStream::connect(&config.address),
    )
    .await
    .map_err(|_| {
        WireError::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            "connection attempt timed out",
        ))
    })??;

    info!(address = %config.address, "connected");
    Ok(connection::spawn(stream, protocol))
}
