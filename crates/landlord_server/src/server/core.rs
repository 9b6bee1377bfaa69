//! Core game server implementation.
//!
//! [`GameServer`] owns the listening socket and the table actor. Each
//! accepted connection gets its own task running
//! [`handle_connection`](super::handlers::handle_connection).

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rating::{FileRatingStore, MemoryRatingStore, RatingStore};
use crate::server::handlers::handle_connection;
use crate::table::{Table, TableHandle};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

/// The Landlord server.
///
/// A server hosts exactly one table. Connections beyond
/// `max_connections` are closed as soon as they are accepted.
pub struct GameServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Set once shutdown is requested; late subscribers still see it
    shutdown_sender: watch::Sender<bool>,
}

impl GameServer {
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_sender, _) = watch::channel(false);
        Self {
            config,
            shutdown_sender,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listener and serves until [`GameServer::shutdown`] is
    /// called.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Creates the listening socket with `SO_REUSEADDR` set.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        socket.set_reuse_address(true).ok();

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        socket
            .listen(1024)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to set non-blocking mode: {e}")))?;
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))?;

        info!("✅ Listener bound on {}", address);
        Ok(listener)
    }

    /// Runs the accept loop on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        info!("🚀 Starting Landlord server on {}", local);

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        if *shutdown_receiver.borrow() {
            info!("Shutdown requested before serving, not accepting connections");
            return Ok(());
        }

        let ratings = self.open_ratings().await?;
        let table = Table::new(self.config.table_config(), ratings);
        let (table, _actor) = TableHandle::spawn(table, self.config.event_queue_capacity);

        let limiter = Arc::new(Semaphore::new(self.config.max_connections));
        let max_frame_len = self.config.max_frame_len;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let Ok(permit) = limiter.clone().try_acquire_owned() else {
                            warn!(
                                "Refusing connection from {}: limit of {} reached",
                                addr, self.config.max_connections
                            );
                            continue;
                        };
                        stream.set_nodelay(true).ok();
                        info!("🔗 Connection from {}", addr);

                        let table = table.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, table, max_frame_len).await {
                                error!("Connection error from {}: {}", addr, e);
                            }
                            drop(permit);
                        });
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                _ = shutdown_receiver.wait_for(|stopped| *stopped) => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    /// Initiates server shutdown.
    ///
    /// Stops the accept loop. Connections already established keep their
    /// tasks until the peer disconnects or the runtime stops.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        self.shutdown_sender.send_replace(true);
        Ok(())
    }

    async fn open_ratings(&self) -> Result<Box<dyn RatingStore>, ServerError> {
        match &self.config.rating_store {
            Some(path) => {
                let store = FileRatingStore::open(path)
                    .await
                    .map_err(|e| ServerError::Internal(e.to_string()))?;
                info!("📒 Ratings stored in {}", path.display());
                Ok(Box::new(store))
            }
            None => {
                info!("📒 Ratings kept in memory only");
                Ok(Box::new(MemoryRatingStore::new()))
            }
        }
    }
}
