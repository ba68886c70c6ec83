//! Server network layer: TCP listener and per-connection task spawning

use crate::config::ServerConfig;
use crate::match_state::{write_line, MatchState};
use crate::registry::{shared_writer, RegistryError};
use crate::session::Session;
use log::{error, info, warn};
use shared::ServerMessage;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Accepts connections and runs one [`Session`] task per participant
pub struct Server {
    listener: TcpListener,
    state: Arc<MatchState>,
    opponent_timeout: Option<Duration>,
}

impl Server {
    /// Binds the listening socket. This is the only failure that is fatal to
    /// the server process.
    pub async fn bind(config: &ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            state: Arc::new(MatchState::new()),
            opponent_timeout: config.opponent_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> Arc<MatchState> {
        Arc::clone(&self.state)
    }

    /// Accept loop. Runs until the surrounding task is dropped.
    pub async fn run(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    self.handle_connection(stream, addr).await;
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Registers the connection and spawns its session, or turns it away
    /// when the match already has both players.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let (read_half, write_half) = stream.into_split();
        let writer = shared_writer(write_half);

        let (id, name) = match self.state.register(Arc::clone(&writer)).await {
            Ok(registered) => registered,
            Err(RegistryError::MatchFull(active)) => {
                warn!("Refusing {}: match already has {} players", addr, active);
                let mut writer = writer.lock().await;
                if write_line(&mut *writer, &ServerMessage::MatchFull).await.is_ok() {
                    let _ = writer.shutdown().await;
                }
                return;
            }
            Err(e) => {
                error!("Failed to register {}: {}", addr, e);
                return;
            }
        };

        info!("{} joined from {}", name, addr);
        let session = Session::new(
            id,
            name,
            BufReader::new(read_half),
            Arc::clone(&self.state),
            self.opponent_timeout,
        );

        tokio::spawn(async move {
            let outcome = session.run().await;
            info!("Session from {} ended: {:?}", addr, outcome);
        });
    }

    /// Closes every registered connection so blocked sessions unwind.
    pub async fn shutdown(&self) {
        info!("Server shutting down");
        self.state.close_all().await;
    }
}
