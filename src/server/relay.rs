//! QUIC relay server implementation
//!
//! This module provides the main server that accepts connections and wires
//! each one to its session coordinator: a reader loop feeds inbound frames
//! to the coordinator strictly in arrival order, and a writer task drains
//! the connection's outbound channel to the control stream.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quinn::{Endpoint, RecvStream};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::protocol::codec::Decodable;
use crate::protocol::frame::{FrameCodec, FrameType};
use crate::protocol::messages::{ErrorEvent, Goodbye, Hello, HelloAck, PROTOCOL_VERSION};
use crate::server::broadcast::RoomBroadcaster;
use crate::server::credentials::CredentialStore;
use crate::server::presence::PresenceDirectory;
use crate::server::session::SessionCoordinator;
use crate::transport::groups::MulticastHub;

/// Server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Connection idle timeout
    pub idle_timeout: Duration,
    /// Path of the persisted credential store
    pub store_path: PathBuf,
    /// Path of the static assets handed to the serving plumbing
    pub asset_dir: PathBuf,
    /// Origins accepted during the handshake. Connections without an
    /// origin (non-browser clients) are always accepted.
    pub allowed_origins: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3500".parse().unwrap(),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            store_path: PathBuf::from("data/logins.json"),
            asset_dir: PathBuf::from("public"),
            allowed_origins: vec![
                "http://localhost:5500".to_string(),
                "http://127.0.0.1:5500".to_string(),
            ],
        }
    }
}

impl RelayConfig {
    /// Build a configuration from the environment: `PORT`,
    /// `PALAVER_STORE`, `PALAVER_ASSETS`, and `PALAVER_ENV` (setting it to
    /// `production` empties the permissive dev origin list)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(port) = env::var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|e| RelayError::config(format!("Invalid PORT: {}", e)))?;
            config.bind_addr.set_port(port);
        }

        if let Ok(path) = env::var("PALAVER_STORE") {
            config.store_path = PathBuf::from(path);
        }

        if let Ok(dir) = env::var("PALAVER_ASSETS") {
            config.asset_dir = PathBuf::from(dir);
        }

        if env::var("PALAVER_ENV").map(|v| v == "production").unwrap_or(false) {
            config.allowed_origins.clear();
        }

        Ok(config)
    }
}

/// State of the connection handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    /// Waiting for Hello from client
    AwaitingHello,
    /// Hello received and acknowledged
    Ready,
}

/// QUIC chat relay server
pub struct RelayServer {
    /// Server configuration
    config: RelayConfig,
    /// QUIC endpoint
    endpoint: Option<Endpoint>,
    /// Durable account store
    store: Arc<CredentialStore>,
    /// Presence directory
    directory: Arc<PresenceDirectory>,
    /// Multicast delivery fabric
    hub: Arc<MulticastHub>,
    /// Room-scoped fan-out
    broadcaster: RoomBroadcaster,
}

impl RelayServer {
    /// Create a new relay server, opening the credential store
    pub fn new(config: RelayConfig) -> Result<Self> {
        let store = Arc::new(CredentialStore::open(&config.store_path)?);
        let directory = Arc::new(PresenceDirectory::new());
        let hub = Arc::new(MulticastHub::new());
        let broadcaster = RoomBroadcaster::new(Arc::clone(&directory), Arc::clone(&hub));

        Ok(Self {
            config,
            endpoint: None,
            store,
            directory,
            hub,
            broadcaster,
        })
    }

    /// Get the presence directory
    pub fn directory(&self) -> Arc<PresenceDirectory> {
        Arc::clone(&self.directory)
    }

    /// Get the credential store
    pub fn store(&self) -> Arc<CredentialStore> {
        Arc::clone(&self.store)
    }

    /// Start the server
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting chat relay on {}", self.config.bind_addr);

        // Generate self-signed certificate for development
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()])
            .map_err(|e| RelayError::config(format!("Failed to generate certificate: {}", e)))?;

        let cert_der = CertificateDer::from(
            cert.serialize_der()
                .map_err(|e| RelayError::config(format!("Failed to serialize certificate: {}", e)))?,
        );
        let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
            cert.serialize_private_key_der(),
        ));

        // Configure rustls
        let mut server_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der)
            .map_err(|e| RelayError::config(format!("Failed to configure TLS: {}", e)))?;

        server_config.alpn_protocols = vec![b"palaver".to_vec()];
        server_config.max_early_data_size = 0;

        // Configure QUIC
        let mut transport_config = quinn::TransportConfig::default();
        transport_config.max_concurrent_bidi_streams(4u32.into());
        transport_config.max_idle_timeout(Some(
            self.config
                .idle_timeout
                .try_into()
                .map_err(|_| RelayError::config("Idle timeout out of range"))?,
        ));

        let mut quic_server_config = quinn::ServerConfig::with_crypto(Arc::new(
            quinn::crypto::rustls::QuicServerConfig::try_from(server_config)
                .map_err(|e| RelayError::config(format!("Failed to create QUIC config: {}", e)))?,
        ));
        quic_server_config.transport_config(Arc::new(transport_config));

        // Create endpoint
        let endpoint = Endpoint::server(quic_server_config, self.config.bind_addr)
            .map_err(|e| RelayError::network(format!("Failed to create endpoint: {}", e)))?;

        info!("Relay listening on {}", endpoint.local_addr()?);
        info!("Serving static assets from {}", self.config.asset_dir.display());

        self.endpoint = Some(endpoint.clone());

        // Accept connections
        self.accept_connections(endpoint).await
    }

    /// Accept incoming connections
    async fn accept_connections(&self, endpoint: Endpoint) -> Result<()> {
        loop {
            match endpoint.accept().await {
                Some(incoming) => {
                    // Check connection limit
                    if self.hub.connection_count().await >= self.config.max_connections {
                        warn!("Connection limit reached, rejecting connection");
                        incoming.refuse();
                        continue;
                    }

                    // Spawn connection handler
                    let server = self.clone_ref();
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_incoming(incoming).await {
                            debug!("Connection closed with error: {}", e);
                        }
                    });
                }
                None => {
                    warn!("Endpoint stopped accepting connections");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Handle a single incoming connection
    async fn handle_incoming(&self, incoming: quinn::Incoming) -> Result<()> {
        let connection = incoming.await?;
        let remote_addr = connection.remote_address();
        let conn_id = uuid::Uuid::new_v4().to_string();

        info!("New connection {} from {}", conn_id, remote_addr);

        // The client opens the control stream
        let (mut send, recv) = connection
            .accept_bi()
            .await
            .map_err(|e| RelayError::connection(format!("Failed to accept control stream: {}", e)))?;

        // Register the outbound channel and drain it to the control stream
        let mut outbound = self.hub.register(&conn_id).await;
        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound.recv().await {
                let data = frame.encode_to_bytes();
                if let Err(e) = send.write_all(&data).await {
                    debug!("Outbound write failed: {}", e);
                    break;
                }
            }
            let _ = send.finish();
        });

        let result = self.drive_connection(&conn_id, recv).await;

        // Dropping the registration ends the writer task
        let _ = writer.await;

        info!("Connection {} from {} closed", conn_id, remote_addr);
        result
    }

    /// Run the connection to completion, then perform the disconnect
    /// transition exactly once, whatever ended the reader loop
    async fn drive_connection(&self, conn_id: &str, recv: RecvStream) -> Result<()> {
        let mut coordinator = SessionCoordinator::new(
            conn_id.to_string(),
            Arc::clone(&self.store),
            Arc::clone(&self.directory),
            self.broadcaster.clone(),
        );

        let result = self.read_frames(&mut coordinator, recv).await;

        // Transport is gone: take the connection out of every recipient set
        // before the disconnect broadcasts are computed
        self.hub.unregister(conn_id).await;
        coordinator.on_disconnect().await?;

        result
    }

    /// Reader loop: handshake first, then feed frames to the coordinator
    /// strictly in arrival order
    async fn read_frames(
        &self,
        coordinator: &mut SessionCoordinator,
        mut recv: RecvStream,
    ) -> Result<()> {
        let conn_id = coordinator.conn_id().to_string();
        let mut state = HandshakeState::AwaitingHello;
        let mut codec = FrameCodec::new();
        let mut buf = vec![0u8; 4096];

        loop {
            match recv.read(&mut buf).await {
                Ok(Some(n)) => {
                    codec.feed(&buf[..n]);

                    // Process all available frames
                    loop {
                        match codec.decode_next() {
                            Ok(Some(frame)) => match state {
                                HandshakeState::AwaitingHello => {
                                    if frame.frame_type != FrameType::Hello {
                                        self.broadcaster
                                            .to_connection(&conn_id, &ErrorEvent::handshake_required())
                                            .await?;
                                        return Err(RelayError::protocol(format!(
                                            "Expected Hello, got {:?}",
                                            frame.frame_type
                                        )));
                                    }

                                    let hello = Hello::decode_frame(&frame).map_err(|e| {
                                        RelayError::protocol(format!("Invalid Hello: {}", e))
                                    })?;

                                    if let Some(origin) = &hello.origin {
                                        if !self.config.allowed_origins.iter().any(|o| o == origin) {
                                            self.broadcaster
                                                .to_connection(
                                                    &conn_id,
                                                    &ErrorEvent::origin_rejected(origin.as_str()),
                                                )
                                                .await?;
                                            return Err(RelayError::connection(format!(
                                                "Origin not allowed: {}",
                                                origin
                                            )));
                                        }
                                    }

                                    debug!("Received Hello v{}", hello.version);
                                    self.broadcaster
                                        .to_connection(
                                            &conn_id,
                                            &HelloAck {
                                                version: PROTOCOL_VERSION,
                                                session_id: conn_id.clone(),
                                            },
                                        )
                                        .await?;

                                    state = HandshakeState::Ready;
                                    coordinator.on_connect().await?;
                                }
                                HandshakeState::Ready => {
                                    if frame.frame_type == FrameType::Goodbye {
                                        if let Ok(goodbye) = Goodbye::decode_frame(&frame) {
                                            info!("Client sent Goodbye: {}", goodbye.reason);
                                        }
                                        return Ok(());
                                    }

                                    if let Err(e) = coordinator.handle_frame(frame).await {
                                        warn!("Error handling frame: {}", e);
                                    }
                                }
                            },
                            Ok(None) => break,
                            Err(e) => {
                                return Err(RelayError::protocol(format!(
                                    "Frame decode error: {}",
                                    e
                                )));
                            }
                        }
                    }
                }
                Ok(None) => {
                    debug!("Control stream finished");
                    return Ok(());
                }
                Err(e) => {
                    return Err(RelayError::network(format!(
                        "Control stream read error: {}",
                        e
                    )));
                }
            }
        }
    }

    /// Get server statistics
    pub async fn get_stats(&self) -> ServerStats {
        ServerStats {
            total_connections: self.hub.connection_count().await,
            sessions_in_rooms: self.directory.len().await,
            active_rooms: self.directory.active_rooms().await.len(),
            bind_address: self.config.bind_addr,
        }
    }

    /// Shutdown the server
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(endpoint) = self.endpoint.take() {
            endpoint.close(0u32.into(), b"Server shutdown");
            info!("Relay shutdown complete");
        }
        Ok(())
    }

    /// Clone reference for spawning tasks
    fn clone_ref(&self) -> Arc<Self> {
        Arc::new(Self {
            config: self.config.clone(),
            endpoint: self.endpoint.clone(),
            store: Arc::clone(&self.store),
            directory: Arc::clone(&self.directory),
            hub: Arc::clone(&self.hub),
            broadcaster: self.broadcaster.clone(),
        })
    }
}

/// Server statistics
#[derive(Debug, Clone)]
pub struct ServerStats {
    pub total_connections: usize,
    pub sessions_in_rooms: usize,
    pub active_rooms: usize,
    pub bind_address: SocketAddr,
}
