//! QUIC-based chat relay client
//!
//! This module provides a client for connecting to the relay, creating
//! accounts, logging in, joining rooms, and receiving real-time room
//! events. The presentation layer on top of it is out of scope.

use crate::error::{RelayError, Result};
use crate::protocol::codec::{DecodedMessage, Encodable};
use crate::protocol::frame::FrameCodec;
use crate::protocol::messages::{
    AccountCreate, Activity, ActivitySend, ChatMessage, ChatSend, EnterRoom, Goodbye, Hello,
    HelloAck, LoginAttempt, LoginOk, RoomList, UserList,
};
use quinn::{ClientConfig as QuinnClientConfig, Connection, Endpoint, RecvStream, SendStream};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

/// Relay client configuration
#[derive(Clone, Debug)]
pub struct RelayClientConfig {
    /// Server address to connect to
    pub server_addr: SocketAddr,
    /// Client bind address (use 0.0.0.0:0 for auto)
    pub bind_addr: SocketAddr,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Origin to present during the handshake, if any
    pub origin: Option<String>,
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3500".parse().unwrap(),
            bind_addr: "0.0.0.0:0".parse().unwrap(),
            connect_timeout_secs: 10,
            origin: None,
        }
    }
}

/// Events that the client can receive
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// Handshake acknowledged by the server
    Connected(HelloAck),
    /// Disconnected from server
    Disconnected(String),
    /// Received a chat message or notice
    Message(ChatMessage),
    /// Received a room member list
    Users(UserList),
    /// Received the global room list
    Rooms(RoomList),
    /// Someone else in the room is typing
    Activity(Activity),
    /// Account-create or login succeeded
    LoginOk(LoginOk),
    /// Account-create or login failed
    LoginFailed(String),
    /// Error occurred
    Error(RelayError),
}

/// QUIC chat relay client
pub struct RelayClient {
    config: RelayClientConfig,
    name: Option<String>,
    endpoint: Option<Endpoint>,
    connection: Option<Connection>,
    control_send: Option<Arc<Mutex<SendStream>>>,
}

impl RelayClient {
    /// Create a new relay client with the given configuration
    pub fn new(config: RelayClientConfig) -> Self {
        Self {
            config,
            name: None,
            endpoint: None,
            connection: None,
            control_send: None,
        }
    }

    /// Connect to the relay and perform the handshake
    pub async fn connect(&mut self) -> Result<mpsc::UnboundedReceiver<RelayEvent>> {
        info!("Connecting to chat relay at {}", self.config.server_addr);

        // Configure client
        let client_config = self.configure_client()?;

        // Create endpoint
        let mut endpoint = Endpoint::client(self.config.bind_addr)
            .map_err(|e| RelayError::network(format!("Failed to create endpoint: {}", e)))?;

        endpoint.set_default_client_config(client_config);
        self.endpoint = Some(endpoint.clone());

        // Connect to server
        let connecting = endpoint
            .connect(self.config.server_addr, "localhost")
            .map_err(|e| RelayError::connection(format!("Failed to initiate connection: {}", e)))?;

        let connection = tokio::time::timeout(
            std::time::Duration::from_secs(self.config.connect_timeout_secs),
            connecting,
        )
        .await
        .map_err(|_| RelayError::timeout("Connection timeout"))?
        .map_err(|e| RelayError::connection(format!("Failed to connect: {}", e)))?;

        info!("Connected to relay");
        self.connection = Some(connection.clone());

        // Open the control stream
        let (send, recv) = connection.open_bi().await?;
        self.control_send = Some(Arc::new(Mutex::new(send)));

        // Set up event channel and receiver task
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self::start_event_receiver(recv, event_tx);

        // Handshake
        self.send_frame(&Hello {
            origin: self.config.origin.clone(),
            ..Default::default()
        })
        .await?;

        Ok(event_rx)
    }

    /// Configure the QUIC client
    fn configure_client(&self) -> Result<QuinnClientConfig> {
        // Create a custom certificate verifier that accepts self-signed certificates
        // WARNING: This is insecure and should only be used for development/testing
        let mut crypto = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth();

        // Set ALPN protocol to match server
        crypto.alpn_protocols = vec![b"palaver".to_vec()];

        Ok(QuinnClientConfig::new(Arc::new(
            quinn::crypto::rustls::QuicClientConfig::try_from(crypto)
                .map_err(|e| RelayError::config(format!("Failed to create QUIC config: {}", e)))?,
        )))
    }

    /// Spawn the task that turns inbound frames into client events
    fn start_event_receiver(mut recv: RecvStream, event_tx: mpsc::UnboundedSender<RelayEvent>) {
        tokio::spawn(async move {
            let mut codec = FrameCodec::new();
            let mut buf = vec![0u8; 4096];

            loop {
                match recv.read(&mut buf).await {
                    Ok(Some(n)) => {
                        codec.feed(&buf[..n]);

                        loop {
                            match codec.decode_next() {
                                Ok(Some(frame)) => match DecodedMessage::decode(&frame) {
                                    Ok(msg) => {
                                        if let Some(event) = event_for(msg) {
                                            let _ = event_tx.send(event);
                                        }
                                    }
                                    Err(e) => {
                                        error!("Failed to decode frame: {}", e);
                                        let _ = event_tx.send(RelayEvent::Error(
                                            RelayError::serialization(format!(
                                                "Failed to decode frame: {}",
                                                e
                                            )),
                                        ));
                                    }
                                },
                                Ok(None) => break,
                                Err(e) => {
                                    let _ = event_tx.send(RelayEvent::Disconnected(format!(
                                        "Frame decode error: {}",
                                        e
                                    )));
                                    return;
                                }
                            }
                        }
                    }
                    Ok(None) => {
                        let _ = event_tx.send(RelayEvent::Disconnected("Stream closed".to_string()));
                        return;
                    }
                    Err(e) => {
                        let _ = event_tx
                            .send(RelayEvent::Disconnected(format!("Connection lost: {}", e)));
                        return;
                    }
                }
            }
        });
    }

    /// Write a frame to the control stream
    async fn send_frame<T: Encodable>(&self, msg: &T) -> Result<()> {
        let send = self
            .control_send
            .as_ref()
            .ok_or_else(|| RelayError::connection("Not connected to relay"))?;

        let frame = msg
            .encode_frame()
            .map_err(|e| RelayError::serialization(format!("Failed to encode frame: {}", e)))?;

        let data = frame.encode_to_bytes();
        let mut send = send.lock().await;
        send.write_all(&data)
            .await
            .map_err(|e| RelayError::network(format!("Failed to write frame: {}", e)))?;

        Ok(())
    }

    /// Request creation of a new account
    pub async fn create_account(&self, username: &str, email: &str, secret: &str) -> Result<()> {
        self.send_frame(&AccountCreate {
            username: username.to_string(),
            email: email.to_string(),
            secret: secret.to_string(),
        })
        .await
    }

    /// Attempt a login with existing credentials
    pub async fn login(&self, email: &str, secret: &str) -> Result<()> {
        self.send_frame(&LoginAttempt {
            email: email.to_string(),
            secret: secret.to_string(),
        })
        .await
    }

    /// Enter (or switch to) a room under the given display name
    pub async fn enter_room(&mut self, name: &str, room: &str) -> Result<()> {
        self.name = Some(name.to_string());
        self.send_frame(&EnterRoom {
            name: name.to_string(),
            room: room.to_string(),
        })
        .await
    }

    /// Send a chat message to the current room
    pub async fn send_chat(&self, text: &str) -> Result<()> {
        self.send_frame(&ChatSend {
            name: self.name.clone().unwrap_or_default(),
            text: text.to_string(),
        })
        .await
    }

    /// Signal typing activity to the current room
    pub async fn send_activity(&self) -> Result<()> {
        self.send_frame(&ActivitySend {
            name: self.name.clone().unwrap_or_default(),
        })
        .await
    }

    /// Disconnect from the relay
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.control_send.is_some() {
            let _ = self
                .send_frame(&Goodbye {
                    reason: "Client disconnect".to_string(),
                })
                .await;
        }

        if let Some(connection) = self.connection.take() {
            connection.close(0u32.into(), b"Client disconnect");
            info!("Disconnected from relay");
        }

        if let Some(endpoint) = self.endpoint.take() {
            endpoint.close(0u32.into(), b"Client shutdown");
        }

        self.control_send = None;
        self.name = None;

        Ok(())
    }

    /// Display name last used to enter a room
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check if connected to the relay
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

/// Map an inbound protocol message to a client event
fn event_for(msg: DecodedMessage) -> Option<RelayEvent> {
    match msg {
        DecodedMessage::HelloAck(ack) => Some(RelayEvent::Connected(ack)),
        DecodedMessage::ChatMessage(m) => Some(RelayEvent::Message(m)),
        DecodedMessage::UserList(m) => Some(RelayEvent::Users(m)),
        DecodedMessage::RoomList(m) => Some(RelayEvent::Rooms(m)),
        DecodedMessage::Activity(m) => Some(RelayEvent::Activity(m)),
        DecodedMessage::LoginOk(m) => Some(RelayEvent::LoginOk(m)),
        DecodedMessage::LoginFailed(m) => Some(RelayEvent::LoginFailed(m.reason)),
        DecodedMessage::Error(e) => Some(RelayEvent::Error(RelayError::protocol(e.message))),
        other => {
            debug!("Ignoring unexpected frame {:?}", other.frame_type());
            None
        }
    }
}

/// Custom certificate verifier that accepts any certificate (INSECURE - for development only)
#[derive(Debug)]
struct AcceptAnyCertificate;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA1,
            rustls::SignatureScheme::ECDSA_SHA1_Legacy,
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
            rustls::SignatureScheme::ED448,
        ]
    }
}
