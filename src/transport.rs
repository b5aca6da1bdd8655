//! Transport: the peer-broadcast/request collaborator, plus the inbound
//! hook the coordinator implements to react to messages a transport
//! delivers.
//!
//! The core never assumes delivery: duplicates and reorderings are
//! tolerated by validation, so every method here is fire-and-forget
//! from the caller's point of view — failures are reported per peer
//! and swallowed by the caller.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::blockchain::{Block, Transaction};
use crate::error::LedgerError;

/// The outbound capability set a transport must provide.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn broadcast_block(&self, block: &Block);
    async fn broadcast_transaction(&self, tx: &Transaction);
    async fn request_chain(&self, peer: &str) -> Result<Vec<Block>, LedgerError>;
}

/// The inbound hook: whatever drives the transport (a websocket
/// listener, a loopback test harness) calls these when a message
/// arrives. `NodeCoordinator` implements this trait.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn on_block(&self, block: Block);
    async fn on_transaction(&self, tx: Transaction);
    async fn on_chain(&self, chain: Vec<Block>);
    async fn on_chain_request(&self) -> Vec<Block>;
}

/// The small JSON message envelope carried over the websocket wire,
/// covering the four inbound/outbound operations a transport needs to
/// carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
enum WireMessage {
    Block(Block),
    Transaction(Transaction),
    Chain(Vec<Block>),
    ChainRequest,
}

/// A bidirectional RPC-over-websocket style transport: outbound sends
/// open a short-lived connection to the peer URL and send one envelope;
/// an inbound listener accepts connections and dispatches each envelope
/// it receives to an [`InboundHandler`].
///
/// This is a reference implementation, not a hardened P2P stack: no
/// peer reputation, no reconnect backoff, no message authentication
/// beyond what the consensus rules already provide.
pub struct WebSocketTransport {
    peers: RwLock<Vec<String>>,
}

impl WebSocketTransport {
    pub fn new(peers: Vec<String>) -> Self {
        Self {
            peers: RwLock::new(peers),
        }
    }

    /// Register a peer URL (`ws://host:port`) for future broadcasts.
    /// Rejects malformed URLs rather than storing an address no
    /// `connect_async` call could ever use.
    pub async fn add_peer(&self, peer: String) -> Result<(), LedgerError> {
        url::Url::parse(&peer).map_err(|err| LedgerError::Transport(format!("invalid peer url {peer}: {err}")))?;
        let mut peers = self.peers.write().await;
        if !peers.contains(&peer) {
            peers.push(peer);
        }
        Ok(())
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.clone()
    }

    async fn send_to(&self, peer: &str, message: &WireMessage) -> Result<(), LedgerError> {
        let (mut socket, _) = tokio_tungstenite::connect_async(peer)
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        let json = serde_json::to_string(message).map_err(|err| LedgerError::Transport(err.to_string()))?;
        socket
            .send(WsMessage::Text(json))
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        let _ = socket.close(None).await;
        Ok(())
    }

    async fn broadcast(&self, message: WireMessage) {
        for peer in self.peers().await {
            if let Err(err) = self.send_to(&peer, &message).await {
                tracing::warn!(%peer, %err, "broadcast to peer failed");
            }
        }
    }

    /// Accept inbound websocket connections on `listen_addr` and dispatch
    /// each decoded envelope to `handler`. Runs until the listener errors;
    /// intended to be spawned as a long-lived task.
    pub async fn serve(
        listen_addr: &str,
        handler: std::sync::Arc<dyn InboundHandler>,
    ) -> Result<(), LedgerError> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|err| LedgerError::Transport(err.to_string()))?;
            let handler = std::sync::Arc::clone(&handler);
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, handler).await {
                    tracing::warn!(%err, "inbound connection handling failed");
                }
            });
        }
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    handler: std::sync::Arc<dyn InboundHandler>,
) -> Result<(), LedgerError> {
    let mut socket = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|err| LedgerError::Transport(err.to_string()))?;
    while let Some(frame) = socket.next().await {
        let frame = frame.map_err(|err| LedgerError::Transport(err.to_string()))?;
        let WsMessage::Text(text) = frame else { continue };
        let Ok(message) = serde_json::from_str::<WireMessage>(&text) else {
            continue;
        };
        match message {
            WireMessage::Block(block) => handler.on_block(block).await,
            WireMessage::Transaction(tx) => handler.on_transaction(tx).await,
            WireMessage::Chain(chain) => handler.on_chain(chain).await,
            WireMessage::ChainRequest => {
                let chain = handler.on_chain_request().await;
                let reply = serde_json::to_string(&WireMessage::Chain(chain))
                    .expect("a chain always serialises");
                let _ = socket.send(WsMessage::Text(reply)).await;
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn broadcast_block(&self, block: &Block) {
        self.broadcast(WireMessage::Block(block.clone())).await;
    }

    async fn broadcast_transaction(&self, tx: &Transaction) {
        self.broadcast(WireMessage::Transaction(tx.clone())).await;
    }

    async fn request_chain(&self, peer: &str) -> Result<Vec<Block>, LedgerError> {
        let (mut socket, _) = tokio_tungstenite::connect_async(peer)
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        let request = serde_json::to_string(&WireMessage::ChainRequest)
            .expect("a chain request always serialises");
        socket
            .send(WsMessage::Text(request))
            .await
            .map_err(|err| LedgerError::Transport(err.to_string()))?;
        while let Some(frame) = socket.next().await {
            let frame = frame.map_err(|err| LedgerError::Transport(err.to_string()))?;
            if let WsMessage::Text(text) = frame {
                if let Ok(WireMessage::Chain(chain)) = serde_json::from_str::<WireMessage>(&text) {
                    return Ok(chain);
                }
            }
        }
        Err(LedgerError::Transport(format!("{peer} closed without replying")))
    }
}

/// An in-process `Transport` double used by tests and fork-resolution
/// scenarios: peers are other in-memory handlers registered directly,
/// no sockets involved.
#[derive(Default)]
pub struct LoopbackTransport {
    peers: RwLock<Vec<(String, std::sync::Arc<dyn InboundHandler>)>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_peer(&self, address: String, handler: std::sync::Arc<dyn InboundHandler>) {
        self.peers.write().await.push((address, handler));
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn broadcast_block(&self, block: &Block) {
        for (_, handler) in self.peers.read().await.iter() {
            handler.on_block(block.clone()).await;
        }
    }

    async fn broadcast_transaction(&self, tx: &Transaction) {
        for (_, handler) in self.peers.read().await.iter() {
            handler.on_transaction(tx.clone()).await;
        }
    }

    async fn request_chain(&self, peer: &str) -> Result<Vec<Block>, LedgerError> {
        let peers = self.peers.read().await;
        let Some((_, handler)) = peers.iter().find(|(address, _)| address == peer) else {
            return Err(LedgerError::Transport(format!("unknown peer: {peer}")));
        };
        Ok(handler.on_chain_request().await)
    }
}
