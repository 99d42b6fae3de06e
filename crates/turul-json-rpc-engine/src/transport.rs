//! Transport boundary of the engine
//!
//! The engine never opens a connection itself. A [`Transport`] supplies two
//! primitives: `send` for serialized messages and `receive` for inbound ones.
//! Each inbound message may carry an opaque state token which is handed back
//! to `send` together with the reply, so multi-peer transports know where the
//! reply belongs.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Transport-level errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport will not deliver or accept any more messages
    #[error("Transport closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// One inbound message and the state token it arrived with
#[derive(Debug, Clone)]
pub struct Received<S> {
    pub bytes: Bytes,
    pub state: Option<S>,
}

impl<S> Received<S> {
    pub fn new(bytes: impl Into<Bytes>, state: Option<S>) -> Self {
        Self {
            bytes: bytes.into(),
            state,
        }
    }

    /// "Nothing received" marker; the pump skips it without error
    pub fn empty() -> Self {
        Self {
            bytes: Bytes::new(),
            state: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Byte-oriented transport driven by the engine.
///
/// `send` is called concurrently from the pump and from any task issuing
/// notifications or calls. `receive` is only ever called by the pump.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opaque token identifying the peer or channel of a message
    type State: Send + Sync + 'static;

    /// Transmit one serialized message
    async fn send(&self, bytes: Bytes, state: Option<Self::State>) -> Result<(), TransportError>;

    /// Wait for the next inbound message. Empty bytes mean nothing was
    /// available.
    ///
    /// [`TransportError::Closed`] must only be returned once the transport
    /// is permanently gone: the pump stops for good and is not restarted.
    /// Report transient faults as [`TransportError::Io`] or
    /// [`TransportError::Other`]; the pump logs those and keeps receiving.
    async fn receive(&self) -> Result<Received<Self::State>, TransportError>;
}

/// In-memory transport backed by unbounded Tokio channels.
///
/// [`ChannelTransport::pair`] returns two connected endpoints: whatever one
/// side sends, the other receives.
#[derive(Debug)]
pub struct ChannelTransport {
    outgoing: mpsc::UnboundedSender<Bytes>,
    incoming: Mutex<mpsc::UnboundedReceiver<Bytes>>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::unbounded_channel();
        let (right_tx, left_rx) = mpsc::unbounded_channel();

        let left = Self {
            outgoing: left_tx,
            incoming: Mutex::new(left_rx),
        };
        let right = Self {
            outgoing: right_tx,
            incoming: Mutex::new(right_rx),
        };
        (left, right)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    type State = ();

    async fn send(&self, bytes: Bytes, _state: Option<()>) -> Result<(), TransportError> {
        self.outgoing.send(bytes).map_err(|_| TransportError::Closed)
    }

    async fn receive(&self) -> Result<Received<()>, TransportError> {
        let mut incoming = self.incoming.lock().await;
        match incoming.recv().await {
            Some(bytes) => Ok(Received::new(bytes, None)),
            None => Err(TransportError::Closed),
        }
    }
}
