//! The single background loop that drives all inbound traffic.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::classifier::MessageClassifier;
use crate::transport::{Received, Transport, TransportError};

/// Receives from the transport, classifies, and writes replies back with the
/// state token of the message they answer.
///
/// Messages are handled strictly one after another: a slow handler delays
/// every message behind it.
pub struct TransportPump<T: Transport> {
    transport: Arc<T>,
    classifier: MessageClassifier,
    receive_error_backoff: Duration,
}

impl<T: Transport> TransportPump<T> {
    pub fn new(
        transport: Arc<T>,
        classifier: MessageClassifier,
        receive_error_backoff: Duration,
    ) -> Self {
        Self {
            transport,
            classifier,
            receive_error_backoff,
        }
    }

    /// Run the pump on the current Tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Loop until the transport reports [`TransportError::Closed`], which is
    /// final: the pump does not restart on its own.
    ///
    /// Any other receive failure, including a panic inside `receive`, is
    /// logged and followed by a short backoff.
    pub async fn run(self) {
        info!("Transport pump started");

        loop {
            let received = match AssertUnwindSafe(self.transport.receive())
                .catch_unwind()
                .await
            {
                Ok(Ok(received)) => received,
                Ok(Err(TransportError::Closed)) => break,
                Ok(Err(err)) => {
                    warn!(error = %err, "Receive failed");
                    tokio::time::sleep(self.receive_error_backoff).await;
                    continue;
                }
                Err(_) => {
                    error!("Transport panicked while receiving");
                    tokio::time::sleep(self.receive_error_backoff).await;
                    continue;
                }
            };

            if received.is_empty() {
                tokio::task::yield_now().await;
                continue;
            }

            self.handle(received).await;
        }

        warn!(
            transport = std::any::type_name::<T>(),
            "Transport closed, pump stopped"
        );
    }

    /// Process one inbound message to completion
    pub async fn handle(&self, received: Received<T::State>) {
        let Some(reply) = self.classifier.process(&received.bytes).await else {
            return;
        };

        let bytes = match serde_json::to_vec(&reply) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(error = %err, "Failed to serialize reply");
                return;
            }
        };

        debug!(responses = reply.responses().len(), "Sending reply");
        if let Err(err) = self.transport.send(Bytes::from(bytes), received.state).await {
            warn!(error = %err, "Failed to send reply");
        }
    }
}
