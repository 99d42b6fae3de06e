//! Client side of the engine: outbound notifications and correlated calls.
//!
//! Each call registers a one-shot waiter under a fresh UUID before the
//! request is sent. The pump resolves the waiter when a response with that
//! id arrives; timeouts, send failures and cancelled futures remove the
//! waiter again so no entry outlives its caller. A response that cannot be
//! decoded only removes the entry, and its call runs into its deadline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{JsonRpcEngineError, JsonRpcResult};
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcResponse;
use crate::transport::Transport;
use crate::types::RequestId;

/// What a pending call's waiter is woken with
#[derive(Debug)]
pub enum PendingOutcome {
    Response(JsonRpcResponse),
    /// The engine shut down before a response arrived
    Cancelled,
}

/// Waiters for calls that have been sent but not yet answered
#[derive(Debug, Default)]
pub struct PendingCalls {
    waiters: Mutex<HashMap<String, oneshot::Sender<PendingOutcome>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`. Fails if the id is already pending.
    pub fn register(&self, id: String) -> JsonRpcResult<oneshot::Receiver<PendingOutcome>> {
        let mut waiters = self.waiters.lock();
        if waiters.contains_key(&id) {
            warn!(id = %id, "Correlation id collision");
            return Err(JsonRpcEngineError::IdCollision(id));
        }

        let (tx, rx) = oneshot::channel();
        waiters.insert(id, tx);
        trace!(pending = waiters.len(), "Registered pending call");
        Ok(rx)
    }

    /// Remove the waiter for `id`, if any
    pub fn remove(&self, id: &str) -> bool {
        self.waiters.lock().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.waiters.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }

    /// Cancel every waiter; their calls fail with `ResponseDropped`
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.waiters.lock());
        if !drained.is_empty() {
            debug!(count = drained.len(), "Cancelling pending calls");
        }
        for waiter in drained.into_values() {
            let _ = waiter.send(PendingOutcome::Cancelled);
        }
    }

    /// Route an inbound response object to the waiter registered under its
    /// id. Returns whether a waiter was found.
    ///
    /// Only string ids can match, since outbound calls only use string ids.
    /// Unknown ids (late responses after a timeout, foreign responses) are
    /// ignored. A response that cannot be decoded still removes its entry;
    /// the waiting call is left to time out.
    pub fn resolve_response(&self, id: &RequestId, object: Map<String, Value>) -> bool {
        let Some(key) = id.as_str() else {
            debug!(id = %id, "Ignoring response with non-string id");
            return false;
        };

        let Some(waiter) = self.waiters.lock().remove(key) else {
            debug!(id = key, "No pending call for response");
            return false;
        };

        match serde_json::from_value::<JsonRpcResponse>(Value::Object(object)) {
            Ok(response) => {
                trace!(id = key, is_error = response.is_error(), "Delivering response");
                if waiter.send(PendingOutcome::Response(response)).is_err() {
                    debug!(id = key, "Caller gave up before the response arrived");
                }
            }
            Err(error) => {
                warn!(id = key, %error, "Malformed response, dropping pending call");
            }
        }
        true
    }
}

/// Removes a pending entry when the owning call finishes in any way
struct PendingGuard<'a> {
    pending: &'a PendingCalls,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.pending.remove(&self.id) {
            trace!(id = %self.id, "Removed abandoned pending call");
        }
    }
}

pub(crate) fn validate_method(method: &str) -> JsonRpcResult<()> {
    if method.is_empty() {
        return Err(JsonRpcEngineError::invalid_argument(
            "method name must not be empty",
        ));
    }
    Ok(())
}

/// Sends notifications and calls over a transport and awaits call results
pub struct CallCorrelator<T: Transport> {
    transport: Arc<T>,
    pending: Arc<PendingCalls>,
}

impl<T: Transport> Clone for CallCorrelator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T: Transport> CallCorrelator<T> {
    pub fn new(transport: Arc<T>, pending: Arc<PendingCalls>) -> Self {
        Self { transport, pending }
    }

    pub fn pending(&self) -> &Arc<PendingCalls> {
        &self.pending
    }

    /// Send a request without an id. Completes once the transport accepted
    /// the bytes; no response is awaited.
    pub async fn notify(
        &self,
        method: &str,
        params: Vec<Value>,
        state: Option<T::State>,
    ) -> JsonRpcResult<()> {
        validate_method(method)?;

        let request = JsonRpcRequest::notification(method, params);
        let bytes = serde_json::to_vec(&request)?;
        debug!(method, "Sending notification");
        self.transport.send(Bytes::from(bytes), state).await?;
        Ok(())
    }

    /// Send a request with a fresh id and wait up to `timeout` for the
    /// matching response.
    pub async fn call(
        &self,
        method: &str,
        params: Vec<Value>,
        state: Option<T::State>,
        timeout: Duration,
    ) -> JsonRpcResult<Value> {
        validate_method(method)?;

        let id = Uuid::new_v4().to_string();
        let receiver = self.pending.register(id.clone())?;
        let _guard = PendingGuard {
            pending: &self.pending,
            id: id.clone(),
        };

        let request = JsonRpcRequest::call(RequestId::String(id.clone()), method, params);
        let bytes = serde_json::to_vec(&request)?;
        debug!(method, id = %id, "Sending call");
        self.transport.send(Bytes::from(bytes), state).await?;

        let deadline = Instant::now() + timeout;
        let response = match tokio::time::timeout_at(deadline, receiver).await {
            Ok(Ok(PendingOutcome::Response(response))) => response,
            Ok(Ok(PendingOutcome::Cancelled)) => {
                return Err(JsonRpcEngineError::ResponseDropped(id));
            }
            // Entry dropped without an answer (malformed response)
            Ok(Err(_)) => {
                tokio::time::sleep_until(deadline).await;
                debug!(method, id = %id, ?timeout, "Call timed out after a malformed response");
                return Err(JsonRpcEngineError::Timeout(timeout));
            }
            Err(_) => {
                debug!(method, id = %id, ?timeout, "Call timed out");
                return Err(JsonRpcEngineError::Timeout(timeout));
            }
        };

        response.into_result().map_err(JsonRpcEngineError::from)
    }
}
