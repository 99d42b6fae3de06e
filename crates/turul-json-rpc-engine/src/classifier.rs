//! Routing of inbound JSON values.
//!
//! There is no message-kind tag on the wire, so an object is classified by
//! which of the `method`, `result` and `error` keys it carries. Requests go
//! to the [`MethodRegistry`], responses resolve a pending call in
//! [`PendingCalls`].

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::correlator::PendingCalls;
use crate::error::{
    EMPTY_BATCH, JsonRpcErrorObject, NEITHER_REQUEST_NOR_RESPONSE, NOT_AN_OBJECT,
    REQUEST_AND_RESPONSE, UNPARSEABLE_MESSAGE,
};
use crate::registry::MethodRegistry;
use crate::response::{JsonRpcReply, JsonRpcResponse};
use crate::types::RequestId;

/// Structural kind of one inbound JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Has `method` and neither `result` nor `error`
    Request,
    /// Has `result` or `error` and no `method`
    Response,
    /// Has `method` together with `result` or `error`
    Ambiguous,
    /// Has none of the three keys
    Unknown,
}

impl MessageKind {
    pub fn of(object: &Map<String, Value>) -> Self {
        let has_method = object.contains_key("method");
        let has_outcome = object.contains_key("result") || object.contains_key("error");
        match (has_method, has_outcome) {
            (true, false) => MessageKind::Request,
            (false, true) => MessageKind::Response,
            (true, true) => MessageKind::Ambiguous,
            (false, false) => MessageKind::Unknown,
        }
    }
}

/// Turns inbound bytes into the reply (if any) the engine must send back
pub struct MessageClassifier {
    registry: Arc<MethodRegistry>,
    pending: Arc<PendingCalls>,
    reply_to_notifications: bool,
}

impl MessageClassifier {
    pub fn new(
        registry: Arc<MethodRegistry>,
        pending: Arc<PendingCalls>,
        reply_to_notifications: bool,
    ) -> Self {
        Self {
            registry,
            pending,
            reply_to_notifications,
        }
    }

    /// Classify one raw inbound message
    pub async fn process(&self, bytes: &[u8]) -> Option<JsonRpcReply> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => self.process_value(value).await,
            Err(error) => {
                debug!(%error, len = bytes.len(), "Inbound message is not valid JSON");
                Some(
                    JsonRpcResponse::error(
                        Some(RequestId::Null),
                        JsonRpcErrorObject::parse_error(Some(UNPARSEABLE_MESSAGE)),
                    )
                    .into(),
                )
            }
        }
    }

    /// Classify one decoded inbound value: an object or a batch array.
    ///
    /// A top-level scalar (`42`, `"x"`, `null`) is answered with an
    /// `InvalidRequest` error carrying `id: null`. This differs from peers
    /// that drop such input without any reply.
    pub async fn process_value(&self, value: Value) -> Option<JsonRpcReply> {
        match value {
            Value::Object(object) => self.classify(object).await.map(JsonRpcReply::from),
            Value::Array(items) => self.process_batch(items).await,
            other => {
                debug!(value = %other, "Inbound message is neither an object nor an array");
                Some(
                    JsonRpcResponse::error(
                        Some(RequestId::Null),
                        JsonRpcErrorObject::invalid_request(NOT_AN_OBJECT),
                    )
                    .into(),
                )
            }
        }
    }

    async fn process_batch(&self, items: Vec<Value>) -> Option<JsonRpcReply> {
        if items.is_empty() {
            return Some(
                JsonRpcResponse::error(None, JsonRpcErrorObject::invalid_request(EMPTY_BATCH)).into(),
            );
        }

        let total = items.len();
        let mut responses = Vec::with_capacity(total);
        for item in items {
            let response = match item {
                Value::Object(object) => self.classify(object).await,
                _ => Some(JsonRpcResponse::error(
                    None,
                    JsonRpcErrorObject::invalid_request(NOT_AN_OBJECT),
                )),
            };
            responses.extend(response);
        }

        debug!(entries = total, replies = responses.len(), "Processed batch");
        if responses.is_empty() {
            None
        } else {
            Some(JsonRpcReply::Batch(responses))
        }
    }

    /// Classify one object. Returns the response to send, or `None` when
    /// nothing goes back (inbound responses, notifications).
    pub async fn classify(&self, object: Map<String, Value>) -> Option<JsonRpcResponse> {
        let id = object.get("id").map(RequestId::from_value_lossy);

        match MessageKind::of(&object) {
            MessageKind::Request => {
                let is_notification = id.is_none();
                let response = self.registry.dispatch(id, object).await;
                if is_notification && !self.reply_to_notifications {
                    if let Some(error) = &response.error {
                        debug!(%error, "Suppressed error reply to notification");
                    }
                    return None;
                }
                Some(response)
            }
            MessageKind::Response => {
                self.pending
                    .resolve_response(&id.unwrap_or(RequestId::Null), object);
                None
            }
            MessageKind::Ambiguous => Some(JsonRpcResponse::error(
                id,
                JsonRpcErrorObject::invalid_request(REQUEST_AND_RESPONSE),
            )),
            MessageKind::Unknown => Some(JsonRpcResponse::error(
                id,
                JsonRpcErrorObject::invalid_request(NEITHER_REQUEST_NOR_RESPONSE),
            )),
        }
    }
}
