use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcErrorObject;
use crate::types::{JsonRpcVersion, RequestId, deserialize_present};

/// A JSON-RPC response carrying either a `result` or an `error`.
///
/// `id` is `None` when the reply has no single originating request (an empty
/// batch, a non-object batch entry) and `Some(RequestId::Null)` when the id
/// could not be determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc", default)]
    pub version: JsonRpcVersion,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Split into the call outcome. A response without `result` resolves to `null`.
    pub fn into_result(self) -> Result<Value, JsonRpcErrorObject> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// What the engine writes back for one inbound JSON value: a single response
/// or a batch of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcReply {
    Single(JsonRpcResponse),
    Batch(Vec<JsonRpcResponse>),
}

impl JsonRpcReply {
    /// All responses contained in this reply
    pub fn responses(&self) -> &[JsonRpcResponse] {
        match self {
            JsonRpcReply::Single(response) => std::slice::from_ref(response),
            JsonRpcReply::Batch(responses) => responses,
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcReply {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Single(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string};

    #[test]
    fn test_error_response_wire_format() {
        let response = JsonRpcResponse::error(
            Some(RequestId::from(123)),
            JsonRpcErrorObject::method_not_found("test"),
        );

        assert_eq!(
            to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method test could not be found."},"id":123}"#
        );
    }

    #[test]
    fn test_error_without_id_omits_key() {
        let response =
            JsonRpcResponse::error(None, JsonRpcErrorObject::invalid_request("Request array must not be empty."));
        assert_eq!(
            to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Request array must not be empty."}}"#
        );
    }

    #[test]
    fn test_null_result_is_kept() {
        let response = JsonRpcResponse::success(Some(RequestId::from("a")), Value::Null);
        let json_str = to_string(&response).unwrap();
        assert_eq!(json_str, r#"{"jsonrpc":"2.0","result":null,"id":"a"}"#);

        let parsed: JsonRpcResponse = from_str(&json_str).unwrap();
        assert_eq!(parsed.result, Some(Value::Null));
        assert_eq!(parsed.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn test_into_result() {
        let ok = JsonRpcResponse::success(Some(RequestId::from(1)), json!({"sum": 3}));
        assert_eq!(ok.into_result().unwrap(), json!({"sum": 3}));

        let err = JsonRpcResponse::error(
            Some(RequestId::from(1)),
            JsonRpcErrorObject::internal_error(),
        );
        assert!(err.is_error());
        assert_eq!(err.into_result().unwrap_err().code, -32603);
    }

    #[test]
    fn test_batch_reply_serializes_as_array() {
        let reply = JsonRpcReply::Batch(vec![
            JsonRpcResponse::success(Some(RequestId::from(1)), json!(2)),
            JsonRpcResponse::error(None, JsonRpcErrorObject::invalid_request("x")),
        ]);

        assert_eq!(reply.responses().len(), 2);
        assert_eq!(
            to_string(&reply).unwrap(),
            r#"[{"jsonrpc":"2.0","result":2,"id":1},{"jsonrpc":"2.0","error":{"code":-32600,"message":"x"}}]"#
        );
    }
}
