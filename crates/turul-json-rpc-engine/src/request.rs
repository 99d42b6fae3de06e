use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{JsonRpcVersion, RequestId, deserialize_present};

/// A JSON-RPC request.
///
/// A request without an `id` is a notification. Parameters are positional
/// only; an empty parameter list is omitted from the wire form, and so is a
/// missing `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc", default)]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_params"
    )]
    pub params: Vec<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            method: method.into(),
            params,
            id,
        }
    }

    /// Create a call that expects exactly one correlated response
    pub fn call(id: RequestId, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::new(Some(id), method, params)
    }

    /// Create a notification (no id, no response expected)
    pub fn notification(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::new(None, method, params)
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Get a parameter by position
    pub fn get_param(&self, index: usize) -> Option<&Value> {
        self.params.get(index)
    }
}

/// `"params": null` is accepted as "no parameters".
fn deserialize_params<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string};

    #[test]
    fn test_notification_omits_id_and_empty_params() {
        let request = JsonRpcRequest::notification("Test Method", vec![]);
        assert_eq!(
            to_string(&request).unwrap(),
            r#"{"jsonrpc":"2.0","method":"Test Method"}"#
        );
    }

    #[test]
    fn test_notification_with_params() {
        let request = JsonRpcRequest::notification(
            "Test Method 2",
            vec![json!(123), json!(456.789), json!("Test String")],
        );
        assert_eq!(
            to_string(&request).unwrap(),
            r#"{"jsonrpc":"2.0","method":"Test Method 2","params":[123,456.789,"Test String"]}"#
        );
    }

    #[test]
    fn test_call_serialization() {
        let request = JsonRpcRequest::call(RequestId::from("abc"), "Test Method", vec![]);
        assert_eq!(
            to_string(&request).unwrap(),
            r#"{"jsonrpc":"2.0","method":"Test Method","id":"abc"}"#
        );
    }

    #[test]
    fn test_request_deserialization() {
        let request: JsonRpcRequest =
            from_str(r#"{"jsonrpc":"2.0","method":"sum","params":[1,2],"id":7}"#).unwrap();

        assert_eq!(request.id, Some(RequestId::from(7)));
        assert_eq!(request.method, "sum");
        assert_eq!(request.get_param(1), Some(&json!(2)));
        assert_eq!(request.get_param(2), None);
    }

    #[test]
    fn test_null_id_is_not_a_notification() {
        let request: JsonRpcRequest = from_str(r#"{"method":"ping","id":null}"#).unwrap();
        assert_eq!(request.id, Some(RequestId::Null));
        assert!(!request.is_notification());

        let request: JsonRpcRequest = from_str(r#"{"method":"ping"}"#).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_null_params_are_empty() {
        let request: JsonRpcRequest = from_str(r#"{"method":"ping","params":null}"#).unwrap();
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_invalid_requests_fail_to_decode() {
        assert!(from_str::<JsonRpcRequest>(r#"{"method":5}"#).is_err());
        assert!(from_str::<JsonRpcRequest>(r#"{"method":"m","params":{"a":1}}"#).is_err());
        assert!(from_str::<JsonRpcRequest>(r#"{"jsonrpc":"1.0","method":"m"}"#).is_err());
    }
}
