use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;

pub(crate) const UNPARSEABLE_MESSAGE: &str = "Unable to parse request message.";
pub(crate) const EMPTY_BATCH: &str = "Request array must not be empty.";
pub(crate) const NOT_AN_OBJECT: &str = "The message is not a valid request object.";
pub(crate) const REQUEST_AND_RESPONSE: &str =
    "A JSON-RPC message must not be a message and response at the same time.";
pub(crate) const NEITHER_REQUEST_NOR_RESPONSE: &str = "Not a valid JSON-RPC request or response.";
pub(crate) const PARAMS_MISMATCH: &str =
    "The provided parameters do not match the registered method.";
pub(crate) const PARAM_COUNT_MISMATCH: &str = "The method has a different parameter count.";

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => crate::error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => crate::error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => crate::error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => crate::error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => crate::error_codes::INTERNAL_ERROR,
        }
    }

    /// Map a numeric code back to one of the predefined codes.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            crate::error_codes::PARSE_ERROR => Some(JsonRpcErrorCode::ParseError),
            crate::error_codes::INVALID_REQUEST => Some(JsonRpcErrorCode::InvalidRequest),
            crate::error_codes::METHOD_NOT_FOUND => Some(JsonRpcErrorCode::MethodNotFound),
            crate::error_codes::INVALID_PARAMS => Some(JsonRpcErrorCode::InvalidParams),
            crate::error_codes::INTERNAL_ERROR => Some(JsonRpcErrorCode::InternalError),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
///
/// `message` and `data` are left out of the wire form when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>) -> Self {
        Self {
            code: code.code(),
            message,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(message: Option<&str>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, message.map(str::to_string))
    }

    pub fn invalid_request(message: &str) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, Some(message.to_string()))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method {} could not be found.", method)),
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, Some(message.to_string()))
    }

    /// Internal errors carry no message so handler internals stay local.
    pub fn internal_error() -> Self {
        Self::new(JsonRpcErrorCode::InternalError, None)
    }

    pub fn kind(&self) -> Option<JsonRpcErrorCode> {
        JsonRpcErrorCode::from_code(self.code)
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "JSON-RPC Error {}: {}", self.code, message),
            None => write!(f, "JSON-RPC Error {}", self.code),
        }
    }
}

/// Errors surfaced to callers of the engine.
#[derive(Debug, Error)]
pub enum JsonRpcEngineError {
    /// Rejected locally, never sent over the wire
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("A handler for method '{0}' has already been registered")]
    DuplicateMethod(String),

    /// The peer answered a call with an error response
    #[error("Remote error (code {code}): {}", .message.as_deref().unwrap_or("<no message>"))]
    Remote {
        code: i64,
        message: Option<String>,
        data: Option<Value>,
    },

    #[error("No response received within {0:?}")]
    Timeout(Duration),

    #[error("Correlation id '{0}' is already in use")]
    IdCollision(String),

    #[error("Pending call '{0}' was dropped before a response was delivered")]
    ResponseDropped(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl JsonRpcEngineError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Get the error code if this is a remote error
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<JsonRpcErrorObject> for JsonRpcEngineError {
    fn from(error: JsonRpcErrorObject) -> Self {
        Self::Remote {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

/// Result type for engine operations
pub type JsonRpcResult<T> = Result<T, JsonRpcEngineError>;
