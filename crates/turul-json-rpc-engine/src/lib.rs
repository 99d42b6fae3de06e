//! # JSON-RPC 2.0 Engine
//!
//! A transport-agnostic JSON-RPC 2.0 peer. The caller supplies a byte-level
//! [`Transport`]; the engine classifies inbound messages, dispatches requests
//! to registered handlers, correlates responses with outstanding calls and
//! runs the background pump that ties both sides together.
//!
//! ## Features
//! - Typed async handlers with positional parameters and checked arity
//! - Concurrent outbound calls with per-call timeouts
//! - Batches, notifications and the standard error taxonomy
//! - Opaque per-message state tokens for multi-peer transports
//!
//! ```no_run
//! use turul_json_rpc_engine::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> JsonRpcResult<()> {
//! let (left, right) = ChannelTransport::pair();
//! let server = JsonRpcEngine::new(left);
//! let client = JsonRpcEngine::new(right);
//!
//! server.register("greet", |name: String| async move {
//!     Ok::<_, BoxError>(format!("Hello, {name}!"))
//! })?;
//! client.notify("log", vec![json!("fire and forget")], None).await?;
//! let greeting = client.call("greet", vec![json!("Ada")], None).await?;
//! assert_eq!(greeting, json!("Hello, Ada!"));
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod correlator;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod pump;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

// Re-export main types
pub use classifier::{MessageClassifier, MessageKind};
pub use config::EngineConfig;
pub use correlator::{CallCorrelator, PendingCalls, PendingOutcome};
pub use engine::JsonRpcEngine;
pub use error::{JsonRpcEngineError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcResult};
pub use registry::{BoxError, FunctionHandler, HandlerError, HandlerFn, MethodHandler, MethodRegistry};
pub use request::JsonRpcRequest;
pub use response::{JsonRpcReply, JsonRpcResponse};
pub use transport::{ChannelTransport, Received, Transport, TransportError};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}
