//! # JSON-RPC Engine Prelude
//!
//! Convenient re-exports of the most commonly used types.
//!
//! ```rust
//! use turul_json_rpc_engine::prelude::*;
//! ```

// Engine and transport
pub use crate::config::EngineConfig;
pub use crate::engine::JsonRpcEngine;
pub use crate::transport::{ChannelTransport, Received, Transport, TransportError};

// Handlers
pub use crate::registry::{BoxError, HandlerError, MethodHandler};

// Messages and errors
pub use crate::error::{JsonRpcEngineError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcResult};
pub use crate::request::JsonRpcRequest;
pub use crate::response::JsonRpcResponse;
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;
