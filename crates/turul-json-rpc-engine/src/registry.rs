//! Server side of the engine: method registration and dispatch.
//!
//! Every registration stores a type-erased [`MethodHandler`] together with
//! its declared arity. Dispatch checks the arity first, then lets the handler
//! decode its positional parameters, so parameter count and parameter type
//! mismatches map deterministically onto `InvalidParams`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::{
    JsonRpcEngineError, JsonRpcErrorObject, JsonRpcResult, PARAM_COUNT_MISMATCH, PARAMS_MISMATCH,
};
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcResponse;
use crate::types::RequestId;

/// Boxed error returned by handler functions
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single handler invocation
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Expected {expected} parameters, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Parameter {index} does not match the declared type: {source}")]
    ParamsMismatch {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The handler itself failed; never forwarded to the remote side
    #[error("Handler failed: {0}")]
    Failed(BoxError),

    #[error("Handler result could not be encoded: {0}")]
    ResultEncoding(#[source] serde_json::Error),
}

impl HandlerError {
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }
}

/// Trait for handling one registered JSON-RPC method
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Number of positional parameters the handler declares
    fn arity(&self) -> usize;

    /// Invoke the handler. `params.len()` has already been checked against
    /// [`MethodHandler::arity`].
    async fn invoke(&self, params: Vec<Value>) -> Result<Value, HandlerError>;
}

/// Async functions usable as method handlers.
///
/// Implemented for `Fn(A1, .., An) -> impl Future<Output = Result<Out, Err>>`
/// with up to eight parameters, where each parameter is
/// [`DeserializeOwned`], `Out` is [`Serialize`] and `Err` converts into a
/// [`BoxError`].
pub trait HandlerFn<Args>: Send + Sync + 'static {
    const ARITY: usize;

    fn call_with(&self, params: Vec<Value>) -> BoxFuture<'static, Result<Value, HandlerError>>;
}

fn decode_param<T: DeserializeOwned>(index: usize, value: Value) -> Result<T, HandlerError> {
    serde_json::from_value(value).map_err(|source| HandlerError::ParamsMismatch { index, source })
}

macro_rules! impl_handler_fn {
    ($arity:literal $(, $ty:ident $var:ident)*) => {
        impl<Func, Fut, Out, Err, $($ty,)*> HandlerFn<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<Out, Err>> + Send + 'static,
            Out: Serialize + Send + 'static,
            Err: Into<BoxError> + Send + 'static,
            $($ty: DeserializeOwned + Send + 'static,)*
        {
            const ARITY: usize = $arity;

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn call_with(
                &self,
                params: Vec<Value>,
            ) -> BoxFuture<'static, Result<Value, HandlerError>> {
                let actual = params.len();
                let [$($var),*]: [Value; $arity] = match params.try_into() {
                    Ok(values) => values,
                    Err(_) => {
                        return future::ready(Err(HandlerError::ArityMismatch {
                            expected: $arity,
                            actual,
                        }))
                        .boxed();
                    }
                };

                let mut index = 0usize;
                $(
                    let $var: $ty = match decode_param(index, $var) {
                        Ok(value) => value,
                        Err(error) => return future::ready(Err(error)).boxed(),
                    };
                    index += 1;
                )*

                let fut = (self)($($var),*);
                async move {
                    let out = fut.await.map_err(|e| HandlerError::Failed(e.into()))?;
                    serde_json::to_value(out).map_err(HandlerError::ResultEncoding)
                }
                .boxed()
            }
        }
    };
}

impl_handler_fn!(0);
impl_handler_fn!(1, A1 a1);
impl_handler_fn!(2, A1 a1, A2 a2);
impl_handler_fn!(3, A1 a1, A2 a2, A3 a3);
impl_handler_fn!(4, A1 a1, A2 a2, A3 a3, A4 a4);
impl_handler_fn!(5, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_handler_fn!(6, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_handler_fn!(7, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_handler_fn!(8, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);

/// Adapter turning a [`HandlerFn`] into a [`MethodHandler`]
pub struct FunctionHandler<F, Args> {
    func: F,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> FunctionHandler<F, Args>
where
    F: HandlerFn<Args>,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Args> MethodHandler for FunctionHandler<F, Args>
where
    F: HandlerFn<Args>,
    Args: 'static,
{
    fn arity(&self) -> usize {
        F::ARITY
    }

    async fn invoke(&self, params: Vec<Value>) -> Result<Value, HandlerError> {
        self.func.call_with(params).await
    }
}

/// Method name to handler map, scoped to one engine instance
#[derive(Default)]
pub struct MethodRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn MethodHandler>>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async function for `method`
    pub fn register<F, Args>(&self, method: impl Into<String>, handler: F) -> JsonRpcResult<()>
    where
        F: HandlerFn<Args>,
        Args: 'static,
    {
        self.register_handler(method, Arc::new(FunctionHandler::new(handler)))
    }

    /// Register a handler for `method`. Fails if the name is empty or
    /// already taken; an existing registration is never replaced.
    pub fn register_handler(
        &self,
        method: impl Into<String>,
        handler: Arc<dyn MethodHandler>,
    ) -> JsonRpcResult<()> {
        let method = method.into();
        if method.is_empty() {
            return Err(JsonRpcEngineError::invalid_argument(
                "method name must not be empty",
            ));
        }

        match self.handlers.write().entry(method) {
            Entry::Occupied(entry) => Err(JsonRpcEngineError::DuplicateMethod(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(method = %entry.key(), arity = handler.arity(), "Registered method");
                entry.insert(handler);
                Ok(())
            }
        }
    }

    /// Remove the registration for `method`. Returns whether one existed.
    pub fn unregister(&self, method: &str) -> bool {
        let removed = self.handlers.write().remove(method).is_some();
        if removed {
            debug!(method, "Unregistered method");
        }
        removed
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.read().contains_key(method)
    }

    /// Get all registered methods, sorted by name
    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.read().keys().cloned().collect();
        methods.sort();
        methods
    }

    fn lookup(&self, method: &str) -> Option<Arc<dyn MethodHandler>> {
        self.handlers.read().get(method).cloned()
    }

    /// Decode `object` as a request, invoke the matching handler and build
    /// the response. Always produces a response; `id` is echoed as given.
    pub async fn dispatch(&self, id: Option<RequestId>, object: Map<String, Value>) -> JsonRpcResponse {
        let request: JsonRpcRequest = match serde_json::from_value(Value::Object(object)) {
            Ok(request) => request,
            Err(error) => {
                debug!(%error, "Request could not be decoded");
                return JsonRpcResponse::error(
                    Some(id.unwrap_or(RequestId::Null)),
                    JsonRpcErrorObject::parse_error(None),
                );
            }
        };

        let Some(handler) = self.lookup(&request.method) else {
            debug!(method = %request.method, "Method not found");
            return JsonRpcResponse::error(id, JsonRpcErrorObject::method_not_found(&request.method));
        };

        if request.params.len() != handler.arity() {
            debug!(
                method = %request.method,
                expected = handler.arity(),
                actual = request.params.len(),
                "Parameter count mismatch"
            );
            return JsonRpcResponse::error(id, JsonRpcErrorObject::invalid_params(PARAM_COUNT_MISMATCH));
        }

        let method = request.method;
        match AssertUnwindSafe(handler.invoke(request.params)).catch_unwind().await {
            Ok(Ok(result)) => JsonRpcResponse::success(id, result),
            Ok(Err(HandlerError::ArityMismatch { .. })) => {
                JsonRpcResponse::error(id, JsonRpcErrorObject::invalid_params(PARAM_COUNT_MISMATCH))
            }
            Ok(Err(HandlerError::ParamsMismatch { index, source })) => {
                debug!(method = %method, index, error = %source, "Parameter type mismatch");
                JsonRpcResponse::error(id, JsonRpcErrorObject::invalid_params(PARAMS_MISMATCH))
            }
            Ok(Err(handler_error)) => {
                warn!(method = %method, error = %handler_error, "Handler failed");
                JsonRpcResponse::error(id, JsonRpcErrorObject::internal_error())
            }
            Err(_) => {
                error!(method = %method, "Handler panicked");
                JsonRpcResponse::error(id, JsonRpcErrorObject::internal_error())
            }
        }
    }
}
