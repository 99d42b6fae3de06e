//! The public engine: one transport, one pump, one registry and one table
//! of pending calls.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::classifier::MessageClassifier;
use crate::config::EngineConfig;
use crate::correlator::{CallCorrelator, PendingCalls};
use crate::error::JsonRpcResult;
use crate::pump::TransportPump;
use crate::registry::{HandlerFn, MethodHandler, MethodRegistry};
use crate::transport::Transport;

/// JSON-RPC 2.0 peer running over a caller-supplied [`Transport`].
///
/// The same engine serves inbound requests through its registered methods
/// and issues outbound notifications and calls. All methods take `&self`, so
/// an engine can be shared across tasks behind an `Arc`.
///
/// ```no_run
/// use turul_json_rpc_engine::prelude::*;
/// use serde_json::json;
///
/// # async fn example() -> JsonRpcResult<()> {
/// let (left, right) = ChannelTransport::pair();
/// let server = JsonRpcEngine::new(left);
/// let client = JsonRpcEngine::new(right);
///
/// server.register("add", |a: i64, b: i64| async move { Ok::<_, BoxError>(a + b) })?;
/// let sum = client.call("add", vec![json!(2), json!(3)], None).await?;
/// assert_eq!(sum, json!(5));
/// # Ok(())
/// # }
/// ```
pub struct JsonRpcEngine<T: Transport> {
    config: EngineConfig,
    registry: Arc<MethodRegistry>,
    correlator: CallCorrelator<T>,
    pump: JoinHandle<()>,
}

impl<T: Transport> JsonRpcEngine<T> {
    /// Create an engine with the default configuration and start its pump.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    /// Create an engine and start its pump.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        Self::from_shared(Arc::new(transport), config)
    }

    /// Create an engine over a transport that is also used elsewhere.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn from_shared(transport: Arc<T>, config: EngineConfig) -> Self {
        let registry = Arc::new(MethodRegistry::new());
        let pending = Arc::new(PendingCalls::new());

        let classifier = MessageClassifier::new(
            Arc::clone(&registry),
            Arc::clone(&pending),
            config.reply_to_notifications,
        );
        let pump = TransportPump::new(
            Arc::clone(&transport),
            classifier,
            config.receive_error_backoff,
        )
        .spawn();

        debug!(?config, "JSON-RPC engine created");
        Self {
            correlator: CallCorrelator::new(transport, pending),
            config,
            registry,
            pump,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register an async function as the handler for `method`
    pub fn register<F, Args>(&self, method: impl Into<String>, handler: F) -> JsonRpcResult<()>
    where
        F: HandlerFn<Args>,
        Args: 'static,
    {
        self.registry.register(method, handler)
    }

    /// Register a custom [`MethodHandler`] for `method`
    pub fn register_handler(
        &self,
        method: impl Into<String>,
        handler: Arc<dyn MethodHandler>,
    ) -> JsonRpcResult<()> {
        self.registry.register_handler(method, handler)
    }

    /// Remove the handler for `method`. Unknown methods are ignored.
    pub fn unregister(&self, method: &str) -> bool {
        self.registry.unregister(method)
    }

    pub fn registered_methods(&self) -> Vec<String> {
        self.registry.registered_methods()
    }

    /// Send a notification. No response is expected or awaited.
    pub async fn notify(
        &self,
        method: &str,
        params: Vec<Value>,
        state: Option<T::State>,
    ) -> JsonRpcResult<()> {
        self.correlator.notify(method, params, state).await
    }

    /// Call `method` and wait for its result, using the configured
    /// [`EngineConfig::call_timeout`].
    pub async fn call(
        &self,
        method: &str,
        params: Vec<Value>,
        state: Option<T::State>,
    ) -> JsonRpcResult<Value> {
        self.call_with_timeout(method, params, state, self.config.call_timeout)
            .await
    }

    /// Call `method` and wait at most `timeout` for its result
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Vec<Value>,
        state: Option<T::State>,
        timeout: Duration,
    ) -> JsonRpcResult<Value> {
        self.correlator.call(method, params, state, timeout).await
    }

    /// Number of calls still waiting for a response
    pub fn pending_calls(&self) -> usize {
        self.correlator.pending().len()
    }

    /// Whether the pump is still receiving
    pub fn is_running(&self) -> bool {
        !self.pump.is_finished()
    }

    /// Stop the pump and fail all outstanding calls
    pub fn shutdown(&self) {
        self.pump.abort();
        self.correlator.pending().clear();
        debug!("JSON-RPC engine shut down");
    }
}

impl<T: Transport> Drop for JsonRpcEngine<T> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcEngineError;
    use crate::registry::BoxError;
    use crate::transport::ChannelTransport;
    use serde_json::json;

    fn connected() -> (JsonRpcEngine<ChannelTransport>, JsonRpcEngine<ChannelTransport>) {
        let (left, right) = ChannelTransport::pair();
        (JsonRpcEngine::new(left), JsonRpcEngine::new(right))
    }

    #[tokio::test]
    async fn test_call_round_trip() {
        let (server, client) = connected();
        server
            .register("concat", |a: String, b: String| async move { Ok::<_, BoxError>(a + &b) })
            .unwrap();

        let result = client
            .call("concat", vec![json!("foo"), json!("bar")], None)
            .await
            .unwrap();

        assert_eq!(result, json!("foobar"));
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_method_not_found() {
        let (_server, client) = connected();

        let error = client.call("missing", vec![], None).await.unwrap_err();
        match error {
            JsonRpcEngineError::Remote { code, message, .. } => {
                assert_eq!(code, -32601);
                assert_eq!(message.as_deref(), Some("Method missing could not be found."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_registration_surface() {
        let (server, _client) = connected();
        server.register("b", || async { Ok::<_, BoxError>(1) }).unwrap();
        server.register("a", || async { Ok::<_, BoxError>(2) }).unwrap();

        assert_eq!(server.registered_methods(), vec!["a", "b"]);
        assert!(server.register("a", || async { Ok::<_, BoxError>(3) }).is_err());
        assert!(server.unregister("a"));
        assert!(!server.unregister("a"));
        assert_eq!(server.registered_methods(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_shutdown_fails_outstanding_calls() {
        let (server, client) = connected();
        let client = Arc::new(client);
        server
            .register("never", || async {
                std::future::pending::<()>().await;
                Ok::<_, BoxError>(())
            })
            .unwrap();

        let call = tokio::spawn({
            let client = Arc::clone(&client);
            async move {
                client
                    .call_with_timeout("never", vec![], None, Duration::from_secs(60))
                    .await
            }
        });

        while client.pending_calls() == 0 {
            tokio::task::yield_now().await;
        }
        client.shutdown();

        assert!(matches!(
            call.await.unwrap(),
            Err(JsonRpcEngineError::ResponseDropped(_))
        ));
        assert_eq!(client.pending_calls(), 0);

        for _ in 0..100 {
            if !client.is_running() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!client.is_running());
    }

    #[tokio::test]
    async fn test_pump_stops_when_peer_goes_away() {
        let (server, client) = connected();
        drop(client);

        for _ in 0..100 {
            if !server.is_running() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!server.is_running());
    }
}
