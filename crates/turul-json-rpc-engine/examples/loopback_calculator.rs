//! Loopback Calculator Example
//!
//! Two engines connected back to back over an in-memory channel. The
//! "server" side registers calculator methods, the "client" side calls them
//! and also receives a progress notification pushed by the server.
//!
//! Run with `RUST_LOG=debug` to see the engine's own tracing output.

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;
use turul_json_rpc_engine::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (server_side, client_side) = ChannelTransport::pair();
    let server = JsonRpcEngine::new(server_side);
    let client = JsonRpcEngine::with_config(
        client_side,
        EngineConfig::default().with_call_timeout(Duration::from_secs(2)),
    );

    server.register("add", |a: f64, b: f64| async move { Ok::<_, BoxError>(a + b) })?;
    server.register("subtract", |a: f64, b: f64| async move { Ok::<_, BoxError>(a - b) })?;
    server.register("divide", |a: f64, b: f64| async move {
        if b == 0.0 {
            return Err::<f64, BoxError>("division by zero".into());
        }
        Ok(a / b)
    })?;

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    client.register("progress", move |step: u32, message: String| {
        let progress_tx = progress_tx.clone();
        async move {
            progress_tx.send((step, message))?;
            Ok::<_, BoxError>(())
        }
    })?;

    info!(methods = ?server.registered_methods(), "Calculator ready");

    let sum = client.call("add", vec![json!(5), json!(3)], None).await?;
    println!("5 + 3 = {sum}");

    let difference = client.call("subtract", vec![json!(10), json!(4)], None).await?;
    println!("10 - 4 = {difference}");

    match client.call("divide", vec![json!(1), json!(0)], None).await {
        Ok(value) => println!("1 / 0 = {value}"),
        Err(err) => println!("1 / 0 failed: {err}"),
    }

    match client.call("multiply", vec![json!(2), json!(2)], None).await {
        Ok(value) => println!("2 * 2 = {value}"),
        Err(err) => println!("2 * 2 failed: {err}"),
    }

    server
        .notify("progress", vec![json!(1), json!("calculations done")], None)
        .await?;
    if let Some((step, message)) = progress_rx.recv().await {
        println!("progress {step}: {message}");
    }

    client.notify("add", vec![json!(1), json!(1)], None).await?;
    println!("notification sent, no reply expected");

    server.shutdown();
    Ok(())
}
