//! Test Helpers for the JSON-RPC engine integration tests
//!
//! A "raw peer" is the far end of a [`ChannelTransport`] pair driven by hand,
//! so tests can write exact wire bytes and inspect exact replies.

#![allow(dead_code)]

use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use serde_json::Value;
use turul_json_rpc_engine::prelude::*;

/// Install a test-friendly subscriber once; later calls are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An engine together with the hand-driven other end of its transport
pub struct RawPeer {
    pub engine: JsonRpcEngine<ChannelTransport>,
    pub peer: ChannelTransport,
}

impl RawPeer {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let (engine_side, peer) = ChannelTransport::pair();
        Self {
            engine: JsonRpcEngine::with_config(engine_side, config),
            peer,
        }
    }

    /// Write raw bytes to the engine
    pub async fn send(&self, text: &str) -> Result<()> {
        self.peer
            .send(Bytes::copy_from_slice(text.as_bytes()), None)
            .await
            .context("engine side of the channel is gone")
    }

    /// Next message the engine wrote, as text
    pub async fn next_text(&self) -> Result<String> {
        let received = tokio::time::timeout(Duration::from_secs(5), self.peer.receive())
            .await
            .context("engine sent nothing")??;
        Ok(String::from_utf8(received.bytes.to_vec())?)
    }

    /// Next message the engine wrote, parsed
    pub async fn next_json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.next_text().await?)?)
    }

    /// Send `text` and return the reply text
    pub async fn exchange(&self, text: &str) -> Result<String> {
        self.send(text).await?;
        self.next_text().await
    }
}
