//! # Call Timeout Tests
//!
//! Run on a paused Tokio clock, so deadlines elapse as soon as every task
//! is idle.

mod test_helpers;

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use test_helpers::RawPeer;
use turul_json_rpc_engine::prelude::*;

#[tokio::test(start_paused = true)]
async fn test_unanswered_call_times_out_without_residue() -> Result<()> {
    let raw = RawPeer::new();

    let error = raw
        .engine
        .call_with_timeout("silent", vec![], None, Duration::from_millis(250))
        .await
        .unwrap_err();

    assert!(error.is_timeout());
    assert!(matches!(error, JsonRpcEngineError::Timeout(t) if t == Duration::from_millis(250)));
    assert_eq!(raw.engine.pending_calls(), 0);

    // The request did go out; answering it now is a no-op
    let request = raw.next_json().await?;
    let late = json!({"jsonrpc": "2.0", "result": 1, "id": request["id"]});
    raw.send(&late.to_string()).await?;

    // The engine is still alive and answers the next message
    assert_eq!(
        raw.exchange(r#"{"jsonrpc":"2.0","method":"missing","id":2}"#).await?,
        r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method missing could not be found."},"id":2}"#
    );
    assert_eq!(raw.engine.pending_calls(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_default_timeout_comes_from_config() -> Result<()> {
    let raw = RawPeer::with_config(
        EngineConfig::default().with_call_timeout(Duration::from_millis(40)),
    );

    let started = tokio::time::Instant::now();
    let error = raw.engine.call("silent", vec![], None).await.unwrap_err();

    assert!(matches!(error, JsonRpcEngineError::Timeout(t) if t == Duration::from_millis(40)));
    assert!(started.elapsed() >= Duration::from_millis(40));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeout_of_one_call_does_not_affect_another() -> Result<()> {
    let raw = RawPeer::new();

    let short = raw
        .engine
        .call_with_timeout("first", vec![], None, Duration::from_millis(10));
    let long = raw
        .engine
        .call_with_timeout("second", vec![], None, Duration::from_secs(30));

    let answer = async {
        let first = raw.next_json().await?;
        let second = raw.next_json().await?;
        assert_eq!(first["method"], "first");
        assert_eq!(second["method"], "second");

        tokio::time::sleep(Duration::from_millis(100)).await;
        let response = json!({"jsonrpc": "2.0", "result": "late but in time", "id": second["id"]});
        raw.send(&response.to_string()).await
    };

    let (short, long, answered) = tokio::join!(short, long, answer);
    answered?;

    assert!(short.unwrap_err().is_timeout());
    assert_eq!(long?, json!("late but in time"));
    assert_eq!(raw.engine.pending_calls(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_call_leaves_no_pending_entry() -> Result<()> {
    let raw = RawPeer::new();

    let call = raw
        .engine
        .call_with_timeout("abandoned", vec![], None, Duration::from_secs(60));
    let cancelled = tokio::time::timeout(Duration::from_millis(5), call).await;

    assert!(cancelled.is_err());
    assert_eq!(raw.engine.pending_calls(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_malformed_response_still_waits_for_the_deadline() -> Result<()> {
    let raw = RawPeer::new();

    let started = tokio::time::Instant::now();
    let call = raw
        .engine
        .call_with_timeout("broken", vec![], None, Duration::from_millis(1000));

    let answer = async {
        let request = raw.next_json().await?;
        let malformed = json!({"jsonrpc": "2.0", "error": "not an object", "id": request["id"]});
        raw.send(&malformed.to_string()).await
    };

    let (result, answered) = tokio::join!(call, answer);
    answered?;

    let error = result.unwrap_err();
    assert!(error.is_timeout());
    assert!(matches!(error, JsonRpcEngineError::Timeout(t) if t == Duration::from_millis(1000)));
    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(raw.engine.pending_calls(), 0);
    Ok(())
}
