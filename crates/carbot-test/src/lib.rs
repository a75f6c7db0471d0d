//! Carbot Test Harness
//!
//! This crate provides:
//! - `ScriptedTransport`: an in-memory `Transport` with scriptable reads,
//!   create results, connect failures, and a controllable push link
//! - `RecordingPresenter`: captures everything the monitor presents
//! - `wait_until`: polling helper for settling async assertions

pub mod recording;
pub mod script;

pub use recording::*;
pub use script::*;

use std::future::Future;
use std::time::Duration;

/// Poll `condition` until it holds or two seconds pass. Panics on timeout,
/// which keeps failing tests loud instead of hung.
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    wait_until_async(what, || {
        let holds = condition();
        async move { holds }
    })
    .await;
}

/// `wait_until` for conditions that need to await.
pub async fn wait_until_async<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if condition().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
