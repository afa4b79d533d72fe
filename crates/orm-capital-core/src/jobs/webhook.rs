//! Webhook delivery with bounded retry and exponential backoff (§4.9).
//!
//! Transport is out of scope (§1 Non-goals) — the actual POST is behind the
//! injected [`WebhookSender`] handle so the core never depends on an HTTP
//! client crate; callers wire in a real sender at the composition root.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

const MAX_ATTEMPTS: u32 = 5;
const BASE_BACKOFF: Duration = Duration::from_millis(200);

#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send(&self, url: &str, payload: &Value) -> Result<(), String>;
}

/// Attempt delivery up to `MAX_ATTEMPTS` times with exponential backoff.
/// Returns `(delivered, attempts)` — final failure is not itself an error,
/// it just leaves the job's `webhook_delivered = false` (§7 recovery policy).
pub async fn deliver(sender: &dyn WebhookSender, url: &str, payload: &Value) -> (bool, u32) {
    let mut attempts = 0;
    let mut backoff = BASE_BACKOFF;
    loop {
        attempts += 1;
        match sender.send(url, payload).await {
            Ok(()) => return (true, attempts),
            Err(_) if attempts < MAX_ATTEMPTS => {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(_) => return (false, attempts),
        }
    }
}
