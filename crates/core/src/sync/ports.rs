//! Port interfaces for agent-to-backend delivery

use async_trait::async_trait;
use focusledger_domain::{Result, TrackedInterval};

/// Destination of locally buffered intervals.
///
/// Delivery is at-least-once: the same interval may be transmitted again
/// after a partial failure, so receivers should treat `interval.id` as an
/// idempotency key.
#[async_trait]
pub trait RemoteIntervalSink: Send + Sync {
    async fn transmit(&self, interval: &TrackedInterval) -> Result<()>;
}
