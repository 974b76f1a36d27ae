//! Port interfaces for activity tracking
//!
//! These traits define the boundaries between the sampling/coalescing logic
//! and the OS / storage implementations behind it.

use async_trait::async_trait;
use focusledger_domain::{ActiveWindow, Result, TrackedInterval};
use uuid::Uuid;

/// Queries the operating system for the focused window.
#[async_trait]
pub trait ActiveWindowProvider: Send + Sync {
    /// `None` when nothing is focused (locked screen, desktop).
    async fn active_window(&self) -> Result<Option<ActiveWindow>>;
}

/// Append-only agent-side buffer of finalized intervals awaiting delivery.
#[async_trait]
pub trait LocalIntervalStore: Send + Sync {
    /// Appends intervals. Re-appending an id already present is a no-op.
    async fn append(&self, intervals: &[TrackedInterval]) -> Result<()>;

    /// Everything not yet cleared, oldest first.
    async fn pending(&self) -> Result<Vec<TrackedInterval>>;

    /// Removes delivered intervals, returning how many were removed.
    async fn clear(&self, ids: &[Uuid]) -> Result<usize>;
}
