//! Collaborator seams between the engine and the outside world.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DesktopAlert, PullRequestRef, Recipient, ReviewSnapshot};

/// Chat platform that can list people and deliver direct messages.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Full directory snapshot, in the platform's own order.
    async fn list_recipients(&self) -> Result<Vec<Recipient>>;

    async fn send_message(&self, address: &str, text: &str) -> Result<()>;
}

/// Source of the current review-request state. Polled, never pushed.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_state(&self, pr: &PullRequestRef) -> Result<ReviewSnapshot>;
}

/// OS-level alert renderer. Fire-and-forget: returning `Ok` means the alert
/// was handed off, not that the user saw it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, alert: &DesktopAlert) -> Result<()>;
}
