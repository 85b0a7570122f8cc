//! Event dispatch: turns queued notification events into desktop alerts.

use async_trait::async_trait;
use chrono::Utc;

use nudge_common::traits::NotificationSink;
use nudge_common::types::{AlertIcon, DesktopAlert, EventKind, NotificationEvent};

/// Final stage of the queue. Delivery is fire-and-forget: failures are
/// logged here and never reach the producers.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, event: &NotificationEvent);
}

/// Dispatcher that renders every event as an OS notification.
pub struct DesktopDispatcher<S> {
    sink: S,
}

impl<S: NotificationSink> DesktopDispatcher<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Translate an event into a human-readable desktop alert.
    pub fn translate_event(event: &NotificationEvent) -> DesktopAlert {
        let (title, icon, click_url) = match &event.kind {
            EventKind::ReminderSent { recipient } => (
                format!("Slack - reminder sent to: {}", recipient),
                AlertIcon::Slack,
                None,
            ),
            EventKind::CommentAdded => (
                "Github - someone commented on your PR".to_string(),
                AlertIcon::Github,
                Some(event.pr_url.clone()),
            ),
            EventKind::CommentRemoved => (
                "Github - someone removed a comment from your PR".to_string(),
                AlertIcon::Github,
                Some(event.pr_url.clone()),
            ),
            EventKind::ReadyToMerge => (
                "Github - your PR is good to merge".to_string(),
                AlertIcon::Approved,
                Some(event.pr_url.clone()),
            ),
        };

        DesktopAlert {
            title,
            body: event.pr_url.clone(),
            icon,
            sound: true,
            click_url,
        }
    }
}

#[async_trait]
impl<S: NotificationSink> Dispatcher for DesktopDispatcher<S> {
    async fn dispatch(&self, event: &NotificationEvent) {
        let alert = Self::translate_event(event);
        let queued_ms = (Utc::now() - event.created_at).num_milliseconds();

        match self.sink.notify(&alert).await {
            Ok(()) => tracing::info!(
                event_id = %event.id,
                kind = %event.kind,
                queued_ms,
                title = %alert.title,
                "Desktop alert shown"
            ),
            Err(e) => tracing::warn!(
                event_id = %event.id,
                kind = %event.kind,
                error = %e,
                "Desktop alert failed"
            ),
        }
    }
}
