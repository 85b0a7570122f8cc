//! Notification queue: single-consumer FIFO between producers and alert delivery.
//!
//! Producers (reminder scheduler, PR watcher) hold cloned `NotificationSender`s
//! and append without blocking. One `QueueConsumer` pops at most one event per
//! tick and hands it to a `Dispatcher`, so desktop alerts never pile on top of
//! each other and arrive in enqueue order.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use nudge_common::types::{EventKind, NotificationEvent};

use crate::dispatcher::Dispatcher;

/// Create an unbounded queue, returning the producer handle and its only consumer.
pub fn notification_queue() -> (NotificationSender, QueueConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotificationSender { tx }, QueueConsumer { rx, delivered: 0 })
}

/// Cloneable append-only handle to the queue.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl NotificationSender {
    /// Append an event to the back of the queue. Never blocks.
    pub fn enqueue(&self, event: NotificationEvent) {
        let kind = event.kind.to_string();
        if let Err(e) = self.tx.send(event) {
            // Only happens once the consumer has shut down.
            tracing::warn!(
                event_id = %e.0.id,
                kind = %kind,
                "Notification queue closed, event not delivered"
            );
        }
    }

    /// Build and enqueue an event for `pr_url`.
    pub fn notify(&self, kind: EventKind, pr_url: &str) {
        self.enqueue(NotificationEvent::new(kind, pr_url));
    }
}

/// The queue's single consumer.
pub struct QueueConsumer {
    rx: mpsc::UnboundedReceiver<NotificationEvent>,
    delivered: u64,
}

impl QueueConsumer {
    /// Pop one event, if any, and dispatch it. Returns whether an event was delivered.
    pub async fn tick<D>(&mut self, dispatcher: &D) -> bool
    where
        D: Dispatcher + ?Sized,
    {
        let Ok(event) = self.rx.try_recv() else {
            return false;
        };

        tracing::debug!(event_id = %event.id, kind = %event.kind, "Dispatching notification");
        dispatcher.dispatch(&event).await;
        self.delivered += 1;
        true
    }

    /// Number of events handed to the dispatcher so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Drain the queue one event per `tick` until cancelled.
    pub async fn run<D>(mut self, dispatcher: &D, tick: Duration, cancel: CancellationToken)
    where
        D: Dispatcher + ?Sized,
    {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(tick_ms = tick.as_millis() as u64, "Notification queue consumer started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick(dispatcher).await;
                }
            }
        }

        let mut undelivered = 0u64;
        while self.rx.try_recv().is_ok() {
            undelivered += 1;
        }
        if undelivered > 0 {
            tracing::warn!(undelivered, "Shutting down with notifications still queued");
        }
        tracing::info!(delivered = self.delivered, "Notification queue consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(Instant, NotificationEvent)>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<EventKind> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|(_, e)| e.kind.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Dispatcher for Recorder {
        async fn dispatch(&self, event: &NotificationEvent) {
            self.seen
                .lock()
                .unwrap()
                .push((Instant::now(), event.clone()));
        }
    }

    fn reminder(name: &str) -> EventKind {
        EventKind::ReminderSent {
            recipient: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_tick_pops_exactly_one_in_fifo_order() {
        let (tx, mut rx) = notification_queue();
        let recorder = Recorder::default();

        tx.notify(reminder("a"), "pr");
        tx.notify(EventKind::CommentAdded, "pr");
        tx.notify(EventKind::ReadyToMerge, "pr");

        assert!(rx.tick(&recorder).await);
        assert_eq!(recorder.kinds(), vec![reminder("a")]);

        assert!(rx.tick(&recorder).await);
        assert!(rx.tick(&recorder).await);
        assert_eq!(
            recorder.kinds(),
            vec![reminder("a"), EventKind::CommentAdded, EventKind::ReadyToMerge]
        );

        // Empty queue: nothing happens this tick.
        assert!(!rx.tick(&recorder).await);
        assert_eq!(rx.delivered(), 3);
    }

    #[tokio::test]
    async fn test_same_instant_events_each_delivered_once() {
        let (tx, mut rx) = notification_queue();
        let recorder = Recorder::default();

        let first = NotificationEvent::new(EventKind::CommentAdded, "pr");
        let second = NotificationEvent::new(EventKind::CommentAdded, "pr");
        tx.enqueue(first.clone());
        tx.enqueue(second.clone());

        while rx.tick(&recorder).await {}

        let ids: Vec<_> = recorder
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_delivers_one_per_tick_until_cancelled() {
        let (tx, rx) = notification_queue();
        let recorder = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();
        let tick = Duration::from_secs(3);

        tx.notify(reminder("a"), "pr");
        tx.notify(reminder("b"), "pr");
        tx.notify(reminder("c"), "pr");

        let handle = {
            let recorder = recorder.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { rx.run(recorder.as_ref(), tick, cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();
        handle.await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        let kinds: Vec<EventKind> = seen.iter().map(|(_, e)| e.kind.clone()).collect();
        assert_eq!(kinds, vec![reminder("a"), reminder("b"), reminder("c")]);
        for pair in seen.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= tick);
        }
    }

    #[tokio::test]
    async fn test_enqueue_after_consumer_dropped_does_not_panic() {
        let (tx, rx) = notification_queue();
        drop(rx);
        tx.notify(EventKind::CommentRemoved, "pr");
    }
}
