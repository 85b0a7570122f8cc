//! PR watcher: polls the review source and turns state changes into events.
//!
//! The first successful poll is the baseline and emits nothing. After that,
//! each poll is diffed against the last recorded state:
//! - total comments up → `CommentAdded`
//! - total comments down → `CommentRemoved`
//! - not approved → approved → `ReadyToMerge` (latched, at most once per run)
//!
//! A failed poll leaves the recorded state untouched; the next tick retries.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use nudge_common::error::Result;
use nudge_common::traits::ReviewSource;
use nudge_common::types::{EventKind, PullRequestRef, ReviewSnapshot, ReviewState};
use nudge_notifier::NotificationSender;

/// Default poll interval (1 minute).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory diff state for one review request.
#[derive(Debug, Default)]
pub struct ReviewTracker {
    state: Option<ReviewState>,
}

impl ReviewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded state, `None` until a baseline exists.
    pub fn state(&self) -> Option<ReviewState> {
        self.state
    }

    /// Record a snapshot and return the transitions it represents.
    pub fn observe(&mut self, snapshot: &ReviewSnapshot) -> Vec<EventKind> {
        let total = snapshot.total_comments();
        let approved = snapshot.is_approved();

        let Some(state) = self.state.as_mut() else {
            self.state = Some(ReviewState {
                total_comments: total,
                approved,
            });
            return Vec::new();
        };

        let mut events = Vec::new();

        match total.cmp(&state.total_comments) {
            Ordering::Greater => events.push(EventKind::CommentAdded),
            Ordering::Less => events.push(EventKind::CommentRemoved),
            Ordering::Equal => {}
        }
        state.total_comments = total;

        if approved && !state.approved {
            state.approved = true;
            events.push(EventKind::ReadyToMerge);
        }

        events
    }
}

pub struct PrWatcher<S: ?Sized> {
    source: Arc<S>,
    pr: PullRequestRef,
    queue: NotificationSender,
    interval: Duration,
    tracker: ReviewTracker,
}

impl<S: ReviewSource + ?Sized> PrWatcher<S> {
    pub fn new(source: Arc<S>, pr: PullRequestRef, queue: NotificationSender) -> Self {
        Self {
            source,
            pr,
            queue,
            interval: DEFAULT_POLL_INTERVAL,
            tracker: ReviewTracker::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn tracker(&self) -> &ReviewTracker {
        &self.tracker
    }

    /// Poll once, enqueue any transitions, and return them.
    pub async fn poll_once(&mut self) -> Result<Vec<EventKind>> {
        let snapshot = self.source.fetch_state(&self.pr).await?;
        let had_baseline = self.tracker.state().is_some();
        let events = self.tracker.observe(&snapshot);

        if !had_baseline {
            tracing::info!(
                pr = %self.pr,
                comments = snapshot.total_comments(),
                mergeable_state = %snapshot.mergeable_state,
                "Baseline review state recorded"
            );
        }

        for kind in &events {
            tracing::info!(
                pr = %self.pr,
                event = %kind,
                comments = snapshot.total_comments(),
                "Review state changed"
            );
            self.queue.notify(kind.clone(), &self.pr.url);
        }

        Ok(events)
    }

    /// Poll on every interval tick until cancelled. The first tick is immediate.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            pr = %self.pr,
            poll_interval_secs = self.interval.as_secs(),
            "PR watcher started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.poll_once().await {
                        tracing::warn!(pr = %self.pr, error = %e, "Failed to poll pull request");
                    }
                }
            }
        }

        tracing::info!(pr = %self.pr, "PR watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use nudge_common::error::AppError;
    use nudge_common::types::{MergeableState, NotificationEvent};
    use nudge_notifier::{Dispatcher, QueueConsumer, notification_queue};

    /// Replays a fixed script of poll results; `None` is a failed poll.
    struct ScriptedSource {
        script: Mutex<VecDeque<Option<ReviewSnapshot>>>,
        polls: Mutex<usize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<ReviewSnapshot>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                polls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl ReviewSource for ScriptedSource {
        async fn fetch_state(&self, _pr: &PullRequestRef) -> Result<ReviewSnapshot> {
            *self.polls.lock().unwrap() += 1;
            match self.script.lock().unwrap().pop_front() {
                Some(Some(snapshot)) => Ok(snapshot),
                _ => Err(AppError::Review("502 Bad Gateway".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Dispatcher for Collect {
        async fn dispatch(&self, event: &NotificationEvent) {
            self.0.lock().unwrap().push(event.kind.clone());
        }
    }

    async fn drain(consumer: &mut QueueConsumer) -> Vec<EventKind> {
        let collect = Collect::default();
        while consumer.tick(&collect).await {}
        collect.0.into_inner().unwrap()
    }

    fn pr() -> PullRequestRef {
        PullRequestRef {
            url: "https://github.com/myorg/myrepo/pull/12".to_string(),
            owner: "myorg".to_string(),
            repo: "myrepo".to_string(),
            number: 12,
        }
    }

    fn snap(total: u64, state: MergeableState) -> Option<ReviewSnapshot> {
        Some(ReviewSnapshot {
            comments: total / 2,
            review_comments: total - total / 2,
            mergeable_state: state,
        })
    }

    async fn poll_all(script: Vec<Option<ReviewSnapshot>>) -> (Vec<EventKind>, ReviewTracker) {
        let polls = script.len();
        let (tx, mut rx) = notification_queue();
        let mut watcher = PrWatcher::new(ScriptedSource::new(script), pr(), tx);
        for _ in 0..polls {
            let _ = watcher.poll_once().await;
        }
        (drain(&mut rx).await, watcher.tracker)
    }

    #[test]
    fn test_baseline_emits_nothing() {
        let mut tracker = ReviewTracker::new();
        let events = tracker.observe(&snap(5, MergeableState::Blocked).unwrap());
        assert!(events.is_empty());
        assert_eq!(
            tracker.state(),
            Some(ReviewState {
                total_comments: 5,
                approved: false
            })
        );
    }

    #[tokio::test]
    async fn test_comment_sequence_emits_one_event_per_change() {
        use MergeableState::Blocked;
        let (events, tracker) = poll_all(vec![
            snap(5, Blocked),
            snap(5, Blocked),
            snap(8, Blocked),
            snap(8, Blocked),
            snap(6, Blocked),
        ])
        .await;

        assert_eq!(events, vec![EventKind::CommentAdded, EventKind::CommentRemoved]);
        assert_eq!(tracker.state().unwrap().total_comments, 6);
    }

    #[tokio::test]
    async fn test_ready_to_merge_latched_once() {
        use MergeableState::{Blocked, Clean};
        let (events, tracker) = poll_all(vec![
            snap(1, Blocked),
            snap(1, Clean),
            snap(1, Clean),
            snap(1, Blocked),
            snap(1, Clean),
        ])
        .await;

        assert_eq!(events, vec![EventKind::ReadyToMerge]);
        assert!(tracker.state().unwrap().approved);
    }

    #[tokio::test]
    async fn test_approved_baseline_never_emits_ready_to_merge() {
        use MergeableState::{Blocked, Clean};
        let (events, _) = poll_all(vec![
            snap(2, Clean),
            snap(2, Clean),
            snap(2, Blocked),
            snap(2, Clean),
        ])
        .await;

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_comment_and_approval_in_same_poll() {
        use MergeableState::{Blocked, Clean};
        let (events, _) = poll_all(vec![snap(5, Blocked), snap(6, Clean)]).await;
        assert_eq!(events, vec![EventKind::CommentAdded, EventKind::ReadyToMerge]);
    }

    #[tokio::test]
    async fn test_comments_keep_firing_after_approval() {
        use MergeableState::{Blocked, Clean};
        let (events, _) = poll_all(vec![
            snap(5, Blocked),
            snap(5, Clean),
            snap(7, Clean),
            snap(4, Clean),
        ])
        .await;
        assert_eq!(
            events,
            vec![
                EventKind::ReadyToMerge,
                EventKind::CommentAdded,
                EventKind::CommentRemoved
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_recorded_state() {
        use MergeableState::Blocked;
        let (tx, mut rx) = notification_queue();
        let mut watcher = PrWatcher::new(
            ScriptedSource::new(vec![snap(5, Blocked), None, snap(7, Blocked)]),
            pr(),
            tx,
        );

        assert!(watcher.poll_once().await.unwrap().is_empty());
        assert!(watcher.poll_once().await.is_err());
        assert_eq!(watcher.tracker().state().unwrap().total_comments, 5);
        assert_eq!(watcher.poll_once().await.unwrap(), vec![EventKind::CommentAdded]);

        assert_eq!(drain(&mut rx).await, vec![EventKind::CommentAdded]);
    }

    #[tokio::test]
    async fn test_failed_baseline_retried_on_next_poll() {
        use MergeableState::Clean;
        let (events, tracker) = poll_all(vec![None, snap(3, Clean), snap(3, Clean)]).await;
        assert!(events.is_empty());
        assert_eq!(
            tracker.state(),
            Some(ReviewState {
                total_comments: 3,
                approved: true
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_every_interval_until_cancelled() {
        use MergeableState::Blocked;
        let source = ScriptedSource::new(vec![
            snap(1, Blocked),
            snap(2, Blocked),
            snap(2, Blocked),
            snap(2, Blocked),
        ]);
        let (tx, mut rx) = notification_queue();
        let mut watcher = PrWatcher::new(source.clone(), pr(), tx)
            .with_interval(Duration::from_secs(60));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            trigger.cancel();
        });

        watcher.run(cancel).await;

        // Ticks at 0s, 60s and 120s.
        assert_eq!(*source.polls.lock().unwrap(), 3);
        assert_eq!(drain(&mut rx).await, vec![EventKind::CommentAdded]);
    }
}
