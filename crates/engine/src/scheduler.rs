//! Reminder scheduler: bounded, per-recipient reminder jobs.
//!
//! Every matched recipient gets an immediate reminder and then one more every
//! `interval`, until `max_sends` reminders (including the first) have been
//! attempted. Job state lives in one owned map keyed by recipient ID and is
//! advanced by a single loop that sleeps until the earliest due job.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use nudge_common::error::Result;
use nudge_common::traits::ChatPlatform;
use nudge_common::types::{EventKind, Recipient};
use nudge_notifier::NotificationSender;

use crate::directory::{MatchOutcome, match_recipients};

/// Default delay between reminders to one recipient (1 hour).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

/// Default number of reminders per recipient, including the first.
pub const DEFAULT_MAX_SENDS: u32 = 5;

/// Suffixes appended to the PR link in reminder messages.
pub const REMINDER_PHRASES: &[&str] = &[
    "when you get a chance - thanks",
    "thanks",
    "whenever you get the time",
    "needs a review",
    "review please",
    "PR for ya",
    "much appreciated",
    "feedback welcome",
];

/// Build a reminder message: the PR link followed by a random phrase.
pub fn reminder_text(pr_url: &str) -> String {
    let phrase = REMINDER_PHRASES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("review please");
    format!("{pr_url} {phrase}")
}

/// Per-recipient reminder state.
#[derive(Debug, Clone)]
pub struct ReminderJob {
    pub recipient: Recipient,
    /// Reminders attempted so far, including the initial one.
    pub sent: u32,
    pub next_fire: Instant,
}

pub struct ReminderScheduler<C: ?Sized> {
    chat: Arc<C>,
    queue: NotificationSender,
    pr_url: String,
    interval: Duration,
    max_sends: u32,
    jobs: HashMap<String, ReminderJob>,
}

impl<C: ChatPlatform + ?Sized> ReminderScheduler<C> {
    pub fn new(chat: Arc<C>, queue: NotificationSender, pr_url: impl Into<String>) -> Self {
        Self {
            chat,
            queue,
            pr_url: pr_url.into(),
            interval: DEFAULT_INTERVAL,
            max_sends: DEFAULT_MAX_SENDS,
            jobs: HashMap::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_sends(mut self, max_sends: u32) -> Self {
        self.max_sends = max_sends.max(1);
        self
    }

    /// Job for a recipient ID, if one is still active.
    pub fn job(&self, recipient_id: &str) -> Option<&ReminderJob> {
        self.jobs.get(recipient_id)
    }

    pub fn active_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Load the chat directory and schedule `targets` against it.
    ///
    /// A failed directory lookup leaves no jobs behind; the caller decides
    /// whether the rest of the run continues.
    pub async fn start(&mut self, targets: &[String]) -> Result<MatchOutcome> {
        let directory = self.chat.list_recipients().await?;
        tracing::info!(members = directory.len(), "Loaded chat directory");
        Ok(self.schedule(targets, &directory).await)
    }

    /// Match `targets` against `directory`, send the initial reminders and
    /// create one job per matched recipient.
    pub async fn schedule(&mut self, targets: &[String], directory: &[Recipient]) -> MatchOutcome {
        let outcome = match_recipients(targets, directory);

        for recipient in &outcome.matched {
            if self.jobs.contains_key(&recipient.id) {
                tracing::debug!(recipient_id = %recipient.id, "Reminder job already active");
                continue;
            }

            self.send_reminder(recipient).await;
            let job = ReminderJob {
                recipient: recipient.clone(),
                sent: 1,
                next_fire: Instant::now() + self.interval,
            };
            if job.sent < self.max_sends {
                self.jobs.insert(recipient.id.clone(), job);
            }
        }

        if !outcome.unresolved.is_empty() {
            tracing::error!(
                names = %outcome.unresolved.join(", "),
                "Invalid Slack username(s), messages not sent. Please enter a valid Slack user"
            );
        }

        tracing::info!(
            matched = outcome.matched.len(),
            unresolved = outcome.unresolved.len(),
            interval_secs = self.interval.as_secs(),
            max_sends = self.max_sends,
            "Reminders scheduled"
        );

        outcome
    }

    /// Fire every job due at `now`. Jobs reaching the cap are discarded.
    /// Returns the number of jobs fired.
    pub async fn fire_due(&mut self, now: Instant) -> usize {
        let mut due: Vec<(Instant, String)> = self
            .jobs
            .iter()
            .filter(|(_, job)| job.next_fire <= now)
            .map(|(id, job)| (job.next_fire, id.clone()))
            .collect();
        due.sort();

        for (_, id) in &due {
            let Some(mut job) = self.jobs.remove(id) else {
                continue;
            };

            self.send_reminder(&job.recipient).await;
            job.sent += 1;
            job.next_fire = now + self.interval;

            if job.sent >= self.max_sends {
                tracing::info!(
                    recipient = %job.recipient.name,
                    sent = job.sent,
                    "Reminder limit reached, no more reminders for this recipient"
                );
            } else {
                self.jobs.insert(id.clone(), job);
            }
        }

        due.len()
    }

    /// Advance jobs until every one has reached its cap or `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        loop {
            let Some(next) = self.jobs.values().map(|job| job.next_fire).min() else {
                tracing::info!("All reminder jobs finished");
                return;
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(active = self.jobs.len(), "Reminder scheduler cancelled");
                    return;
                }
                _ = tokio::time::sleep_until(next) => {
                    self.fire_due(Instant::now()).await;
                }
            }
        }
    }

    /// Send one reminder. A failed send is logged and produces no event.
    async fn send_reminder(&self, recipient: &Recipient) -> bool {
        let text = reminder_text(&self.pr_url);

        match self.chat.send_message(&recipient.id, &text).await {
            Ok(()) => {
                tracing::info!(
                    recipient = %recipient.name,
                    recipient_id = %recipient.id,
                    "Reminder sent"
                );
                self.queue.notify(
                    EventKind::ReminderSent {
                        recipient: recipient.name.clone(),
                    },
                    &self.pr_url,
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    recipient = %recipient.name,
                    recipient_id = %recipient.id,
                    error = %e,
                    "Failed to send reminder"
                );
                false
            }
        }
    }
}
