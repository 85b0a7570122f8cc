//! Scheduling and state-tracking engine: reminder jobs and the PR watcher.

pub mod directory;
pub mod scheduler;
pub mod watcher;

pub use directory::{MatchOutcome, match_recipients};
pub use scheduler::{ReminderJob, ReminderScheduler};
pub use watcher::{PrWatcher, ReviewTracker};
