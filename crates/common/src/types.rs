use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An addressable person in the chat-platform directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Opaque delivery address assigned by the directory (e.g. a Slack user ID).
    pub id: String,
    /// Display name / handle.
    pub name: String,
    /// Real name from the profile. May be empty.
    pub real_name: String,
}

impl Recipient {
    pub fn new(id: impl Into<String>, name: impl Into<String>, real_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            real_name: real_name.into(),
        }
    }

    /// Normalized identity strings this recipient can be matched by.
    pub fn match_keys(&self) -> [String; 2] {
        [normalize_name(&self.name), normalize_name(&self.real_name)]
    }
}

/// Case-insensitive comparison key for recipient names.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A validated pull request reference parsed from the `pr` setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub url: String,
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// GitHub's `mergeable_state` for a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeableState {
    Clean,
    Unstable,
    HasHooks,
    Blocked,
    Behind,
    Dirty,
    Draft,
    #[serde(other)]
    Unknown,
}

impl MergeableState {
    /// Mergeable and not blocked from integration.
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            MergeableState::Clean | MergeableState::Unstable | MergeableState::HasHooks
        )
    }
}

impl std::fmt::Display for MergeableState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeableState::Clean => write!(f, "clean"),
            MergeableState::Unstable => write!(f, "unstable"),
            MergeableState::HasHooks => write!(f, "has_hooks"),
            MergeableState::Blocked => write!(f, "blocked"),
            MergeableState::Behind => write!(f, "behind"),
            MergeableState::Dirty => write!(f, "dirty"),
            MergeableState::Draft => write!(f, "draft"),
            MergeableState::Unknown => write!(f, "unknown"),
        }
    }
}

/// One poll of the review-request state source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSnapshot {
    pub comments: u64,
    pub review_comments: u64,
    pub mergeable_state: MergeableState,
}

impl ReviewSnapshot {
    pub fn total_comments(&self) -> u64 {
        self.comments + self.review_comments
    }

    pub fn is_approved(&self) -> bool {
        self.mergeable_state.is_ready()
    }
}

/// Last recorded review state. `approved` is a one-way latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewState {
    pub total_comments: u64,
    pub approved: bool,
}

/// What happened, without the review-request it happened to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    ReminderSent { recipient: String },
    CommentAdded,
    CommentRemoved,
    ReadyToMerge,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::ReminderSent { .. } => write!(f, "reminder_sent"),
            EventKind::CommentAdded => write!(f, "comment_added"),
            EventKind::CommentRemoved => write!(f, "comment_removed"),
            EventKind::ReadyToMerge => write!(f, "ready_to_merge"),
        }
    }
}

/// A notification request travelling through the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub kind: EventKind,
    /// Review-request URL the event is about.
    pub pr_url: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(kind: EventKind, pr_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            pr_url: pr_url.into(),
            created_at: Utc::now(),
        }
    }
}

/// Icon shown next to a desktop alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertIcon {
    Slack,
    Github,
    Approved,
}

impl AlertIcon {
    pub fn file_name(&self) -> &'static str {
        match self {
            AlertIcon::Slack => "slack-logo.png",
            AlertIcon::Github => "github-logo.png",
            AlertIcon::Approved => "approved.png",
        }
    }
}

/// Rendered desktop alert ready for the OS notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopAlert {
    pub title: String,
    pub body: String,
    pub icon: AlertIcon,
    pub sound: bool,
    /// URL opened when the user clicks the alert.
    pub click_url: Option<String>,
}
