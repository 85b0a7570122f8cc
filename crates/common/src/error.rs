use thiserror::Error;

/// Kind of configuration problem detected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    MissingValue,
    InvalidUrl,
    UnsupportedHost,
    MissingPullSegment,
    InvalidPullNumber,
    InvalidNumber,
}

impl std::fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigErrorKind::MissingValue => write!(f, "missing configuration"),
            ConfigErrorKind::InvalidUrl => write!(f, "malformed pull request URL"),
            ConfigErrorKind::UnsupportedHost => write!(f, "unsupported pull request host"),
            ConfigErrorKind::MissingPullSegment => write!(f, "pull request URL has no /pull segment"),
            ConfigErrorKind::InvalidPullNumber => write!(f, "invalid pull request number"),
            ConfigErrorKind::InvalidNumber => write!(f, "invalid numeric setting"),
        }
    }
}

/// Fatal configuration error, reported before any scheduler starts.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {reason}")]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub reason: String,
    pub solution: String,
}

pub const USAGE_HINT: &str =
    "Try running the command like: `user=bob pr=https://github.com/myorg/myrepo/pull/12345 nudge`";

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            solution: USAGE_HINT.to_string(),
        }
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = solution.into();
        self
    }

    /// Human-readable diagnostic printed before the process exits.
    pub fn diagnostic(&self) -> String {
        format!(
            "ERROR: {}\nREASON: {}\nSOLUTION: {}",
            self.kind, self.reason, self.solution
        )
    }
}

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Chat platform error: {0}")]
    Chat(String),

    #[error("Review source error: {0}")]
    Review(String),

    #[error("Notification sink error: {0}")]
    Sink(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
