use std::path::PathBuf;

use url::Url;

use crate::error::{ConfigError, ConfigErrorKind};
use crate::types::PullRequestRef;

// Alias keys match case-insensitively when read from the environment.
const USER_KEYS: &[&str] = &["user", "name", "username"];
const PR_KEYS: &[&str] = &["pr", "link"];
const FORCE_KEYS: &[&str] = &["force"];

/// Set by the login shell, so never taken as a recipient list.
const SHELL_USER_KEY: &str = "USER";
const SLACK_TOKEN_KEYS: &[&str] = &["SLACK_API_TOKEN", "SLACK_TOKEN"];

const SUPPORTED_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Configured recipient names, in the order given.
    pub users: Vec<String>,

    /// Pull request being reviewed.
    pub pr: PullRequestRef,

    /// Accept pull request URLs on hosts other than github.com.
    pub force: bool,

    /// Slack Web API bearer token
    pub slack_token: String,

    /// Slack Web API base URL (default: https://slack.com/api)
    pub slack_api_url: String,

    /// GitHub token, needed for private repositories
    pub github_token: Option<String>,

    /// GitHub REST API base URL (default: https://api.github.com)
    pub github_api_url: String,

    /// Seconds between reminders to one recipient (default: 3600)
    pub reminder_interval_secs: u64,

    /// Reminders per recipient, including the first one (default: 5)
    pub reminder_max_sends: u32,

    /// Seconds between pull request polls (default: 60)
    pub watch_interval_secs: u64,

    /// Milliseconds between notification queue ticks (default: 3000)
    pub queue_tick_ms: u64,

    /// Directory holding the alert icons
    pub icon_dir: Option<PathBuf>,

    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
}

impl AppConfig {
    /// Load configuration from `.env` and environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }))
    }

    /// Build the configuration from key/value pairs. Exact keys win; the
    /// `user`, `pr` and `force` aliases also match in any letter case.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .filter(|(key, _)| key != SHELL_USER_KEY)
            .collect();
        let is_alias = |key: &str| {
            [USER_KEYS, PR_KEYS, FORCE_KEYS]
                .iter()
                .any(|keys| keys.contains(&key))
        };

        Self::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .or_else(|| {
                    is_alias(key)
                        .then(|| vars.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)))
                        .flatten()
                })
                .map(|(_, value)| value.clone())
        })
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|&key| lookup(key))
                .find(|value| !value.trim().is_empty())
        };

        let (raw_users, raw_pr) = match (first(USER_KEYS), first(PR_KEYS)) {
            (Some(users), Some(pr)) => (users, pr),
            _ => {
                return Err(ConfigError::new(
                    ConfigErrorKind::MissingValue,
                    "\"user\" or \"pr\" environment variables not defined.",
                ));
            }
        };

        let users = split_users(&raw_users);
        if users.is_empty() {
            return Err(ConfigError::new(
                ConfigErrorKind::MissingValue,
                "\"user\" does not contain any names.",
            ));
        }

        let force = first(FORCE_KEYS).is_some_and(|v| parse_flag(&v));
        let pr = parse_pr_url(&raw_pr, force)?;

        let slack_token = first(SLACK_TOKEN_KEYS).ok_or_else(|| {
            ConfigError::new(
                ConfigErrorKind::MissingValue,
                "SLACK_API_TOKEN environment variable is required.",
            )
            .with_solution("Export a Slack token with users:read and chat:write scopes as SLACK_API_TOKEN.")
        })?;

        let reminder_interval_secs = parse_positive(&lookup, "REMINDER_INTERVAL_SECS", 3600)?;
        let watch_interval_secs = parse_positive(&lookup, "WATCH_INTERVAL_SECS", 60)?;
        if watch_interval_secs >= reminder_interval_secs {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidNumber,
                format!(
                    "WATCH_INTERVAL_SECS ({watch_interval_secs}) must be shorter than REMINDER_INTERVAL_SECS ({reminder_interval_secs})."
                ),
            )
            .with_solution("Lower WATCH_INTERVAL_SECS or raise REMINDER_INTERVAL_SECS."));
        }

        let reminder_max_sends = parse_positive(&lookup, "REMINDER_MAX_SENDS", 5)?;
        let reminder_max_sends = u32::try_from(reminder_max_sends).map_err(|_| {
            ConfigError::new(
                ConfigErrorKind::InvalidNumber,
                "REMINDER_MAX_SENDS must fit in a u32.",
            )
        })?;

        Ok(Self {
            users,
            pr,
            force,
            slack_token,
            slack_api_url: lookup("SLACK_API_URL")
                .unwrap_or_else(|| "https://slack.com/api".to_string()),
            github_token: lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty()),
            github_api_url: lookup("GITHUB_API_URL")
                .unwrap_or_else(|| "https://api.github.com".to_string()),
            reminder_interval_secs,
            reminder_max_sends,
            watch_interval_secs,
            queue_tick_ms: parse_positive(&lookup, "QUEUE_TICK_MS", 3000)?,
            icon_dir: lookup("NUDGE_ICON_DIR").map(PathBuf::from),
            log_json: lookup("NUDGE_LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }
}

/// Split a comma-separated name list, dropping blanks.
pub fn split_users(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_positive<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::new(
            ConfigErrorKind::InvalidNumber,
            format!("{key} must be a positive integer, got {raw:?}."),
        )
        .with_solution(format!("Unset {key} to use the default of {default}."))),
    }
}

/// Validate a pull request URL and extract owner, repo and number.
///
/// With `force`, any host is accepted (e.g. GitHub Enterprise); the
/// `/{owner}/{repo}/pull/{number}` path is always required.
pub fn parse_pr_url(raw: &str, force: bool) -> Result<PullRequestRef, ConfigError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::new(
            ConfigErrorKind::InvalidUrl,
            format!("\"{raw}\" is not a valid URL ({e})."),
        )
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::new(
            ConfigErrorKind::InvalidUrl,
            format!("\"{raw}\" must use http or https."),
        ));
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if !force && !SUPPORTED_HOSTS.contains(&host.as_str()) {
        return Err(ConfigError::new(
            ConfigErrorKind::UnsupportedHost,
            format!("\"{host}\" is not a supported pull request host."),
        )
        .with_solution("Use a github.com pull request URL, or set force=true for GitHub Enterprise."));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if segments.get(2) != Some(&"pull") {
        let kind = if segments.contains(&"pull") {
            ConfigErrorKind::InvalidUrl
        } else {
            ConfigErrorKind::MissingPullSegment
        };
        return Err(ConfigError::new(
            kind,
            format!("\"{raw}\" is not of the form /{{owner}}/{{repo}}/pull/{{number}}."),
        ));
    }

    let number = segments
        .get(3)
        .and_then(|seg| seg.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            ConfigError::new(
                ConfigErrorKind::InvalidPullNumber,
                format!("\"{raw}\" does not end in a pull request number."),
            )
        })?;

    Ok(PullRequestRef {
        url: raw.to_string(),
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        number,
    })
}
