//! OS notification sink backed by the platform's notification command.
//!
//! - Linux/BSD: `notify-send`. With a click URL the command is run with
//!   `--wait --action=open=Open`; when it prints `open` the URL is opened.
//! - macOS: `osascript -e 'display notification ...'` (no click support).
//!
//! `notify` returns once the command is spawned; the child is awaited on a
//! background task for at most `CLICK_WAIT`, then killed.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use nudge_common::error::{AppError, Result};
use nudge_common::traits::NotificationSink;
use nudge_common::types::DesktopAlert;

const OPEN_ACTION: &str = "open";

/// How long an alert stays clickable before its command is killed.
pub const CLICK_WAIT: Duration = Duration::from_secs(300);

pub struct DesktopSink {
    icon_dir: Option<PathBuf>,
}

impl DesktopSink {
    pub fn new(icon_dir: Option<PathBuf>) -> Self {
        Self { icon_dir }
    }

    fn icon_path(&self, alert: &DesktopAlert) -> Option<PathBuf> {
        self.icon_dir
            .as_ref()
            .map(|dir| dir.join(alert.icon.file_name()))
            .filter(|path| path.exists())
    }
}

/// Arguments for `notify-send`.
pub fn notify_send_args(alert: &DesktopAlert, icon: Option<&Path>) -> Vec<String> {
    let mut args = vec!["--app-name=nudge".to_string()];
    if let Some(icon) = icon {
        args.push(format!("--icon={}", icon.display()));
    }
    if alert.sound {
        args.push("--hint=string:sound-name:message-new-instant".to_string());
    }
    if alert.click_url.is_some() {
        args.push("--wait".to_string());
        args.push(format!("--action={OPEN_ACTION}=Open"));
    }
    args.push(alert.title.clone());
    args.push(alert.body.clone());
    args
}

/// Arguments for `osascript`.
pub fn osascript_args(alert: &DesktopAlert) -> Vec<String> {
    let mut script = format!(
        "display notification \"{}\" with title \"{}\"",
        escape_applescript(&alert.body),
        escape_applescript(&alert.title)
    );
    if alert.sound {
        script.push_str(" sound name \"default\"");
    }
    vec!["-e".to_string(), script]
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Wait up to `limit` for the notification command and return the action
/// it printed, if any.
pub async fn wait_for_action<F>(output: F, limit: Duration) -> Option<String>
where
    F: Future<Output = io::Result<Output>>,
{
    match tokio::time::timeout(limit, output).await {
        Ok(Ok(output)) => Some(String::from_utf8_lossy(&output.stdout).trim().to_string()),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Notification command did not finish cleanly");
            None
        }
        Err(_) => {
            tracing::debug!(limit_secs = limit.as_secs(), "Alert not clicked in time");
            None
        }
    }
}

#[async_trait]
impl NotificationSink for DesktopSink {
    async fn notify(&self, alert: &DesktopAlert) -> Result<()> {
        let (program, args) = if cfg!(target_os = "macos") {
            ("osascript", osascript_args(alert))
        } else {
            let icon = self.icon_path(alert);
            ("notify-send", notify_send_args(alert, icon.as_deref()))
        };

        let child = Command::new(program)
            .args(&args)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Sink(format!("failed to spawn {program}: {e}")))?;

        let click_url = alert.click_url.clone().filter(|_| program == "notify-send");
        tokio::spawn(async move {
            let action = wait_for_action(child.wait_with_output(), CLICK_WAIT).await;

            let Some(url) = click_url else { return };
            if action.as_deref() == Some(OPEN_ACTION) {
                tracing::info!(url = %url, "Alert clicked, opening pull request");
                if let Err(e) = open::that_detached(&url) {
                    tracing::warn!(url = %url, error = %e, "Failed to open URL");
                }
            }
        });

        Ok(())
    }
}
