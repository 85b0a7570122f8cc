use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use nudge_common::config::AppConfig;
use nudge_engine::{PrWatcher, ReminderScheduler};
use nudge_notifier::{DesktopDispatcher, DesktopSink, notification_queue};
use nudge_sources::{GithubClient, SlackClient};

/// Exit status for invalid configuration.
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Validate before anything else starts.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.diagnostic());
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    init_tracing(config.log_json);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "nudge exited with error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("nudge=info,nudge_engine=info,nudge_notifier=info,nudge_sources=info")
    });

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(pr = %config.pr, users = %config.users.join(", "), "nudge starting...");
    if config.force {
        tracing::info!("force=true: pull request host check skipped");
    }

    let slack = Arc::new(SlackClient::new(&config.slack_api_url, &config.slack_token));
    let github = Arc::new(GithubClient::new(
        &config.github_api_url,
        config.github_token.clone(),
    ));

    let cancel = CancellationToken::new();
    let (queue, consumer) = notification_queue();

    let consumer_task = {
        let dispatcher = DesktopDispatcher::new(DesktopSink::new(config.icon_dir.clone()));
        let tick = Duration::from_millis(config.queue_tick_ms);
        let cancel = cancel.clone();
        tokio::spawn(async move { consumer.run(&dispatcher, tick, cancel).await })
    };

    let watcher_task = {
        let mut watcher = PrWatcher::new(github, config.pr.clone(), queue.clone())
            .with_interval(Duration::from_secs(config.watch_interval_secs));
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.run(cancel).await })
    };

    let mut scheduler = ReminderScheduler::new(slack, queue, config.pr.url.clone())
        .with_interval(Duration::from_secs(config.reminder_interval_secs))
        .with_max_sends(config.reminder_max_sends);
    // Without a directory there is nobody to remind; review alerts still run.
    if let Err(e) = scheduler.start(&config.users).await {
        tracing::error!(error = %e, "Failed to load Slack directory, no reminders will be sent");
    }

    let scheduler_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    // Watcher and consumer have no natural end; stop everything on Ctrl+C.
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal, stopping gracefully...");
    cancel.cancel();

    let (scheduler_result, watcher_result, consumer_result) =
        tokio::join!(scheduler_task, watcher_task, consumer_task);
    scheduler_result?;
    watcher_result?;
    consumer_result?;

    tracing::info!("nudge stopped.");
    Ok(())
}
