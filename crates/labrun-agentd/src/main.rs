mod config;
mod identity;
mod jobs;
mod notify;
mod sessions;
mod sync;
mod util;

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::error;

use labrun_observe::{LoggerConfig, LoggerFormat, logger_init};
use labrun_queue::{QueueClient, QueueConfig};

use crate::config::AgentConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("agent invocation failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let level = std::env::var("LABRUN_LOG").unwrap_or_else(|_| "info".to_string());
    let format = std::env::var("LABRUN_LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse::<LoggerFormat>().ok())
        .unwrap_or(LoggerFormat::Text);

    let cfg = LoggerConfig {
        format,
        level,
        ..LoggerConfig::default()
    };
    if let Err(err) = logger_init(&cfg) {
        eprintln!("failed to initialize logging: {err}");
    }
}

async fn run() -> Result<()> {
    let config = AgentConfig::from_env().context("failed to load configuration")?;
    let queue = QueueClient::new(QueueConfig {
        base_url: config.queue_url.clone(),
        service_key: config.queue_service_key.clone(),
    })
    .context("failed to construct the queue client")?;
    let user_id = identity::resolve_user_id(&queue, &config)
        .await
        .context("failed to resolve the user id")?;
    let notifier = notify::notifier_for(config.notify_url.as_deref());

    // independent stages: a failure in one never blocks the others
    if let Err(err) = sync::sync_inventory(&queue, &config, &user_id).await {
        error!("script sync failed: {err:#}");
    }
    if let Err(err) = jobs::process_next_job(&queue, &config, notifier.as_ref(), &user_id).await {
        error!("job processing failed: {err:#}");
    }
    if let Err(err) = sessions::process_next_session(&queue, &config, &user_id).await {
        error!("session processing failed: {err:#}");
    }

    Ok(())
}
