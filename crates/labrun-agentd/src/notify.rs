use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use labrun_model::{Job, JobStatus};

/// Completion message sent once a job reaches a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct JobNotification {
    /// Host that executed the job.
    pub host: String,
    pub job_id: String,
    pub script_path: Option<String>,
    pub args: Option<Value>,
    pub status: &'static str,
    pub retcode: Option<i64>,
    pub stdout_path: String,
    pub stderr_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobNotification {
    pub fn new(
        job: &Job,
        status: JobStatus,
        retcode: Option<i64>,
        stdout_path: &Path,
        stderr_path: &Path,
        error: Option<String>,
    ) -> Self {
        Self {
            host: hostname::get()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            job_id: job.key().map(|id| id.to_string()).unwrap_or_default(),
            script_path: job.script_path.clone(),
            args: job.args.clone(),
            status: status.as_str(),
            retcode,
            stdout_path: stdout_path.display().to_string(),
            stderr_path: stderr_path.display().to_string(),
            error,
        }
    }
}

/// Outbound completion notifications.
///
/// Delivery is best-effort: failures are logged and never propagate into the
/// job state machine.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, note: &JobNotification);
}

/// POSTs the completion summary as JSON to a configured webhook.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notify for WebhookNotifier {
    async fn notify(&self, note: &JobNotification) {
        match self.http.post(&self.url).json(note).send().await {
            Ok(response) if response.status().is_success() => {
                info!(job_id = %note.job_id, status = note.status, "notification delivered");
            }
            Ok(response) => {
                error!(
                    job_id = %note.job_id,
                    status = %response.status(),
                    "notification endpoint rejected the message"
                );
            }
            Err(err) => {
                error!(job_id = %note.job_id, %err, "failed to deliver notification");
            }
        }
    }
}

/// Stand-in when no webhook is configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notify for DisabledNotifier {
    async fn notify(&self, note: &JobNotification) {
        info!(
            job_id = %note.job_id,
            status = note.status,
            "notify url not set, skipping notification"
        );
    }
}

pub fn notifier_for(notify_url: Option<&str>) -> Box<dyn Notify> {
    match notify_url {
        Some(url) => Box::new(WebhookNotifier::new(url.to_string())),
        None => Box::new(DisabledNotifier),
    }
}
