use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use labrun_exec::{DEFAULT_TAIL_LINES, ProcSpec, read_tail, run_to_exit};
use labrun_model::{JOBS_TABLE, Job, JobArgs, JobStatus, RecordId, SCRIPTS_TABLE, Script};
use labrun_queue::{Direction, QueueClient};

use crate::config::AgentConfig;
use crate::notify::{JobNotification, Notify};
use crate::util::now_utc_rfc3339;

/// Fetch and run the single oldest pending job, if any.
pub async fn process_next_job(
    queue: &QueueClient,
    config: &AgentConfig,
    notifier: &dyn Notify,
    user_id: &str,
) -> Result<()> {
    let Some(job) = fetch_next_job(queue, user_id).await? else {
        info!(user = %config.linux_user, "no pending jobs");
        return Ok(());
    };
    run_job(queue, config, notifier, job, user_id).await
}

/// Oldest pending job for this identity.
///
/// The store does no row-level claiming, so two overlapping invocations can
/// both see the same pending row; double execution is a documented
/// limitation of the current queue schema. An atomic conditional update
/// (pending to running) before spawning would close the race.
async fn fetch_next_job(queue: &QueueClient, user_id: &str) -> Result<Option<Job>> {
    let jobs: Vec<Job> = queue
        .select(
            JOBS_TABLE,
            &[
                ("user_id", user_id.to_string()),
                ("status", JobStatus::Pending.as_str().to_string()),
            ],
            Some(("created_at", Direction::Asc)),
            Some(1),
        )
        .await
        .context("failed to fetch the next pending job")?;
    Ok(jobs.into_iter().next())
}

/// Script row referenced by a job, tolerating both key column names.
async fn fetch_script(queue: &QueueClient, script_id: &RecordId, user_id: &str) -> Option<Script> {
    for key_column in ["script_id", "id"] {
        let result: Result<Vec<Script>, _> = queue
            .select(
                SCRIPTS_TABLE,
                &[
                    (key_column, script_id.to_string()),
                    ("user_id", user_id.to_string()),
                ],
                None,
                Some(1),
            )
            .await;
        match result {
            Ok(rows) => {
                if let Some(row) = rows.into_iter().next() {
                    return Some(row);
                }
            }
            Err(err) => {
                warn!(key_column, %err, "script lookup failed, trying next key column");
            }
        }
    }
    None
}

async fn run_job(
    queue: &QueueClient,
    config: &AgentConfig,
    notifier: &dyn Notify,
    mut job: Job,
    user_id: &str,
) -> Result<()> {
    let Some(job_key) = job.key().cloned() else {
        warn!("pending job row carries no identifier, skipping");
        return Ok(());
    };
    let candidates = job.key_candidates();

    let log_dir = config.job_log_dir(&job_key);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log dir {}", log_dir.display()))?;
    let stdout_path = log_dir.join("stdout.log");
    let stderr_path = log_dir.join("stderr.log");

    let script_row = match &job.script_id {
        Some(script_id) => {
            let row = fetch_script(queue, script_id, user_id).await;
            if row.is_none() {
                error!(job = %job_key, script_id = %script_id, "job rejected: script not found");
                return reject_job(
                    queue,
                    notifier,
                    &job,
                    &job_key,
                    &candidates,
                    &stdout_path,
                    &stderr_path,
                    "script not found",
                )
                .await;
            }
            row
        }
        None => None,
    };

    let script_path = script_row
        .as_ref()
        .map(|script| script.path.clone())
        .filter(|path| !path.is_empty())
        .or_else(|| job.script_path.clone())
        .unwrap_or_default();
    if script_path.is_empty() {
        error!(job = %job_key, "job rejected: script path missing");
        return reject_job(
            queue,
            notifier,
            &job,
            &job_key,
            &candidates,
            &stdout_path,
            &stderr_path,
            "script_path missing",
        )
        .await;
    }
    let script_type = script_row
        .as_ref()
        .and_then(|script| script.script_type.clone())
        .filter(|declared| !declared.is_empty())
        .unwrap_or_else(|| suffix_of(&script_path));
    // the resolved path is what the notification reports
    job.script_path = Some(script_path.clone());

    let script_full = match config.sandbox().resolve(&script_path, &script_type) {
        Ok(path) => path,
        Err(err) => {
            error!(job = %job_key, %err, "job rejected by the sandbox");
            return reject_job(
                queue,
                notifier,
                &job,
                &job_key,
                &candidates,
                &stdout_path,
                &stderr_path,
                &err.to_string(),
            )
            .await;
        }
    };

    // committed from here on: a crash below leaves the job `running` for an
    // operator to clean up
    update_job(
        queue,
        &candidates,
        &job_key,
        json!({
            "status": JobStatus::Running.as_str(),
            "started_at": now_utc_rfc3339(),
        }),
    )
    .await?;

    let args = JobArgs::from_value(job.args.as_ref());
    let spec = build_command(&script_full, &args, &log_dir);

    let stdout_file = File::create(&stdout_path)
        .with_context(|| format!("failed to open {}", stdout_path.display()))?;
    let mut stderr_file = File::create(&stderr_path)
        .with_context(|| format!("failed to open {}", stderr_path.display()))?;
    if is_notebook(&script_full) && !args.is_empty() {
        let _ = writeln!(stderr_file, "Args are ignored for ipynb jobs.");
    }

    info!(job = %job_key, command = %spec.command_line(), "running job");

    let retcode = match run_to_exit(&spec, stdout_file, stderr_file).await {
        Ok(code) => {
            info!(job = %job_key, code = ?code, "job finished");
            code.map(i64::from)
        }
        Err(err) => {
            error!(job = %job_key, %err, "job failed to start");
            append_line(&stderr_path, &format!("Failed to start job: {err}"));
            None
        }
    };

    let status = if retcode == Some(0) {
        JobStatus::Done
    } else {
        JobStatus::Error
    };
    update_job(
        queue,
        &candidates,
        &job_key,
        json!({
            "status": status.as_str(),
            "finished_at": now_utc_rfc3339(),
            "retcode": retcode,
            "stdout_path": stdout_path.display().to_string(),
            "stderr_path": stderr_path.display().to_string(),
            "stdout_tail": read_tail(&stdout_path, DEFAULT_TAIL_LINES),
            "stderr_tail": read_tail(&stderr_path, DEFAULT_TAIL_LINES),
        }),
    )
    .await?;

    notifier
        .notify(&JobNotification::new(
            &job,
            status,
            retcode,
            &stdout_path,
            &stderr_path,
            None,
        ))
        .await;
    Ok(())
}

/// Terminal rejection before the runner was ever invoked.
#[allow(clippy::too_many_arguments)]
async fn reject_job(
    queue: &QueueClient,
    notifier: &dyn Notify,
    job: &Job,
    job_key: &RecordId,
    candidates: &[&str],
    stdout_path: &Path,
    stderr_path: &Path,
    reason: &str,
) -> Result<()> {
    if let Err(err) = fs::write(stderr_path, format!("{reason}\n")) {
        warn!(%err, "failed to write the rejection reason to the stderr log");
    }

    update_job(
        queue,
        candidates,
        job_key,
        json!({
            "status": JobStatus::Error.as_str(),
            "finished_at": now_utc_rfc3339(),
            "retcode": Value::Null,
            "stdout_path": stdout_path.display().to_string(),
            "stderr_path": stderr_path.display().to_string(),
            "stderr_tail": reason,
        }),
    )
    .await?;

    notifier
        .notify(&JobNotification::new(
            job,
            JobStatus::Error,
            None,
            stdout_path,
            stderr_path,
            Some(reason.to_string()),
        ))
        .await;
    Ok(())
}

async fn update_job(
    queue: &QueueClient,
    candidates: &[&str],
    job_key: &RecordId,
    payload: Value,
) -> Result<()> {
    queue
        .update_any(JOBS_TABLE, candidates, job_key, &payload)
        .await
        .with_context(|| format!("failed to persist the transition of job {job_key}"))
}

/// Interpreter invocation for scripts; conversion-tool invocation for
/// notebooks, which executes the notebook in place and materializes the
/// output alongside the logs. Notebook jobs never receive arguments.
fn build_command(script_full: &Path, args: &JobArgs, log_dir: &Path) -> ProcSpec {
    let mut spec = if is_notebook(script_full) {
        ProcSpec {
            program: "jupyter".to_string(),
            args: vec![
                "nbconvert".to_string(),
                "--to".to_string(),
                "notebook".to_string(),
                "--execute".to_string(),
                script_full.display().to_string(),
                "--output".to_string(),
                "output.ipynb".to_string(),
                "--output-dir".to_string(),
                log_dir.display().to_string(),
            ],
            ..Default::default()
        }
    } else {
        let mut argv = vec![script_full.display().to_string()];
        argv.extend(args.to_argv());
        ProcSpec {
            program: "python".to_string(),
            args: argv,
            ..Default::default()
        }
    };
    spec.cwd = script_full.parent().map(Path::to_path_buf);
    spec
}

fn is_notebook(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("ipynb")
}

fn suffix_of(script_path: &str) -> String {
    Path::new(script_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_string()
}

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{line}");
    }
}
