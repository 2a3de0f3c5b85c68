use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use rand::RngCore;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use labrun_exec::{ExecError, ProcSpec, spawn_detached};
use labrun_model::{RecordId, SESSIONS_TABLE, Session, SessionStatus};
use labrun_queue::{Direction, QueueClient};

use crate::config::AgentConfig;
use crate::util::now_utc_rfc3339;

/// Fetch and start the most recently requested pending session, if any.
pub async fn process_next_session(
    queue: &QueueClient,
    config: &AgentConfig,
    user_id: &str,
) -> Result<()> {
    let Some(session) = fetch_pending_session(queue, user_id).await? else {
        return Ok(());
    };
    let Some(session_key) = session.key().cloned() else {
        warn!("pending session row carries no identifier, skipping");
        return Ok(());
    };
    let candidates = session.key_candidates();

    let port = notebook_port(config.jupyter_base_port, current_uid());
    let token = generate_token();
    let log_file = config.session_log_file(&session_key);

    update_session(
        queue,
        &candidates,
        &session_key,
        json!({
            "status": SessionStatus::Starting.as_str(),
            "updated_at": now_utc_rfc3339(),
        }),
    )
    .await?;

    // launch success means the spawn call succeeded; server readiness is an
    // external concern
    match launch_notebook_server(config, &log_file, port, &token) {
        Ok(pid) => {
            update_session(
                queue,
                &candidates,
                &session_key,
                json!({
                    "status": SessionStatus::Running.as_str(),
                    "port": port,
                    "token": token,
                    "pid": pid,
                    "updated_at": now_utc_rfc3339(),
                }),
            )
            .await?;
            info!(session = %session_key, port, pid, "notebook session running");
        }
        Err(err) => {
            error!(session = %session_key, %err, "failed to start the notebook server");
            update_session(
                queue,
                &candidates,
                &session_key,
                json!({
                    "status": SessionStatus::Error.as_str(),
                    "error_message": err.to_string(),
                    "updated_at": now_utc_rfc3339(),
                }),
            )
            .await?;
        }
    }
    Ok(())
}

async fn fetch_pending_session(queue: &QueueClient, user_id: &str) -> Result<Option<Session>> {
    let sessions: Vec<Session> = queue
        .select(
            SESSIONS_TABLE,
            &[
                ("user_id", user_id.to_string()),
                ("status", SessionStatus::Pending.as_str().to_string()),
            ],
            Some(("created_at", Direction::Desc)),
            Some(1),
        )
        .await
        .context("failed to fetch the next pending session")?;
    Ok(sessions.into_iter().next())
}

async fn update_session(
    queue: &QueueClient,
    candidates: &[&str],
    session_key: &RecordId,
    payload: Value,
) -> Result<()> {
    queue
        .update_any(SESSIONS_TABLE, candidates, session_key, &payload)
        .await
        .with_context(|| format!("failed to persist the transition of session {session_key}"))
}

/// Stable per-account port: base plus the numeric uid modulo 100, so
/// accounts sharing a host land on distinct ports.
fn notebook_port(base_port: u16, uid: u32) -> u16 {
    base_port + (uid % 100) as u16
}

#[cfg(unix)]
fn current_uid() -> u32 {
    unsafe { libc::getuid() }
}

#[cfg(not(unix))]
fn current_uid() -> u32 {
    0
}

/// 128-bit random access credential, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn launch_notebook_server(
    config: &AgentConfig,
    log_file: &Path,
    port: u16,
    token: &str,
) -> Result<u32, ExecError> {
    let spec = notebook_server_command(config, port, token);

    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)?;
    }
    // the server runs indefinitely; keep whatever earlier attempts logged
    let log = OpenOptions::new().create(true).append(true).open(log_file)?;

    spawn_detached(&spec, log)
}

fn notebook_server_command(config: &AgentConfig, port: u16, token: &str) -> ProcSpec {
    let app = if config.jupyter_legacy {
        "NotebookApp"
    } else {
        "ServerApp"
    };
    ProcSpec {
        program: "jupyter".to_string(),
        args: vec![
            "lab".to_string(),
            "--no-browser".to_string(),
            format!("--port={port}"),
            format!("--ip={}", config.jupyter_ip),
            format!("--{app}.token={token}"),
            format!("--{app}.password=''"),
        ],
        cwd: Some(config.home_root.clone()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use std::collections::HashMap;

    fn test_config(legacy: bool) -> AgentConfig {
        let legacy_flag = if legacy { "1" } else { "0" };
        let vars = HashMap::from([
            ("LABRUN_USER", "alice".to_string()),
            ("LABRUN_QUEUE_URL", "https://store.example.com".to_string()),
            ("LABRUN_QUEUE_SERVICE_KEY", "svc-key".to_string()),
            ("LABRUN_HOME", "/home/alice".to_string()),
            ("JUPYTER_LEGACY", legacy_flag.to_string()),
        ]);
        AgentConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn port_is_deterministic_per_uid() {
        assert_eq!(notebook_port(8800, 1234), 8834);
        assert_eq!(notebook_port(8800, 1234), notebook_port(8800, 1234));
        assert_eq!(notebook_port(8800, 1000), 8800);
    }

    #[test]
    fn distinct_uids_within_the_modulus_never_collide() {
        assert_ne!(notebook_port(8800, 1050), notebook_port(8800, 1073));
        assert_ne!(notebook_port(8800, 7), notebook_port(8800, 99));
    }

    #[test]
    fn token_is_32_hex_chars_and_fresh() {
        let first = generate_token();
        let second = generate_token();

        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn server_command_targets_the_allocated_port() {
        let spec = notebook_server_command(&test_config(false), 8834, "tok123");

        assert_eq!(spec.program, "jupyter");
        assert_eq!(
            spec.args,
            [
                "lab",
                "--no-browser",
                "--port=8834",
                "--ip=0.0.0.0",
                "--ServerApp.token=tok123",
                "--ServerApp.password=''",
            ]
        );
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/home/alice")));
    }

    #[test]
    fn legacy_mode_switches_the_option_prefix() {
        let spec = notebook_server_command(&test_config(true), 8834, "tok123");

        assert!(spec.args.iter().any(|arg| arg == "--NotebookApp.token=tok123"));
        assert!(!spec.args.iter().any(|arg| arg.starts_with("--ServerApp.")));
    }
}
