use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use labrun_model::{RecordId, SCRIPTS_TABLE, Script};
use labrun_queue::QueueClient;

use crate::config::{ALLOWED_SUFFIXES, AgentConfig};
use crate::util::now_utc_rfc3339;

/// Replace this identity's script inventory with a fresh enumeration of the
/// home root, unless the previous sync is recent enough.
pub async fn sync_inventory(
    queue: &QueueClient,
    config: &AgentConfig,
    user_id: &str,
) -> Result<()> {
    if !should_sync(config) {
        info!(
            interval_min = config.sync_interval_min,
            "skipping script sync, last sync is recent"
        );
        return Ok(());
    }

    let scripts = discover_scripts(config, user_id)?;
    info!(count = scripts.len(), user_id, "syncing scripts");

    queue
        .delete(SCRIPTS_TABLE, &[("user_id", user_id.to_string())])
        .await
        .context("failed to clear the script inventory")?;
    if !scripts.is_empty() {
        queue
            .insert(SCRIPTS_TABLE, &scripts)
            .await
            .context("failed to insert the script inventory")?;
    }

    record_sync_time(config);
    Ok(())
}

fn should_sync(config: &AgentConfig) -> bool {
    if config.sync_interval_min <= 0 {
        return true;
    }
    let Ok(text) = fs::read_to_string(config.sync_cursor_path()) else {
        return true;
    };
    let Ok(last) = OffsetDateTime::parse(text.trim(), &Rfc3339) else {
        return true;
    };
    OffsetDateTime::now_utc() - last >= Duration::minutes(config.sync_interval_min)
}

// best-effort: a failed cursor write only means the next invocation syncs
// again
fn record_sync_time(config: &AgentConfig) {
    let path = config.sync_cursor_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(err) = fs::write(&path, now_utc_rfc3339()) {
        warn!(%err, "failed to record the sync time");
    }
}

/// Enumerate runnable scripts under the home root: skip-dir subtrees
/// excluded, paths stored relative with forward slashes, sorted for a stable
/// inventory.
fn discover_scripts(config: &AgentConfig, user_id: &str) -> Result<Vec<Script>> {
    let sandbox = config.sandbox();
    let updated_at = now_utc_rfc3339();
    let mut scripts = Vec::new();

    for suffix in ALLOWED_SUFFIXES {
        let pattern = config.home_root.join(format!("**/*.{suffix}"));
        let pattern = pattern.to_string_lossy().into_owned();
        let entries =
            glob::glob(&pattern).with_context(|| format!("invalid inventory pattern {pattern}"))?;

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    warn!(%err, "unreadable entry during inventory walk");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&config.home_root) else {
                continue;
            };
            if sandbox.is_skipped(relative) {
                continue;
            }
            scripts.push(Script {
                id: None,
                script_id: None,
                path: to_posix(relative),
                script_type: Some(suffix.to_string()),
                user_id: Some(RecordId::from(user_id)),
                updated_at: Some(updated_at.clone()),
            });
        }
    }

    scripts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(scripts)
}

fn to_posix(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
