use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use labrun_model::{RecordId, USERS_TABLE};
use labrun_queue::QueueClient;

use crate::config::AgentConfig;

#[derive(Debug, Deserialize)]
struct UserRow {
    #[serde(default)]
    user_id: Option<RecordId>,
}

/// Queue identity for this host account.
///
/// Prefers the configured override; otherwise looks the account up in the
/// store's `users` table by its `linux_user` column.
pub async fn resolve_user_id(queue: &QueueClient, config: &AgentConfig) -> Result<String> {
    if let Some(id) = &config.user_id {
        return Ok(id.clone());
    }

    let rows: Vec<UserRow> = queue
        .select(
            USERS_TABLE,
            &[("linux_user", config.linux_user.clone())],
            None,
            Some(1),
        )
        .await?;

    let row = rows
        .into_iter()
        .next()
        .with_context(|| format!("no users row matches linux_user={}", config.linux_user))?;
    let user_id = row.user_id.context("users.user_id is empty")?;

    debug!(%user_id, "resolved user id from the users table");
    Ok(user_id.to_string())
}
