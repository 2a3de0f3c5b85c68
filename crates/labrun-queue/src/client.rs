use reqwest::Response;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use labrun_model::RecordId;

use crate::{Direction, QueueConfig, QueueError, query};

/// Record-oriented client for the queue store's REST interface.
///
/// The store speaks PostgREST semantics: equality filters as
/// `column=eq.value` query parameters, `order`/`limit` for selection, JSON
/// bodies for inserts and updates.
pub struct QueueClient {
    http: reqwest::Client,
    base_url: String,
}

impl QueueClient {
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        let mut headers = HeaderMap::new();
        let mut api_key =
            HeaderValue::from_str(&config.service_key).map_err(|_| QueueError::InvalidServiceKey)?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .map_err(|_| QueueError::InvalidServiceKey)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    /// Filtered select over one table.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        order: Option<(&str, Direction)>,
        limit: Option<usize>,
    ) -> Result<Vec<T>, QueueError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filters.iter().map(|(column, value)| query::eq(column, value)));
        if let Some((column, direction)) = order {
            params.push(query::order(column, direction));
        }
        if let Some(n) = limit {
            params.push(("limit".to_string(), n.to_string()));
        }

        let response = self
            .http
            .get(query::table_url(&self.base_url, table))
            .query(&params)
            .send()
            .await?;
        let body = check(response).await?;

        serde_json::from_str(&body).map_err(|source| QueueError::Decode { source, body })
    }

    /// Insert a batch of rows.
    pub async fn insert<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<(), QueueError> {
        let response = self
            .http
            .post(query::table_url(&self.base_url, table))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Delete every row matching the equality filters.
    pub async fn delete(&self, table: &str, filters: &[(&str, String)]) -> Result<(), QueueError> {
        let params: Vec<(String, String)> = filters
            .iter()
            .map(|(column, value)| query::eq(column, value))
            .collect();

        let response = self
            .http
            .delete(query::table_url(&self.base_url, table))
            .query(&params)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Update the row whose `key_column` equals `id`.
    pub async fn update(
        &self,
        table: &str,
        key_column: &str,
        id: &RecordId,
        payload: &Value,
    ) -> Result<(), QueueError> {
        let params = vec![query::eq(key_column, &id.to_string())];

        let response = self
            .http
            .patch(query::table_url(&self.base_url, table))
            .header("Prefer", "return=minimal")
            .query(&params)
            .json(payload)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Update trying each candidate key column in order until one succeeds.
    ///
    /// Schemas name their primary key differently (`job_id` vs `id`); an
    /// update against the wrong column is rejected by the store and the next
    /// candidate is tried. The last rejection propagates when every candidate
    /// fails, so an update is never silently dropped.
    pub async fn update_any(
        &self,
        table: &str,
        key_candidates: &[&str],
        id: &RecordId,
        payload: &Value,
    ) -> Result<(), QueueError> {
        let mut last_error = None;
        for &key_column in key_candidates {
            match self.update(table, key_column, id, payload).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(table, key_column, %err, "update candidate failed; trying next");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or(QueueError::NoKeyCandidates))
    }
}

async fn check(response: Response) -> Result<String, QueueError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(QueueError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
