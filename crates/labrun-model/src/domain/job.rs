use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{JobStatus, RecordId};

/// A unit of requested work, as stored in the queue's `jobs` table.
///
/// Schemas in the wild expose the primary key as either `job_id` or `id`;
/// both columns are modeled and [`Job::key`] picks whichever one the fetched
/// row actually carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<RecordId>,

    /// Foreign identifier into the script inventory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<RecordId>,
    /// Inline path fallback, relative to the home root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
    /// Free-form argument payload; see [`crate::JobArgs`] for the accepted shapes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,

    pub status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retcode: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_tail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_tail: Option<String>,
}

impl Job {
    /// Identifier of this record, preferring the `job_id` column when present.
    pub fn key(&self) -> Option<&RecordId> {
        self.job_id.as_ref().or(self.id.as_ref())
    }

    /// Key columns to try on write-back, in preference order.
    ///
    /// The column the fetched row carries comes first; the alternate is the
    /// fallback for stores whose update path names the key differently.
    pub fn key_candidates(&self) -> [&'static str; 2] {
        if self.job_id.is_some() {
            ["job_id", "id"]
        } else {
            ["id", "job_id"]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_prefers_job_id_column() {
        let job: Job = serde_json::from_value(json!({
            "job_id": 7,
            "id": "row-1",
            "status": "pending"
        }))
        .unwrap();

        assert_eq!(job.key(), Some(&RecordId::from(7)));
        assert_eq!(job.key_candidates(), ["job_id", "id"]);
    }

    #[test]
    fn key_falls_back_to_id_column() {
        let job: Job = serde_json::from_value(json!({
            "id": "row-1",
            "status": "pending"
        }))
        .unwrap();

        assert_eq!(job.key(), Some(&RecordId::from("row-1")));
        assert_eq!(job.key_candidates(), ["id", "job_id"]);
    }

    #[test]
    fn key_absent_when_row_has_no_identifier() {
        let job: Job = serde_json::from_value(json!({ "status": "pending" })).unwrap();
        assert!(job.key().is_none());
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let job: Job = serde_json::from_value(json!({
            "id": 1,
            "status": "pending",
            "user_id": "u-9",
            "priority": 3
        }))
        .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
    }
}
