use serde::{Deserialize, Serialize};

/// Current execution state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is enqueued and waiting to be picked up.
    Pending,
    /// Job is currently executing.
    Running,
    /// Job completed with exit code zero.
    Done,
    /// Job was rejected, failed to start, or exited non-zero.
    Error,
}

impl JobStatus {
    /// Returns `true` if the job is in a terminal state (won't transition further).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Returns `true` if the job is still active (pending or running).
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Wire representation, as stored in the queue's `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());

        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn active_states() {
        assert!(JobStatus::Pending.is_active());
        assert!(JobStatus::Running.is_active());

        assert!(!JobStatus::Done.is_active());
        assert!(!JobStatus::Error.is_active());
    }

    #[test]
    fn serde_roundtrip() {
        let status = JobStatus::Running;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#""running""#);

        let back: JobStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }

    #[test]
    fn as_str_matches_wire_form() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Done,
            JobStatus::Error,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!(r#""{}""#, status.as_str()));
        }
    }
}
