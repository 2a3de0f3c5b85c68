use serde::{Deserialize, Serialize};

use crate::{RecordId, SessionStatus};

/// A request for a long-running interactive notebook server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<RecordId>,

    pub status: SessionStatus,

    /// Assigned when the session reaches `running`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,

    /// Populated only on `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Session {
    /// Identifier of this record, preferring the `session_id` column when present.
    pub fn key(&self) -> Option<&RecordId> {
        self.session_id.as_ref().or(self.id.as_ref())
    }

    /// Key columns to try on write-back, in preference order.
    pub fn key_candidates(&self) -> [&'static str; 2] {
        if self.session_id.is_some() {
            ["session_id", "id"]
        } else {
            ["id", "session_id"]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_prefers_session_id_column() {
        let session: Session = serde_json::from_value(json!({
            "session_id": "s-3",
            "id": 12,
            "status": "pending"
        }))
        .unwrap();

        assert_eq!(session.key(), Some(&RecordId::from("s-3")));
        assert_eq!(session.key_candidates(), ["session_id", "id"]);
    }

    #[test]
    fn pending_row_has_no_assignments() {
        let session: Session = serde_json::from_value(json!({
            "id": 12,
            "status": "pending"
        }))
        .unwrap();

        assert_eq!(session.status, SessionStatus::Pending);
        assert!(session.port.is_none());
        assert!(session.token.is_none());
        assert!(session.pid.is_none());
        assert!(session.error_message.is_none());
    }
}
