use serde::{Deserialize, Serialize};

use crate::RecordId;

/// Inventory entry describing a runnable file under the home root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<RecordId>,

    /// Path relative to the home root, forward-slash separated.
    pub path: String,
    /// Declared script type: the file extension without its leading dot.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
