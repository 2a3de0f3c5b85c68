use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque primary-key value, exactly as the queue store returns it.
///
/// Stores expose integer or string keys depending on schema. The agent never
/// interprets the value; it only echoes it back in equality filters and uses
/// it to name per-record log directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Value);

impl RecordId {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl From<Value> for RecordId {
    fn from(value: Value) -> Self {
        RecordId(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(Value::String(value.to_string()))
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId(Value::from(value))
    }
}
