//! Robot-mode (JSON) output.
//!
//! Every successful command prints one envelope:
//!
//! ```json
//! {"schemaVersion": "novelcache.v1", "generatedAt": "...", "command": "chapters", "data": {...}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Schema version of the JSON envelope.
pub const SCHEMA_VERSION: &str = "novelcache.v1";

/// Envelope wrapped around every JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
}

impl<T> RobotOutput<T> {
    #[must_use]
    pub fn new(command: &str, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            command: command.to_string(),
            data,
        }
    }
}

/// Serialize `data` inside the envelope.
///
/// # Errors
///
/// Returns error if `data` fails to serialize.
pub fn render_json<T: Serialize>(command: &str, data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(&RobotOutput::new(command, data))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Chapter;

    #[test]
    fn envelope_fields() {
        let chapters = vec![Chapter::new("C1", "u1")];
        let json = render_json("chapters", &chapters).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["schemaVersion"], SCHEMA_VERSION);
        assert_eq!(value["command"], "chapters");
        assert_eq!(value["data"][0]["url"], "u1");
        assert!(value["generatedAt"].is_string());
    }
}
