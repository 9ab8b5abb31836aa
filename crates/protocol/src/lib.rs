use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const CAPABILITIES_SCHEMA_VERSION: u32 = 1;
pub const COMMAND_API_VERSION: &str = "1";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NextAction {
    pub action: String,
    pub args: serde_json::Value,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub hint: Option<String>,
    #[serde(default)]
    pub next_actions: Vec<NextAction>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CapabilitiesServer {
    pub name: String,
    pub version: String,
}

/// Static description of what a server build can answer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Capabilities {
    pub schema_version: u32,
    pub command_api: String,
    pub server: CapabilitiesServer,
    pub reports: Vec<String>,
    pub version_reports: Vec<String>,
    pub actions: Vec<String>,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_defaults_next_actions() {
        let raw = r#"{"code":"internal","message":"boom","details":null,"hint":null}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.code, "internal");
        assert!(envelope.next_actions.is_empty());
    }
}
