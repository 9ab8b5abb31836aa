use anyhow::Result;
use reports_assembler::ReportFilters;
use reports_protocol::{ErrorEnvelope, NextAction};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize, Serialize)]
pub struct CommandRequest {
    pub action: CommandAction,
    #[serde(default = "empty_payload")]
    pub payload: Value,
    #[serde(default)]
    pub options: Option<RequestOptions>,
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Report,
    Versions,
    Resync,
    Health,
    Capabilities,
}

impl CommandAction {
    pub const ALL: [CommandAction; 5] = [
        CommandAction::Report,
        CommandAction::Versions,
        CommandAction::Resync,
        CommandAction::Health,
        CommandAction::Capabilities,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CommandAction::Report => "report",
            CommandAction::Versions => "versions",
            CommandAction::Resync => "resync",
            CommandAction::Health => "health",
            CommandAction::Capabilities => "capabilities",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RequestOptions {
    /// Compute afresh and leave the report cache untouched.
    #[serde(default)]
    pub no_cache: bool,
}

/// `action = report`. Filters sit next to `kind` in the payload.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportPayload {
    pub kind: String,
    #[serde(flatten)]
    pub filters: ReportFilters,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VersionsPayload {
    pub view: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ResyncPayload {
    /// Tables to copy; the configured list when absent.
    #[serde(default)]
    pub tables: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<NextAction>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl CommandResponse {
    pub fn is_error(&self) -> bool {
        matches!(self.status, CommandStatus::Error)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Clone)]
pub struct Hint {
    #[serde(rename = "type")]
    pub kind: HintKind,
    pub text: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    Info,
    Cache,
    Action,
    Warn,
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub code: String,
    pub hint: Option<String>,
    pub hints: Vec<Hint>,
    pub next_actions: Vec<NextAction>,
}

#[derive(Debug, Serialize, Default, Clone)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
}

pub struct CommandOutcome {
    pub data: Value,
    pub hints: Vec<Hint>,
    pub meta: ResponseMeta,
    pub next_actions: Vec<NextAction>,
}

impl CommandOutcome {
    pub fn from_value<T: Serialize>(value: T) -> Result<Self> {
        Ok(Self {
            data: serde_json::to_value(value)?,
            hints: Vec::new(),
            meta: ResponseMeta::default(),
            next_actions: Vec::new(),
        })
    }
}

pub fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|err| anyhow::anyhow!("Invalid payload: {err}"))
}

const INVALID_REQUEST_MARKERS: &[&str] = &[
    "Invalid payload",
    "Invalid filter",
    "Unknown report kind",
];

const SOURCE_MARKERS: &[&str] = &[
    "Object store error",
    "SQLite error",
    "Failed to open",
    "No mirror configured",
];

pub fn classify_error(message: &str, action: Option<CommandAction>) -> ErrorClassification {
    let mut hints = Vec::new();
    let mut next_actions = Vec::new();
    let mut code = "internal".to_string();
    let mut hint = None;

    if INVALID_REQUEST_MARKERS.iter().any(|m| message.contains(m)) {
        code = "invalid_request".to_string();
        let text = "Check the payload against action=capabilities (report kinds and version views)."
            .to_string();
        hints.push(Hint {
            kind: HintKind::Action,
            text: text.clone(),
        });
        hint = Some(text);
        if action != Some(CommandAction::Capabilities) {
            next_actions.push(NextAction {
                action: CommandAction::Capabilities.as_str().to_string(),
                args: json!({}),
                reason: "List supported report kinds and version views.".to_string(),
            });
        }
    }

    if SOURCE_MARKERS.iter().any(|m| message.contains(m)) {
        code = "source_unavailable".to_string();
        if message.contains("No mirror configured") {
            let text = "Set [mirror] sqlite_path in the config, REPORTS_SQLITE_PATH, or pass --sqlite."
                .to_string();
            hints.push(Hint {
                kind: HintKind::Action,
                text: text.clone(),
            });
            hint = Some(text);
        } else {
            hints.push(Hint {
                kind: HintKind::Warn,
                text: "A data source could not be reached; action=health reports which one."
                    .to_string(),
            });
            if action != Some(CommandAction::Health) {
                next_actions.push(NextAction {
                    action: CommandAction::Health.as_str().to_string(),
                    args: json!({}),
                    reason: "Probe the primary source and the mirror.".to_string(),
                });
            }
        }
    }

    ErrorClassification {
        code,
        hint,
        hints,
        next_actions,
    }
}
