use crate::command::context::CommandContext;
use crate::command::domain::{CommandAction, CommandOutcome};
use anyhow::Result;
use reports_assembler::{ReportKind, VersionView};
use reports_protocol::{
    Capabilities, CapabilitiesServer, CAPABILITIES_SCHEMA_VERSION, COMMAND_API_VERSION,
};
use serde_json::Value;

pub(crate) struct CapabilitiesService;

impl CapabilitiesService {
    pub async fn run(&self, _payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let output = Capabilities {
            schema_version: CAPABILITIES_SCHEMA_VERSION,
            command_api: COMMAND_API_VERSION.to_string(),
            server: CapabilitiesServer {
                name: "reports-cli".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            reports: ReportKind::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            version_reports: VersionView::ALL
                .iter()
                .map(|v| v.as_str().to_string())
                .collect(),
            actions: CommandAction::ALL
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
        };

        let mut outcome = CommandOutcome::from_value(output)?;
        outcome.meta.config_path = ctx.config_path();
        Ok(outcome)
    }
}
