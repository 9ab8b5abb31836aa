mod capabilities;
mod report;
mod resync;
mod versions;

use crate::command::context::CommandContext;
use crate::command::domain::{CommandAction, CommandOutcome, RequestOptions};
use crate::command::infra::HealthPort;
use anyhow::Result;
use serde_json::Value;

pub struct Services {
    capabilities: capabilities::CapabilitiesService,
    health: HealthPort,
    report: report::ReportService,
    resync: resync::ResyncService,
    versions: versions::VersionsService,
}

impl Services {
    pub fn new() -> Self {
        Self {
            capabilities: capabilities::CapabilitiesService,
            health: HealthPort,
            report: report::ReportService,
            resync: resync::ResyncService,
            versions: versions::VersionsService,
        }
    }

    pub async fn route(
        &self,
        action: CommandAction,
        payload: Value,
        options: &RequestOptions,
        ctx: &CommandContext,
    ) -> Result<CommandOutcome> {
        match action {
            CommandAction::Report => self.report.run(payload, options, ctx).await,
            CommandAction::Versions => self.versions.run(payload, options, ctx).await,
            CommandAction::Resync => self.resync.run(payload, ctx).await,
            CommandAction::Health => self.health.run(ctx).await,
            CommandAction::Capabilities => self.capabilities.run(payload, ctx).await,
        }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}
