use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome, Hint, HintKind, ResyncPayload};
use anyhow::Result;
use reports_source::resync;
use serde_json::Value;

pub(crate) struct ResyncService;

impl ResyncService {
    /// Copies tables from the primary source into the SQLite mirror. Partial
    /// failure is reported in the data, not as a command error.
    pub async fn run(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let payload: ResyncPayload = parse_payload(payload)?;
        let Some(mirror) = ctx.mirror() else {
            anyhow::bail!("No mirror configured for resync");
        };
        let tables = payload
            .tables
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| ctx.config().resync.tables.clone());

        let report = resync(ctx.primary().as_ref(), mirror.as_ref(), &tables).await;
        log::info!("{}", report.summary());

        let mut hints = Vec::new();
        if !report.refreshed.is_empty() {
            match ctx.cache().invalidate().await {
                Ok(()) => hints.push(Hint {
                    kind: HintKind::Cache,
                    text: "Report cache cleared after refresh".to_string(),
                }),
                Err(err) => log::warn!("Cache invalidation after resync failed: {err:#}"),
            }
        }
        if !report.is_success() {
            hints.push(Hint {
                kind: HintKind::Warn,
                text: report.summary(),
            });
        }

        let mut outcome = CommandOutcome::from_value(&report)?;
        outcome.hints = hints;
        outcome.meta.source = Some(ctx.primary().describe());
        outcome.meta.duration_ms = Some(report.duration_ms);
        outcome.meta.config_path = ctx.config_path();
        Ok(outcome)
    }
}
