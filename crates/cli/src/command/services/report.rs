use crate::command::context::CommandContext;
use crate::command::domain::{
    parse_payload, CommandOutcome, Hint, HintKind, ReportPayload, RequestOptions,
};
use anyhow::Result;
use reports_assembler::{ReportAssembler, ReportKind};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct ReportService;

impl ReportService {
    pub async fn run(
        &self,
        payload: Value,
        options: &RequestOptions,
        ctx: &CommandContext,
    ) -> Result<CommandOutcome> {
        let payload: ReportPayload = parse_payload(payload)?;
        let kind: ReportKind = payload.kind.parse()?;
        // Rejected before the cache so a bad month is never served from it.
        if kind == ReportKind::Monthly {
            payload.filters.period()?;
        }

        let source = ctx.read_source();
        let ttl = if options.no_cache {
            Duration::ZERO
        } else {
            report_ttl(kind, ctx)
        };
        let args = json!({ "source": source.describe(), "filters": payload.filters });
        let filters = payload.filters;
        let assembler = ReportAssembler::new(Arc::clone(&source));
        let cached = ctx
            .cache()
            .get_or_compute(&format!("report:{kind}"), &args, ttl, move || async move {
                let output = assembler.assemble(kind, &filters).await?;
                Ok::<_, anyhow::Error>(serde_json::to_value(output)?)
            })
            .await?;

        let mut outcome = CommandOutcome::from_value(cached.data)?;
        annotate(&mut outcome, kind);
        outcome.meta.source = Some(source.describe());
        outcome.meta.cache_hit = Some(cached.hit);
        outcome.meta.config_path = ctx.config_path();
        if cached.hit {
            outcome.hints.push(Hint {
                kind: HintKind::Cache,
                text: format!("Served from cache (ttl {}s)", ttl.as_secs()),
            });
        }
        Ok(outcome)
    }
}

pub(crate) fn report_ttl(kind: ReportKind, ctx: &CommandContext) -> Duration {
    match kind {
        ReportKind::Monthly => ctx.config().monthly_ttl(),
        _ => ctx.config().cache_config().ttl,
    }
}

/// Surfaces a degraded status as a warning hint.
fn annotate(outcome: &mut CommandOutcome, kind: ReportKind) {
    let degraded = outcome.data["status"] == "degraded";
    outcome.meta.degraded = Some(degraded);
    if !degraded {
        return;
    }
    let reason = &outcome.data["reason"];
    let dataset = reason["dataset"].as_str().unwrap_or("?");
    let text = match reason["kind"].as_str() {
        Some("missing_columns") => {
            let columns: Vec<&str> = reason["columns"]
                .as_array()
                .map(|c| c.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            format!(
                "{kind} report is empty: {dataset} lacks {}",
                columns.join(", ")
            )
        }
        Some("empty_dataset") => format!("{kind} report is empty: {dataset} has no rows"),
        _ => format!("{kind} report is empty: {dataset} was not found"),
    };
    outcome.hints.push(Hint {
        kind: HintKind::Warn,
        text,
    });
}
