use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome, RequestOptions, VersionsPayload};
use anyhow::Result;
use reports_assembler::{ReportAssembler, ReportFilters, VersionReporter, VersionView};
use reports_versions::Correlator;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct VersionsService;

impl VersionsService {
    pub async fn run(
        &self,
        payload: Value,
        options: &RequestOptions,
        ctx: &CommandContext,
    ) -> Result<CommandOutcome> {
        let payload: VersionsPayload = parse_payload(payload)?;
        let view: VersionView = payload.view.parse()?;
        let filters = ReportFilters {
            location: payload.location,
            ..ReportFilters::default()
        };

        let source = ctx.read_source();
        let urls = ctx.config().knowledge_base_urls();
        let ttl = if options.no_cache {
            Duration::ZERO
        } else {
            ctx.config().cache_config().ttl
        };
        let args = json!({
            "source": source.describe(),
            "location": filters.location(),
            "urls": urls,
        });
        let reporter = VersionReporter::new(
            ReportAssembler::new(Arc::clone(&source)),
            Correlator::new(ctx.fetcher())?,
            urls,
        );
        let cached = ctx
            .cache()
            .get_or_compute(&format!("versions:{view}"), &args, ttl, move || async move {
                let report = reporter.report(view, &filters).await?;
                Ok::<_, anyhow::Error>(serde_json::to_value(report)?)
            })
            .await?;

        let mut outcome = CommandOutcome::from_value(cached.data)?;
        outcome.meta.source = Some(source.describe());
        outcome.meta.cache_hit = Some(cached.hit);
        outcome.meta.config_path = ctx.config_path();
        Ok(outcome)
    }
}
