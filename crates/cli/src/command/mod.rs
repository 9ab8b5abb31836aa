pub mod context;
pub mod domain;
pub mod infra;
mod services;

pub use context::CommandContext;
pub use domain::{
    classify_error, CommandAction, CommandOutcome, CommandRequest, CommandResponse,
    CommandStatus, Hint, HintKind, ReportPayload, RequestOptions, ResponseMeta, ResyncPayload,
    VersionsPayload,
};

use reports_protocol::ErrorEnvelope;
use services::Services;
use std::time::Instant;

pub struct CommandHandler {
    services: Services,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self {
            services: Services::new(),
        }
    }

    pub async fn execute(&self, request: CommandRequest, ctx: &CommandContext) -> CommandResponse {
        let started = Instant::now();
        let CommandRequest {
            action,
            payload,
            options,
        } = request;
        let options = options.unwrap_or_default();
        log::debug!("Command {} started", action.as_str());

        let outcome = self.services.route(action, payload, &options, ctx).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(mut outcome) => {
                outcome.meta.duration_ms = outcome.meta.duration_ms.or(Some(elapsed_ms));
                log::debug!("Command {} finished in {elapsed_ms} ms", action.as_str());
                CommandResponse {
                    status: CommandStatus::Ok,
                    message: None,
                    error: None,
                    hints: outcome.hints,
                    next_actions: outcome.next_actions,
                    data: outcome.data,
                    meta: outcome.meta,
                }
            }
            Err(err) => {
                log::warn!("Command {} failed: {err:#}", action.as_str());
                let mut response = error_response(err, Some(action), elapsed_ms);
                response.meta.config_path = ctx.config_path();
                response
            }
        }
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn error_response(
    err: anyhow::Error,
    action: Option<CommandAction>,
    duration_ms: u64,
) -> CommandResponse {
    let message = format!("{err:#}");
    let classification = classify_error(&message, action);
    let hints = classification.hints;
    let hint = classification
        .hint
        .or_else(|| hints.first().map(|h| h.text.clone()));
    let error = ErrorEnvelope {
        code: classification.code,
        message: message.clone(),
        details: None,
        hint,
        next_actions: classification.next_actions.clone(),
    };
    CommandResponse {
        status: CommandStatus::Error,
        message: Some(message),
        error: Some(error),
        hints,
        next_actions: classification.next_actions,
        data: serde_json::Value::Null,
        meta: ResponseMeta {
            duration_ms: Some(duration_ms),
            ..Default::default()
        },
    }
}

pub async fn execute(request: CommandRequest, ctx: &CommandContext) -> CommandResponse {
    CommandHandler::new().execute(request, ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportsConfig;
    use pretty_assertions::assert_eq;
    use reports_dataset::read_csv;
    use reports_source::{ObjectStoreSource, SqliteSource, TabularSource};
    use reports_versions::StaticFetcher;
    use serde_json::json;
    use std::sync::Arc;

    async fn context_with(
        tables: &[(&str, &str)],
        mirror: Option<Arc<SqliteSource>>,
    ) -> CommandContext {
        let source = ObjectStoreSource::in_memory();
        for (name, csv) in tables {
            source
                .write_dataset(&read_csv(csv.as_bytes()).unwrap(), name)
                .await
                .unwrap();
        }
        CommandContext::new(
            ReportsConfig::default(),
            Arc::new(source),
            mirror,
            Arc::new(StaticFetcher::new()),
        )
    }

    fn request(value: serde_json::Value) -> CommandRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn report_is_cached_between_requests() {
        let ctx = context_with(
            &[(
                "combined_vrops_list_of_alerts",
                "Alert,Location\ncpu,ams\ndisk,ber\n",
            )],
            None,
        )
        .await;
        let req = || request(json!({"action": "report", "payload": {"kind": "alerts", "location": "ams"}}));

        let first = execute(req(), &ctx).await;
        assert_eq!(first.status, CommandStatus::Ok);
        assert_eq!(first.data["rows"].as_array().unwrap().len(), 1);
        assert_eq!(first.meta.cache_hit, Some(false));
        assert_eq!(first.meta.degraded, Some(false));

        let second = execute(req(), &ctx).await;
        assert_eq!(second.meta.cache_hit, Some(true));
        assert_eq!(second.data, first.data);
    }

    #[tokio::test]
    async fn degraded_report_is_ok_with_warning() {
        let ctx = context_with(&[], None).await;
        let response = execute(
            request(json!({"action": "report", "payload": {"kind": "firmware"}})),
            &ctx,
        )
        .await;
        assert!(!response.is_error());
        assert_eq!(response.data["status"], "degraded");
        assert_eq!(response.meta.degraded, Some(true));
        assert_eq!(response.hints[0].kind, HintKind::Warn);
    }

    #[tokio::test]
    async fn unknown_kind_is_invalid_request() {
        let ctx = context_with(&[], None).await;
        let response = execute(
            request(json!({"action": "report", "payload": {"kind": "weather"}})),
            &ctx,
        )
        .await;
        assert!(response.is_error());
        let error = response.error.unwrap();
        assert_eq!(error.code, "invalid_request");
        assert!(error.message.contains("weather"));
    }

    #[tokio::test]
    async fn bad_month_is_invalid_request() {
        let ctx = context_with(&[], None).await;
        let response = execute(
            request(json!({"action": "report", "payload": {"kind": "monthly", "month": 13}})),
            &ctx,
        )
        .await;
        assert_eq!(response.error.unwrap().code, "invalid_request");
    }

    #[tokio::test]
    async fn resync_without_mirror_is_source_unavailable() {
        let ctx = context_with(&[], None).await;
        let response = execute(request(json!({"action": "resync"})), &ctx).await;
        assert_eq!(response.error.unwrap().code, "source_unavailable");
    }

    #[tokio::test]
    async fn resync_refreshes_mirror_and_clears_cache() {
        let mirror = Arc::new(SqliteSource::open_in_memory().unwrap());
        let ctx = context_with(
            &[("customer_locations", "location,Customer\nams,Acme\n")],
            Some(Arc::clone(&mirror)),
        )
        .await;
        let response = execute(
            request(json!({
                "action": "resync",
                "payload": {"tables": ["customer_locations", "excluded_networks"]}
            })),
            &ctx,
        )
        .await;
        assert!(!response.is_error());
        assert_eq!(response.data["status"], "failed");
        assert_eq!(response.data["refreshed"], json!(["customer_locations"]));
        assert_eq!(response.data["failed"][0]["table"], "excluded_networks");
        assert_eq!(mirror.read_dataset("customer_locations").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn health_and_capabilities() {
        let ctx = context_with(&[], None).await;
        let health = execute(request(json!({"action": "health"})), &ctx).await;
        assert_eq!(health.data["status"], "ready");
        assert_eq!(health.data["sources"][0]["role"], "primary");

        let caps = execute(request(json!({"action": "capabilities"})), &ctx).await;
        assert_eq!(caps.data["reports"].as_array().unwrap().len(), 14);
        assert_eq!(
            caps.data["version_reports"],
            json!(["hosts", "vcenter", "catalog"])
        );
    }
}
