use crate::command::context::CommandContext;
use crate::command::domain::{CommandOutcome, Hint, HintKind};
use anyhow::Result;
use reports_source::TabularSource;
use serde::Serialize;
use std::time::Instant;

#[derive(Clone, Default)]
pub struct HealthPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    NotReady,
}

#[derive(Debug, Serialize)]
pub struct SourceHealth {
    pub role: &'static str,
    pub target: String,
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: Readiness,
    pub sources: Vec<SourceHealth>,
}

impl HealthReport {
    pub fn is_ready(&self) -> bool {
        self.status == Readiness::Ready
    }
}

impl HealthPort {
    /// Pings the primary source and, when configured, the mirror. Any failed
    /// ping makes the whole report not ready.
    pub async fn probe(&self, ctx: &CommandContext) -> HealthReport {
        let mut sources = vec![ping("primary", ctx.primary().as_ref()).await];
        if let Some(mirror) = ctx.mirror() {
            sources.push(ping("mirror", mirror.as_ref()).await);
        }
        let status = if sources.iter().all(|s| s.ok) {
            Readiness::Ready
        } else {
            Readiness::NotReady
        };
        HealthReport { status, sources }
    }

    pub async fn run(&self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let report = self.probe(ctx).await;
        let mut hints = Vec::new();
        for source in report.sources.iter().filter(|s| !s.ok) {
            hints.push(Hint {
                kind: HintKind::Warn,
                text: format!(
                    "{} source {} is unreachable: {}",
                    source.role,
                    source.target,
                    source.error.as_deref().unwrap_or("unknown error")
                ),
            });
        }
        if ctx.mirror().is_none() {
            hints.push(Hint {
                kind: HintKind::Info,
                text: "No SQLite mirror configured; resync is unavailable.".to_string(),
            });
        }
        let mut outcome = CommandOutcome::from_value(report)?;
        outcome.hints = hints;
        outcome.meta.config_path = ctx.config_path();
        Ok(outcome)
    }
}

async fn ping(role: &'static str, source: &dyn TabularSource) -> SourceHealth {
    let started = Instant::now();
    let result = source.ping().await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if let Err(err) = &result {
        log::warn!("Health: {role} source {} failed: {err}", source.describe());
    }
    SourceHealth {
        role,
        target: source.describe(),
        ok: result.is_ok(),
        latency_ms,
        error: result.err().map(|e| e.to_string()),
    }
}
