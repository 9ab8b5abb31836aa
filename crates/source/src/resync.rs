use crate::TabularSource;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResyncStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

/// Outcome of one resync run. Tables listed in `refreshed` were replaced even
/// when the run as a whole failed.
#[derive(Debug, Clone, Serialize)]
pub struct ResyncReport {
    pub status: ResyncStatus,
    pub refreshed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<TableFailure>,
    pub duration_ms: u64,
}

impl ResyncReport {
    pub fn is_success(&self) -> bool {
        self.status == ResyncStatus::Ok
    }

    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!(
                "Resync complete: {} refreshed, {} skipped",
                self.refreshed.len(),
                self.skipped.len()
            )
        } else {
            let names = self
                .failed
                .iter()
                .map(|f| f.table.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Resync failed for {names} ({} refreshed, {} skipped)",
                self.refreshed.len(),
                self.skipped.len()
            )
        }
    }
}

/// Copies each table from `from` into `to`, in order. Every table is replaced on
/// its own; a failure is recorded and the remaining tables are still attempted.
/// Empty source datasets are skipped so the mirror keeps its last good copy.
pub async fn resync(
    from: &dyn TabularSource,
    to: &dyn TabularSource,
    tables: &[String],
) -> ResyncReport {
    let started = Instant::now();
    let mut refreshed = Vec::new();
    let mut skipped = Vec::new();
    let mut failed = Vec::new();

    log::info!(
        "Resync of {} tables: {} -> {}",
        tables.len(),
        from.describe(),
        to.describe()
    );

    for table in tables {
        let dataset = match from.read_dataset(table).await {
            Ok(dataset) => dataset,
            Err(err) => {
                log::error!("Resync: reading {table} failed: {err}");
                failed.push(TableFailure {
                    table: table.clone(),
                    error: err.to_string(),
                });
                continue;
            }
        };
        if dataset.is_empty() {
            log::warn!("Resync: {table} is empty, keeping previous mirror copy");
            skipped.push(table.clone());
            continue;
        }
        match to.write_dataset(&dataset, table).await {
            Ok(()) => {
                log::info!("Resync: refreshed {table} ({} rows)", dataset.len());
                refreshed.push(table.clone());
            }
            Err(err) => {
                log::error!("Resync: writing {table} failed: {err}");
                failed.push(TableFailure {
                    table: table.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    let status = if failed.is_empty() {
        ResyncStatus::Ok
    } else {
        ResyncStatus::Failed
    };
    ResyncReport {
        status,
        refreshed,
        skipped,
        failed,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
