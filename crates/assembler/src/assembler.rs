use crate::error::Result;
use crate::filters::ReportFilters;
use crate::kind::{DatasetRole, ReportKind};
use crate::output::{DegradedReason, ReportOutput};
use crate::reports;
use reports_dataset::{Dataset, ResolvedSchema};
use reports_source::TabularSource;
use std::sync::Arc;

/// One dataset that passed its declaration check.
pub(crate) struct Loaded {
    pub name: &'static str,
    pub role: DatasetRole,
    pub dataset: Dataset,
    pub schema: ResolvedSchema,
}

/// Datasets of one report, in declaration order. Every `Required` input is
/// present; optional and reference inputs may be absent.
pub(crate) struct Inputs {
    loaded: Vec<Loaded>,
}

impl Inputs {
    pub fn get(&self, name: &str) -> Option<&Loaded> {
        self.loaded.iter().find(|l| l.name == name)
    }

    /// First required input.
    pub fn primary(&self) -> Option<&Loaded> {
        self.loaded.iter().find(|l| l.role == DatasetRole::Required)
    }

    pub fn reference(&self) -> Option<&Loaded> {
        self.loaded.iter().find(|l| l.role == DatasetRole::Reference)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loaded> {
        self.loaded.iter()
    }
}

/// Builds reports from datasets read through a [`TabularSource`].
///
/// Assembly never writes to the source and never fails on data problems: a
/// missing dataset or column yields a degraded report with empty rows.
#[derive(Clone)]
pub struct ReportAssembler {
    source: Arc<dyn TabularSource>,
}

impl ReportAssembler {
    pub fn new(source: Arc<dyn TabularSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn TabularSource> {
        &self.source
    }

    pub async fn assemble(&self, kind: ReportKind, filters: &ReportFilters) -> Result<ReportOutput> {
        log::debug!("Assembling {kind} report with {filters:?}");
        let inputs = match self.load_inputs(kind).await {
            Ok(inputs) => inputs,
            Err(reason) => {
                log::warn!("{kind} report degraded: {reason:?}");
                return Ok(ReportOutput::degraded(kind, reason));
            }
        };
        let output = match kind {
            ReportKind::Snapshot
            | ReportKind::Vhealth
            | ReportKind::Vdisk
            | ReportKind::Vhosts => reports::passthrough(kind, &inputs),
            ReportKind::Firmware => reports::firmware(&inputs)?,
            ReportKind::Vinfo => reports::vinfo(&inputs),
            ReportKind::Statistics => reports::statistics::assemble(&inputs),
            ReportKind::NetworkUtilization => reports::network_utilization(&inputs),
            ReportKind::CertificateExpiry
            | ReportKind::PasswordExpiration
            | ReportKind::AntivirusAsset => reports::with_reference_facets(kind, &inputs),
            ReportKind::EnvVersions => reports::inventory::env_versions(&inputs)?,
            ReportKind::Alerts => reports::alerts(&inputs, filters),
            ReportKind::Monthly => reports::monthly::assemble(&inputs, filters)?,
        };
        log::info!(
            "Assembled {kind} report: {} rows, {} customers, {} locations",
            output.rows.len(),
            output.facets.customers.len(),
            output.facets.locations.len()
        );
        Ok(output)
    }

    /// Reads a dataset, treating any failure as "no data".
    pub(crate) async fn read_or_empty(&self, name: &str) -> Dataset {
        match self.source.read_dataset(name).await {
            Ok(dataset) => dataset,
            Err(err) => {
                log::warn!("Failed to read {name} from {}: {err}", self.source.describe());
                Dataset::empty()
            }
        }
    }

    async fn load_inputs(&self, kind: ReportKind) -> std::result::Result<Inputs, DegradedReason> {
        let mut loaded = Vec::new();
        for input in kind.inputs() {
            let name = input.name;
            let dataset = match self.source.read_dataset(name).await {
                Ok(dataset) => Some(dataset),
                Err(err) if err.is_not_found() => None,
                Err(err) => {
                    log::warn!(
                        "{name} unavailable from {}, treating as empty: {err}",
                        self.source.describe()
                    );
                    Some(Dataset::empty())
                }
            };
            let required = input.role == DatasetRole::Required;

            let Some(dataset) = dataset else {
                if required {
                    return Err(DegradedReason::MissingDataset {
                        dataset: name.to_string(),
                    });
                }
                log::debug!("Optional dataset {name} is absent");
                continue;
            };
            if dataset.is_empty() {
                if required {
                    return Err(DegradedReason::EmptyDataset {
                        dataset: name.to_string(),
                    });
                }
                log::debug!("Optional dataset {name} is empty");
                continue;
            }
            let schema = match input.schema.check(&dataset) {
                Ok(schema) => schema,
                Err(missing) => {
                    log::warn!(
                        "{name} lacks columns {missing:?}; available: {:?}",
                        dataset.columns()
                    );
                    if required {
                        return Err(DegradedReason::MissingColumns {
                            dataset: name.to_string(),
                            columns: missing.into_iter().map(str::to_string).collect(),
                        });
                    }
                    continue;
                }
            };
            loaded.push(Loaded {
                name,
                role: input.role,
                dataset,
                schema,
            });
        }
        Ok(Inputs { loaded })
    }
}
