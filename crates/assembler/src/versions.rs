use crate::assembler::ReportAssembler;
use crate::error::{AssemblerError, Result};
use crate::filters::ReportFilters;
use crate::kind::{CUSTOMER_LOCATIONS, VHOSTS_INVENTORY, VINFO_INVENTORY};
use crate::schema::{CUSTOMER, LOCATION, REFERENCE_LOCATION, VM};
use reports_dataset::{Dataset, LogicalColumn, Record};
use reports_versions::{
    catalog_dataset, Correlator, LabelCount, Product, BUILD_COLUMN, LABEL_COLUMN, VERSION_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Published release tables, one per product line.
pub const ESXI_KB_URL: &str =
    "https://knowledge.broadcom.com/external/article/316595/build-numbers-and-versions-of-vmware-esx.html";
pub const VCENTER_KB_URL: &str =
    "https://knowledge.broadcom.com/external/article/326316/build-numbers-and-versions-of-vmware-vce.html";

/// vCenter appliances are recognised by this fragment of their VM name.
pub const VCENTER_VM_MARKER: &str = "vcs00";

const HOST: LogicalColumn = LogicalColumn::new("Host", &["Host", "host", "HOST"]);
const SDK_SERVER_TYPE: LogicalColumn =
    LogicalColumn::new("VI SDK Server type", &["VI SDK Server type"]);
const VERSION: LogicalColumn = LogicalColumn::new(VERSION_COLUMN, &[VERSION_COLUMN]);
const BUILD: LogicalColumn = LogicalColumn::new(BUILD_COLUMN, &[BUILD_COLUMN]);
const LABEL: LogicalColumn = LogicalColumn::new(LABEL_COLUMN, &[LABEL_COLUMN]);

const HOSTS_COLUMNS: &[LogicalColumn] = &[HOST, VERSION, BUILD, LOCATION, CUSTOMER, LABEL];
const VCENTER_COLUMNS: &[LogicalColumn] = &[VM, SDK_SERVER_TYPE, LOCATION, CUSTOMER, LABEL];

/// Projects onto `columns` under their logical names, reading each from the
/// first variant present. Absent columns are null.
fn project_logical(dataset: &Dataset, columns: &[LogicalColumn]) -> Result<Dataset> {
    let physical: Vec<&str> = columns
        .iter()
        .map(|c| c.resolve_in(dataset).unwrap_or(c.name))
        .collect();
    let projected = dataset.project(&physical);
    Ok(Dataset::from_rows(
        columns.iter().map(|c| c.name.to_string()).collect(),
        projected.rows().map(|row| row.cells().to_vec()).collect(),
    )?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseUrls {
    pub esxi: String,
    pub vcenter: String,
}

impl Default for KnowledgeBaseUrls {
    fn default() -> Self {
        Self {
            esxi: ESXI_KB_URL.to_string(),
            vcenter: VCENTER_KB_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionView {
    Hosts,
    Vcenter,
    Catalog,
}

impl VersionView {
    pub const ALL: [VersionView; 3] = [VersionView::Hosts, VersionView::Vcenter, VersionView::Catalog];

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionView::Hosts => "hosts",
            VersionView::Vcenter => "vcenter",
            VersionView::Catalog => "catalog",
        }
    }
}

impl fmt::Display for VersionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionView {
    type Err = AssemblerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosts" | "esxi" | "vhosts" => Ok(VersionView::Hosts),
            "vcenter" | "vinfo" => Ok(VersionView::Vcenter),
            "catalog" | "vmware_versions" => Ok(VersionView::Catalog),
            _ => Err(AssemblerError::UnknownReport(s.to_string())),
        }
    }
}

/// Version-currency views, shaped for the dashboard's charts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VersionReport {
    Hosts {
        hosts_table_data: Vec<Record>,
        pie_chart_data: Vec<LabelCount>,
        scraped_data: Vec<Record>,
    },
    Vcenter {
        vcs_machines_data: Vec<Record>,
        pie_chart_data: Vec<LabelCount>,
        vcenter_data: Vec<Record>,
    },
    Catalog {
        table_data: Vec<Record>,
        locations: Vec<String>,
    },
}

/// Correlates inventories read by an assembler with scraped release tables.
pub struct VersionReporter {
    assembler: ReportAssembler,
    correlator: Correlator,
    urls: KnowledgeBaseUrls,
}

fn filter_location(inventory: Dataset, filters: &ReportFilters) -> Dataset {
    match (filters.location(), LOCATION.resolve_in(&inventory)) {
        (Some(wanted), Some(column)) => {
            inventory.filter(|row| row.value(column).key().as_deref() == Some(wanted))
        }
        (Some(_), None) => {
            log::warn!("Inventory has no location column; location filter ignored");
            inventory
        }
        _ => inventory,
    }
}

impl VersionReporter {
    pub fn new(assembler: ReportAssembler, correlator: Correlator, urls: KnowledgeBaseUrls) -> Self {
        Self {
            assembler,
            correlator,
            urls,
        }
    }

    pub async fn report(&self, view: VersionView, filters: &ReportFilters) -> Result<VersionReport> {
        match view {
            VersionView::Hosts => self.hosts(filters).await,
            VersionView::Vcenter => self.vcenter(filters).await,
            VersionView::Catalog => self.catalog().await,
        }
    }

    async fn hosts(&self, filters: &ReportFilters) -> Result<VersionReport> {
        let inventory = self.assembler.read_or_empty(VHOSTS_INVENTORY).await;
        let inventory = filter_location(inventory, filters);
        let correlation = self
            .correlator
            .correlate(&inventory, &self.urls.esxi, Product::Esxi)
            .await?;
        Ok(VersionReport::Hosts {
            hosts_table_data: project_logical(&correlation.rows, HOSTS_COLUMNS)?.to_records(),
            pie_chart_data: correlation.label_counts,
            scraped_data: catalog_dataset(&correlation.catalog, Product::Esxi)?.to_records(),
        })
    }

    async fn vcenter(&self, filters: &ReportFilters) -> Result<VersionReport> {
        let vinfo = self.assembler.read_or_empty(VINFO_INVENTORY).await;
        let appliances = match VM.resolve_in(&vinfo) {
            Some(column) => vinfo.filter(|row| {
                row.value(column)
                    .as_text()
                    .is_some_and(|name| name.contains(VCENTER_VM_MARKER))
            }),
            None => {
                log::warn!("{VINFO_INVENTORY} has no VM column; no vCenter appliances found");
                Dataset::empty()
            }
        };
        let appliances = filter_location(appliances, filters);
        let correlation = self
            .correlator
            .correlate(&appliances, &self.urls.vcenter, Product::Vcenter)
            .await?;
        Ok(VersionReport::Vcenter {
            vcs_machines_data: project_logical(&correlation.rows, VCENTER_COLUMNS)?.to_records(),
            pie_chart_data: correlation.label_counts,
            vcenter_data: catalog_dataset(&correlation.catalog, Product::Vcenter)?.to_records(),
        })
    }

    async fn catalog(&self) -> Result<VersionReport> {
        let entries = self.correlator.catalog(&self.urls.esxi, Product::Esxi).await;
        let reference = self.assembler.read_or_empty(CUSTOMER_LOCATIONS).await;
        let locations = REFERENCE_LOCATION
            .resolve_in(&reference)
            .map(|c| reference.distinct_sorted(c))
            .unwrap_or_default();
        Ok(VersionReport::Catalog {
            table_data: catalog_dataset(&entries, Product::Esxi)?.to_records(),
            locations,
        })
    }
}
