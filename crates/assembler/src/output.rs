use crate::filters::Period;
use crate::kind::ReportKind;
use reports_dataset::Record;
use serde::Serialize;

/// Why a report came back without rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradedReason {
    MissingDataset { dataset: String },
    MissingColumns { dataset: String, columns: Vec<String> },
    EmptyDataset { dataset: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    Degraded { reason: DegradedReason },
}

/// Distinct values offered as filter choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub customers: Vec<String>,
    pub locations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub report_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub kind: ReportKind,
    #[serde(flatten)]
    pub status: ReportStatus,
    pub rows: Vec<Record>,
    pub facets: Facets,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frequencies: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

impl ReportOutput {
    pub fn complete(kind: ReportKind, rows: Vec<Record>, facets: Facets) -> Self {
        Self {
            kind,
            status: ReportStatus::Complete,
            rows,
            facets,
            frequencies: Vec::new(),
            period: None,
        }
    }

    /// Empty rows and empty facets.
    pub fn degraded(kind: ReportKind, reason: DegradedReason) -> Self {
        Self {
            kind,
            status: ReportStatus::Degraded { reason },
            rows: Vec::new(),
            facets: Facets::default(),
            frequencies: Vec::new(),
            period: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ReportStatus::Degraded { .. })
    }
}
