use crate::error::AssemblerError;
use crate::schema::*;
use reports_dataset::SchemaSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const CUSTOMER_LOCATIONS: &str = "customer_locations";
pub const VHOSTS_INVENTORY: &str = "combined_vhosts_reports";
pub const VINFO_INVENTORY: &str = "rvtools_vinfo";

/// How a report treats one of its datasets when it is absent or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetRole {
    /// Absent, empty or missing a required column: the report degrades.
    Required,
    /// Absent: the feature it drives is skipped.
    Optional,
    /// Facet source; absent means empty facets.
    Reference,
}

#[derive(Debug, Clone, Copy)]
pub struct DatasetInput {
    pub name: &'static str,
    pub role: DatasetRole,
    pub schema: SchemaSpec,
}

impl DatasetInput {
    const fn required(name: &'static str, schema: SchemaSpec) -> Self {
        Self {
            name,
            role: DatasetRole::Required,
            schema,
        }
    }

    const fn optional(name: &'static str, schema: SchemaSpec) -> Self {
        Self {
            name,
            role: DatasetRole::Optional,
            schema,
        }
    }

    const fn reference(name: &'static str, schema: SchemaSpec) -> Self {
        Self {
            name,
            role: DatasetRole::Reference,
            schema,
        }
    }
}

const ANY: SchemaSpec = SchemaSpec::new(&[], &[]);
const REFERENCE: DatasetInput = DatasetInput::reference(
    CUSTOMER_LOCATIONS,
    SchemaSpec::new(&[], &[REFERENCE_LOCATION, CUSTOMER]),
);

const SNAPSHOT: &[DatasetInput] = &[DatasetInput::required("combined_snapshot_reports", ANY)];
const VHEALTH: &[DatasetInput] = &[DatasetInput::required("combined_vhealth_reports", ANY)];
const VDISK: &[DatasetInput] = &[DatasetInput::required("combined_vdisk_reports", ANY)];
const VHOSTS: &[DatasetInput] = &[DatasetInput::required(VHOSTS_INVENTORY, ANY)];
const FIRMWARE: &[DatasetInput] = &[
    DatasetInput::required("combined_firmware_reports", SchemaSpec::new(&[LOCATION], &[])),
    DatasetInput::required(
        CUSTOMER_LOCATIONS,
        SchemaSpec::new(&[REFERENCE_LOCATION], &[CUSTOMER]),
    ),
];
const VINFO: &[DatasetInput] = &[DatasetInput::required(
    VINFO_INVENTORY,
    SchemaSpec::new(&[LOCATION], &[CUSTOMER]),
)];
const STATISTICS: &[DatasetInput] = &[DatasetInput::required(
    "vrops_alerts_historical",
    SchemaSpec::new(
        &[STAT_DATE, STAT_LOCATION],
        &[STAT_CUSTOMER, CRITICAL, IMMEDIATE, WARNING, TOTAL],
    ),
)];
const NETWORK_UTILIZATION: &[DatasetInput] = &[
    DatasetInput::required(
        "combined_network_utilization_report",
        SchemaSpec::new(&[], &[NETWORK, LOCATION]),
    ),
    DatasetInput::optional(
        "excluded_networks",
        SchemaSpec::new(&[EXCLUDED_NETWORK, EXCLUDED_LOCATION], &[]),
    ),
    REFERENCE,
];
const CERTIFICATE_EXPIRY: &[DatasetInput] = &[
    DatasetInput::required("combined_certificate_expiry_reports", ANY),
    REFERENCE,
];
const PASSWORD_EXPIRATION: &[DatasetInput] = &[
    DatasetInput::required("combined_password_expiration_reports", ANY),
    REFERENCE,
];
const ANTIVIRUS_ASSET: &[DatasetInput] = &[
    DatasetInput::required("combined_antivirus_asset_reports", ANY),
    REFERENCE,
];
const ENV_VERSIONS: &[DatasetInput] = &[
    DatasetInput::optional("combined_non_vcf_inventory", SchemaSpec::new(&[], &[REPORT_DATE])),
    DatasetInput::optional("combined_vcf_inventory", SchemaSpec::new(&[], &[REPORT_DATE])),
];
const ALERTS: &[DatasetInput] = &[DatasetInput::required(
    "combined_vrops_list_of_alerts",
    SchemaSpec::new(&[], &[LOCATION]),
)];
const MONTHLY: &[DatasetInput] = &[
    DatasetInput::required(
        "report",
        SchemaSpec::new(&[MONTHLY_CUSTOMER, MONTHLY_LOCATION, REPORT_NAME], &[]),
    ),
    DatasetInput::optional("frequencies", ANY),
    REFERENCE,
];

/// Every report the dashboard serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Snapshot,
    Vhealth,
    Vdisk,
    Vhosts,
    Firmware,
    Vinfo,
    Statistics,
    NetworkUtilization,
    CertificateExpiry,
    PasswordExpiration,
    AntivirusAsset,
    EnvVersions,
    Alerts,
    Monthly,
}

impl ReportKind {
    pub const ALL: [ReportKind; 14] = [
        ReportKind::Snapshot,
        ReportKind::Vhealth,
        ReportKind::Vdisk,
        ReportKind::Vhosts,
        ReportKind::Firmware,
        ReportKind::Vinfo,
        ReportKind::Statistics,
        ReportKind::NetworkUtilization,
        ReportKind::CertificateExpiry,
        ReportKind::PasswordExpiration,
        ReportKind::AntivirusAsset,
        ReportKind::EnvVersions,
        ReportKind::Alerts,
        ReportKind::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Snapshot => "snapshot",
            ReportKind::Vhealth => "vhealth",
            ReportKind::Vdisk => "vdisk",
            ReportKind::Vhosts => "vhosts",
            ReportKind::Firmware => "firmware",
            ReportKind::Vinfo => "vinfo",
            ReportKind::Statistics => "statistics",
            ReportKind::NetworkUtilization => "network_utilization",
            ReportKind::CertificateExpiry => "certificate_expiry",
            ReportKind::PasswordExpiration => "password_expiration",
            ReportKind::AntivirusAsset => "antivirus_asset",
            ReportKind::EnvVersions => "env_versions",
            ReportKind::Alerts => "alerts",
            ReportKind::Monthly => "monthly",
        }
    }

    /// Datasets the report reads, in load order.
    pub fn inputs(&self) -> &'static [DatasetInput] {
        match self {
            ReportKind::Snapshot => SNAPSHOT,
            ReportKind::Vhealth => VHEALTH,
            ReportKind::Vdisk => VDISK,
            ReportKind::Vhosts => VHOSTS,
            ReportKind::Firmware => FIRMWARE,
            ReportKind::Vinfo => VINFO,
            ReportKind::Statistics => STATISTICS,
            ReportKind::NetworkUtilization => NETWORK_UTILIZATION,
            ReportKind::CertificateExpiry => CERTIFICATE_EXPIRY,
            ReportKind::PasswordExpiration => PASSWORD_EXPIRATION,
            ReportKind::AntivirusAsset => ANTIVIRUS_ASSET,
            ReportKind::EnvVersions => ENV_VERSIONS,
            ReportKind::Alerts => ALERTS,
            ReportKind::Monthly => MONTHLY,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = AssemblerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let normalized = normalized.strip_suffix("_report").unwrap_or(&normalized);
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| AssemblerError::UnknownReport(s.to_string()))
    }
}

/// Every dataset name the dashboard reads, without repeats. This is the default
/// resync table list.
pub fn catalogue_datasets() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    let all = ReportKind::ALL
        .iter()
        .flat_map(|kind| kind.inputs().iter().map(|input| input.name))
        .chain([VHOSTS_INVENTORY, VINFO_INVENTORY, CUSTOMER_LOCATIONS]);
    for name in all {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
