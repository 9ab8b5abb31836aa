//! Logical columns of every dataset the dashboard reads.

use reports_dataset::LogicalColumn;

/// Location as spelled by report datasets.
pub const LOCATION: LogicalColumn = LogicalColumn::new("Location", &["Location", "location", "LOCATION"]);

/// Location as spelled by `customer_locations`, which favours lower case.
pub const REFERENCE_LOCATION: LogicalColumn =
    LogicalColumn::new("Location", &["location", "Location", "LOCATION"]);

pub const CUSTOMER: LogicalColumn = LogicalColumn::new("Customer", &["Customer", "customer", "CUSTOMER"]);

pub const NETWORK: LogicalColumn = LogicalColumn::new("Network", &["Network", "network", "NETWORK"]);

pub const EXCLUDED_NETWORK: LogicalColumn = LogicalColumn::new("Network", &["Network"]);
pub const EXCLUDED_LOCATION: LogicalColumn = LogicalColumn::new("Location", &["Location"]);

pub const REPORT_DATE: LogicalColumn = LogicalColumn::new(
    "Report Date",
    &["Report Date", "report_date", "REPORT_DATE", "Date", "date"],
);

pub const STAT_DATE: LogicalColumn = LogicalColumn::new("date", &["date", "Date"]);
pub const STAT_LOCATION: LogicalColumn = LogicalColumn::new("location", &["location", "Location"]);
pub const STAT_CUSTOMER: LogicalColumn = LogicalColumn::new("customer", &["customer", "Customer"]);
pub const CRITICAL: LogicalColumn = LogicalColumn::new("critical", &["critical", "Critical"]);
pub const IMMEDIATE: LogicalColumn = LogicalColumn::new("immediate", &["immediate", "Immediate"]);
pub const WARNING: LogicalColumn = LogicalColumn::new("warning", &["warning", "Warning"]);
pub const TOTAL: LogicalColumn = LogicalColumn::new("total", &["total", "Total"]);

pub const MONTHLY_CUSTOMER: LogicalColumn =
    LogicalColumn::new("customer", &["customer", "Customer", "CUSTOMER"]);
pub const MONTHLY_LOCATION: LogicalColumn =
    LogicalColumn::new("location", &["location", "Location", "LOCATION"]);
pub const REPORT_NAME: LogicalColumn =
    LogicalColumn::new("report name", &["report name", "Report Name", "report_name"]);

pub const VM: LogicalColumn = LogicalColumn::new("VM", &["VM"]);

/// Columns whose combination identifies one environment inventory entry.
pub const INVENTORY_IDENTITY: &[&str] = &["Customer", "Location", "Report Date", "VM", "Name"];
