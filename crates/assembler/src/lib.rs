//! # Reports Assembler
//!
//! Turns raw operational datasets into the rows and facets each dashboard
//! report renders.
//!
//! ## Features
//!
//! - **Declared inputs** - every [`ReportKind`] lists its datasets and columns
//! - **Degrade, never fail** - missing data yields a typed degraded report
//! - **Enrichment** - customer attached by location from `customer_locations`
//! - **Derived views** - alert trends, inventory dedup, monthly filters
//! - **Version currency** - inventories labelled against vendor release tables
//!
//! ## Architecture
//!
//! ```text
//! ReportAssembler::assemble(kind, filters)
//!     │
//!     ├──> load_inputs      (TabularSource + SchemaSpec check per dataset)
//!     │       └─> Degraded { MissingDataset | MissingColumns | EmptyDataset }
//!     │
//!     └──> reports::*       (enrich / exclude / statistics / inventory / monthly)
//!             └─> ReportOutput { rows, facets, frequencies, period }
//!
//! VersionReporter::report(view, filters)
//!     └──> inventory ──> Correlator ──> VersionReport
//! ```

mod assembler;
mod error;
mod filters;
mod kind;
mod output;
mod reports;
pub mod schema;
mod versions;

pub use assembler::ReportAssembler;
pub use error::{AssemblerError, Result};
pub use filters::{Period, ReportFilters};
pub use kind::{
    catalogue_datasets, DatasetInput, DatasetRole, ReportKind, CUSTOMER_LOCATIONS,
    VHOSTS_INVENTORY, VINFO_INVENTORY,
};
pub use output::{DegradedReason, Facets, ReportOutput, ReportStatus};
pub use reports::inventory::{merge_inventories, normalize_report_dates};
pub use reports::monthly::filter_monthly;
pub use reports::statistics::{Trend, DECREASE_COLOR, INCREASE_COLOR};
pub use reports::{enrich_with_customer, exclude_pairs};
pub use versions::{
    KnowledgeBaseUrls, VersionReport, VersionReporter, VersionView, ESXI_KB_URL,
    VCENTER_KB_URL, VCENTER_VM_MARKER,
};
