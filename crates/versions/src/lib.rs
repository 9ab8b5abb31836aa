//! # Reports Versions
//!
//! Labels fleet inventory with how far each machine trails the newest release.
//!
//! ## Features
//!
//! - **Knowledge-base scraping** - release tables read from published HTML
//! - **Recency labels** - "N", "N-1", ... in document order per table
//! - **Correlation** - inventory descriptors joined on (major.minor, build)
//! - **Graceful failure** - unreachable pages mean "NoLabel", never an error
//!
//! ## Architecture
//!
//! ```text
//! PageFetcher (HTTP / file:// / static)
//!     │
//!     ├──> TableParser      (<table> → rows of <td> text)
//!     │
//!     ├──> CatalogParser    (KbLayout positions → ReleaseEntry + label)
//!     │
//!     └──> label_inventory  (descriptor regex → left join → LabelCount)
//! ```

mod catalog;
mod correlate;
mod error;
mod fetch;
mod html;

pub use catalog::{
    catalog_dataset, rank_label, CatalogParser, DescriptorPattern, KbLayout, Product,
    ReleaseEntry, CATALOG_TABLES, LABEL_COLUMN, MAJOR_MINOR_COLUMN, NO_LABEL,
};
pub use correlate::{
    count_labels, label_inventory, Correlation, Correlator, LabelCount, BUILD_COLUMN,
    VERSION_COLUMN,
};
pub use error::{Result, VersionsError};
pub use fetch::{HttpFetcher, PageFetcher, StaticFetcher};
pub use html::{HtmlRow, TableParser};
