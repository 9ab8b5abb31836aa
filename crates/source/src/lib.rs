//! # Reports Source
//!
//! Uniform access to tabular datasets regardless of where they live.
//!
//! ```text
//! TabularSource (read / write / exists / list / ping)
//!     │
//!     ├──> ObjectStoreSource  (<name>.csv in a local dir, memory, or S3)
//!     │
//!     └──> SqliteSource       (one table per dataset, the read mirror)
//!
//! resync(object store → SQLite mirror), one table at a time
//! ```

mod error;
mod object;
mod resync;
mod sqlite;

use async_trait::async_trait;
use reports_dataset::Dataset;

pub use error::{Result, SourceError};
pub use object::ObjectStoreSource;
pub use resync::{resync, ResyncReport, ResyncStatus, TableFailure};
pub use sqlite::SqliteSource;

/// A named-dataset store. Names are logical (`customer_locations`), never paths
/// or file names; each backend maps them to its own layout.
#[async_trait]
pub trait TabularSource: Send + Sync {
    /// Human-readable location used in logs and health output.
    fn describe(&self) -> String;

    /// Reads a whole dataset. A missing dataset is [`SourceError::NotFound`].
    async fn read_dataset(&self, name: &str) -> Result<Dataset>;

    /// Replaces the dataset stored under `name`.
    async fn write_dataset(&self, dataset: &Dataset, name: &str) -> Result<()>;

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Dataset names starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<()>;
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.chars().any(char::is_control) {
        return Err(SourceError::InvalidName(name.to_string()));
    }
    Ok(())
}
