//! # Reports Dataset
//!
//! In-memory tabular data for the fleet reports pipeline.
//!
//! ## Features
//!
//! - **Datasets** - ordered rows over one header, positional cells
//! - **CSV codec** - tolerant of quoting, ragged rows and empty files
//! - **Column resolution** - logical columns matched against drifting spellings
//! - **Relational helpers** - left join, concat, duplicate removal, projection
//!
//! ## Architecture
//!
//! ```text
//! CSV bytes / SQL rows
//!     │
//!     ├──> Dataset (columns + Vec<Vec<Value>>)
//!     │
//!     ├──> ResolvedSchema (LogicalColumn → physical name)
//!     │
//!     └──> left_join / concat / dedup_by / project
//!            └─> Vec<Record> for serialization
//! ```

mod csv_io;
mod dataset;
mod dates;
mod error;
mod resolver;
mod value;

pub use csv_io::{read_csv, write_csv};
pub use dataset::{Dataset, JoinSpec, Record, RowRef};
pub use dates::{parse_datetime, value_to_datetime};
pub use error::{DatasetError, Result};
pub use resolver::{resolve, LogicalColumn, ResolvedSchema, SchemaSpec};
pub use value::{Value, DATETIME_FORMAT, DATE_FORMAT};
