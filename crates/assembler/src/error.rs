use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssemblerError>;

/// Failures of the request itself. Data problems never surface here; they
/// produce a degraded report instead.
#[derive(Error, Debug)]
pub enum AssemblerError {
    #[error("Unknown report kind: {0}")]
    UnknownReport(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Dataset error: {0}")]
    Dataset(#[from] reports_dataset::DatasetError),

    #[error("Versions error: {0}")]
    Versions(#[from] reports_versions::VersionsError),
}
