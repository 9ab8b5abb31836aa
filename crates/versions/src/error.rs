use thiserror::Error;

pub type Result<T> = std::result::Result<T, VersionsError>;

#[derive(Error, Debug)]
pub enum VersionsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Dataset error: {0}")]
    Dataset(#[from] reports_dataset::DatasetError),

    #[error("{0}")]
    Other(String),
}
