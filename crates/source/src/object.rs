use crate::error::{Result, SourceError};
use crate::{validate_name, TabularSource};
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use reports_dataset::{read_csv, write_csv, Dataset};
use std::path::Path;
use std::sync::Arc;

const CSV_SUFFIX: &str = ".csv";

/// Datasets stored as `<name>.csv` objects in any `object_store` backend.
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    label: String,
}

impl ObjectStoreSource {
    pub fn new(store: Arc<dyn ObjectStore>, label: impl Into<String>) -> Self {
        Self {
            store,
            label: label.into(),
        }
    }

    /// Directory-backed store; the directory is created when missing.
    pub fn local(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let store = object_store::local::LocalFileSystem::new_with_prefix(dir)?;
        Ok(Self::new(
            Arc::new(store),
            format!("local:{}", dir.display()),
        ))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()), "memory")
    }

    /// S3 bucket; credentials come from the standard AWS environment variables.
    pub fn s3(bucket: &str, region: Option<&str>) -> Result<Self> {
        let mut builder =
            object_store::aws::AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = region {
            builder = builder.with_region(region);
        }
        Ok(Self::new(Arc::new(builder.build()?), format!("s3://{bucket}")))
    }

    fn object_path(name: &str) -> ObjectPath {
        if name.ends_with(CSV_SUFFIX) {
            ObjectPath::from(name)
        } else {
            ObjectPath::from(format!("{name}{CSV_SUFFIX}"))
        }
    }

    async fn list_all(&self) -> Result<Vec<ObjectMeta>> {
        Ok(self.store.list(None).try_collect().await?)
    }
}

#[async_trait]
impl TabularSource for ObjectStoreSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn read_dataset(&self, name: &str) -> Result<Dataset> {
        validate_name(name)?;
        let path = Self::object_path(name);
        log::info!("[{}] Reading {path}", self.label);
        let bytes = match self.store.get(&path).await {
            Ok(result) => result.bytes().await?,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(SourceError::NotFound(name.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        let dataset = read_csv(&bytes)?;
        if dataset.columns().is_empty() {
            log::warn!("[{}] {path} is empty", self.label);
        } else {
            log::info!(
                "[{}] Read {} rows and {} columns from {path}",
                self.label,
                dataset.len(),
                dataset.columns().len()
            );
        }
        Ok(dataset)
    }

    async fn write_dataset(&self, dataset: &Dataset, name: &str) -> Result<()> {
        validate_name(name)?;
        let path = Self::object_path(name);
        let bytes = write_csv(dataset)?;
        self.store.put(&path, PutPayload::from(bytes)).await?;
        log::info!("[{}] Wrote {} rows to {path}", self.label, dataset.len());
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        match self.store.head(&Self::object_path(name)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .list_all()
            .await?
            .into_iter()
            .filter_map(|meta| {
                meta.location
                    .as_ref()
                    .strip_suffix(CSV_SUFFIX)
                    .map(str::to_string)
            })
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn ping(&self) -> Result<()> {
        self.store.list(None).try_next().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reports_dataset::Value;

    #[test]
    fn object_path_appends_csv_suffix_once() {
        assert_eq!(
            ObjectStoreSource::object_path("customer_locations").as_ref(),
            "customer_locations.csv"
        );
        assert_eq!(
            ObjectStoreSource::object_path("report.csv").as_ref(),
            "report.csv"
        );
    }

    #[tokio::test]
    async fn write_then_read_in_memory() {
        let source = ObjectStoreSource::in_memory();
        let dataset = Dataset::from_rows(
            vec!["Location".into(), "Customer".into()],
            vec![vec![Value::text("ams"), Value::text("Acme")]],
        )
        .unwrap();
        source.write_dataset(&dataset, "customer_locations").await.unwrap();

        assert!(source.exists("customer_locations").await.unwrap());
        assert!(!source.exists("nope").await.unwrap());
        assert_eq!(source.read_dataset("customer_locations").await.unwrap(), dataset);
        assert_eq!(
            source.list("customer").await.unwrap(),
            vec!["customer_locations".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let source = ObjectStoreSource::in_memory();
        let err = source.read_dataset("combined_vhosts_reports").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
