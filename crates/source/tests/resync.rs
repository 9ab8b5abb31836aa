use async_trait::async_trait;
use pretty_assertions::assert_eq;
use reports_dataset::{read_csv, Dataset};
use reports_source::{
    resync, ObjectStoreSource, ResyncStatus, Result, SourceError, SqliteSource, TabularSource,
};

/// Mirror whose writes to one table always fail.
struct FailingWrites {
    inner: SqliteSource,
    poisoned: &'static str,
}

#[async_trait]
impl TabularSource for FailingWrites {
    fn describe(&self) -> String {
        format!("failing({})", self.inner.describe())
    }

    async fn read_dataset(&self, name: &str) -> Result<Dataset> {
        self.inner.read_dataset(name).await
    }

    async fn write_dataset(&self, dataset: &Dataset, name: &str) -> Result<()> {
        if name == self.poisoned {
            return Err(SourceError::Other(format!("disk full while writing {name}")));
        }
        self.inner.write_dataset(dataset, name).await
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        self.inner.exists(name).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

fn csv(text: &str) -> Dataset {
    read_csv(text.as_bytes()).expect("csv")
}

#[tokio::test]
async fn partial_failure_keeps_earlier_tables_and_names_the_failed_one() {
    let bucket = ObjectStoreSource::in_memory();
    bucket
        .write_dataset(&csv("Host,Location\nesx01,ams\n"), "a")
        .await
        .unwrap();
    bucket
        .write_dataset(&csv("VM,Location\nvm-new,ber\n"), "b")
        .await
        .unwrap();

    let mirror = FailingWrites {
        inner: SqliteSource::open_in_memory().unwrap(),
        poisoned: "b",
    };
    let stale_b = csv("VM,Location\nvm-old,ber\n");
    mirror.inner.write_dataset(&stale_b, "b").await.unwrap();

    let report = resync(&bucket, &mirror, &["a".to_string(), "b".to_string()]).await;

    assert_eq!(report.status, ResyncStatus::Failed);
    assert_eq!(report.refreshed, vec!["a".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].table, "b");
    assert!(report.summary().contains("b"));

    let a = mirror.read_dataset("a").await.unwrap();
    assert_eq!(a, csv("Host,Location\nesx01,ams\n"));
    assert_eq!(mirror.read_dataset("b").await.unwrap(), stale_b);
}

#[tokio::test]
async fn missing_and_empty_sources_do_not_clobber_the_mirror() {
    let bucket = ObjectStoreSource::in_memory();
    bucket
        .write_dataset(&csv("Network,Location\n"), "excluded_networks")
        .await
        .unwrap();
    let mirror = SqliteSource::open_in_memory().unwrap();
    let previous = csv("Network,Location\nnet1,ams\n");
    mirror
        .write_dataset(&previous, "excluded_networks")
        .await
        .unwrap();

    let report = resync(
        &bucket,
        &mirror,
        &["excluded_networks".to_string(), "report".to_string()],
    )
    .await;

    assert_eq!(report.skipped, vec!["excluded_networks".to_string()]);
    assert_eq!(report.failed[0].table, "report");
    assert!(!report.is_success());
    assert_eq!(
        mirror.read_dataset("excluded_networks").await.unwrap(),
        previous
    );
}

#[tokio::test]
async fn local_directory_source_reads_csv_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("customer_locations.csv"),
        "location,Customer\nams,Acme\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("empty.csv"), "").unwrap();

    let source = ObjectStoreSource::local(dir.path()).unwrap();
    let dataset = source.read_dataset("customer_locations").await.unwrap();
    assert_eq!(dataset.len(), 1);
    assert!(source.read_dataset("empty").await.unwrap().is_empty());
    assert_eq!(
        source.list("").await.unwrap(),
        vec!["customer_locations".to_string(), "empty".to_string()]
    );
}
