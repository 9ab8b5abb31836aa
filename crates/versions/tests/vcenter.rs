use pretty_assertions::assert_eq;
use reports_dataset::{read_csv, Value};
use reports_versions::{catalog_dataset, Correlator, Product, StaticFetcher, LABEL_COLUMN};
use std::sync::Arc;

const KB_URL: &str = "https://kb.example/vcenter";

const PAGE: &str = r#"
<h2>vCenter Server 8.0</h2>
<table>
  <tr><th>Name</th><th>Version</th><th>Release Date</th><th>Build Number</th><th>Build</th></tr>
  <tr><td>vCenter Server 8.0 Update 3</td><td>8.0.3</td><td>2024-06-25</td><td>24022515</td><td>24022515</td></tr>
  <tr><td>vCenter Server 8.0 Update 2</td><td>8.0.2</td><td>2023-09-21</td><td>22385739</td><td>22385739</td></tr>
</table>
<h2>vCenter Server 7.0</h2>
<table>
  <tr><th>Name</th><th>Version</th><th>Release Date</th><th>Build Number</th><th>Build</th></tr>
  <tr><td>vCenter Server 7.0 Update 3r</td><td>7.0.3</td><td>2024-06-18</td><td>24026615</td><td>24026615</td></tr>
</table>
"#;

#[tokio::test]
async fn vcenter_inventory_is_labelled_per_table() {
    let inventory = read_csv(
        b"VM,VI SDK Server type,Location\n\
          ams-vcs001,VMware vCenter Server 8.0.2 build-22385739,ams\n\
          ber-vcs001,VMware vCenter Server 7.0.3 build-24026615,ber\n\
          ber-vcs002,VMware vCenter Server 6.7.0 build-1,ber\n",
    )
    .unwrap();

    let fetcher = Arc::new(StaticFetcher::new().with_page(KB_URL, PAGE));
    let correlator = Correlator::new(fetcher).unwrap();
    let result = correlator
        .correlate(&inventory, KB_URL, Product::Vcenter)
        .await
        .unwrap();

    let labels: Vec<Value> = result.rows.column_values(LABEL_COLUMN).unwrap().cloned().collect();
    assert_eq!(
        labels,
        vec![Value::text("N-1"), Value::text("N"), Value::text("NoLabel")]
    );

    let catalog = catalog_dataset(&result.catalog, Product::Vcenter).unwrap();
    let records = catalog.to_records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["Release Name"], Value::text("vCenter Server 8.0 Update 3"));
    assert_eq!(records[2]["Label"], Value::text("N"));
    assert_eq!(records[2]["Major_Minor_Version"], Value::text("7.0"));
}
