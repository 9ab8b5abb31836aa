use pretty_assertions::assert_eq;
use reports_assembler::{
    DegradedReason, KnowledgeBaseUrls, ReportAssembler, ReportFilters, ReportKind, ReportOutput,
    ReportStatus, VersionReport, VersionReporter, VersionView,
};
use reports_dataset::{read_csv, Value};
use reports_source::{ObjectStoreSource, TabularSource};
use reports_versions::{Correlator, StaticFetcher};
use std::sync::Arc;

async fn source_with(tables: &[(&str, &str)]) -> Arc<ObjectStoreSource> {
    let source = ObjectStoreSource::in_memory();
    for (name, csv) in tables {
        source
            .write_dataset(&read_csv(csv.as_bytes()).unwrap(), name)
            .await
            .unwrap();
    }
    Arc::new(source)
}

const CUSTOMER_LOCATIONS: &str = "location,Customer\nams,Acme\nber,Beta\nosl,Acme\n";

#[tokio::test]
async fn empty_source_gives_empty_rows_and_facets_for_every_report() {
    let assembler = ReportAssembler::new(Arc::new(ObjectStoreSource::in_memory()));
    for kind in ReportKind::ALL {
        let output = assembler
            .assemble(kind, &ReportFilters::default())
            .await
            .unwrap();
        assert!(output.rows.is_empty(), "{kind} returned rows");
        assert!(output.facets.customers.is_empty(), "{kind} returned customers");
        assert!(output.facets.locations.is_empty(), "{kind} returned locations");
        assert!(output.is_degraded(), "{kind} claimed to be complete");
    }
}

#[tokio::test]
async fn firmware_attaches_customer_by_location() {
    let source = source_with(&[
        (
            "combined_firmware_reports",
            "Server,Location,Firmware\nsrv1,ams,1.2\nsrv2,ber,1.3\nsrv3,lon,1.1\n",
        ),
        ("customer_locations", CUSTOMER_LOCATIONS),
    ])
    .await;
    let output = ReportAssembler::new(source)
        .assemble(ReportKind::Firmware, &ReportFilters::default())
        .await
        .unwrap();

    assert_eq!(output.status, ReportStatus::Complete);
    let customers: Vec<Value> = output.rows.iter().map(|r| r["Customer"].clone()).collect();
    assert_eq!(
        customers,
        vec![Value::text("Acme"), Value::text("Beta"), Value::Null]
    );
    assert_eq!(output.facets.customers, vec!["Acme", "Beta"]);
    assert_eq!(output.facets.locations, vec!["ams", "ber", "osl"]);
}

#[tokio::test]
async fn firmware_without_location_column_degrades() {
    let source = source_with(&[
        ("combined_firmware_reports", "Server,Site\nsrv1,ams\n"),
        ("customer_locations", CUSTOMER_LOCATIONS),
    ])
    .await;
    let output = ReportAssembler::new(source)
        .assemble(ReportKind::Firmware, &ReportFilters::default())
        .await
        .unwrap();

    assert_eq!(
        output.status,
        ReportStatus::Degraded {
            reason: DegradedReason::MissingColumns {
                dataset: "combined_firmware_reports".into(),
                columns: vec!["Location".into()],
            }
        }
    );
    assert!(output.rows.is_empty());
}

#[tokio::test]
async fn network_utilization_drops_excluded_pairs() {
    let source = source_with(&[
        (
            "combined_network_utilization_report",
            "Network,Location,Utilization\nnet1,loc1,90\nnet1,loc2,40\n",
        ),
        ("excluded_networks", "Network,Location\nnet1,loc1\n"),
        ("customer_locations", CUSTOMER_LOCATIONS),
    ])
    .await;
    let output = ReportAssembler::new(source)
        .assemble(ReportKind::NetworkUtilization, &ReportFilters::default())
        .await
        .unwrap();

    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.rows[0]["Location"], Value::text("loc2"));
    assert_eq!(output.facets.customers, vec!["Acme", "Beta"]);
}

#[tokio::test]
async fn network_utilization_without_exclusions_keeps_everything() {
    let source = source_with(&[(
        "combined_network_utilization_report",
        "Network,Location\nnet1,loc1\n",
    )])
    .await;
    let output = ReportAssembler::new(source)
        .assemble(ReportKind::NetworkUtilization, &ReportFilters::default())
        .await
        .unwrap();

    assert_eq!(output.status, ReportStatus::Complete);
    assert_eq!(output.rows.len(), 1);
    assert!(output.facets.locations.is_empty());
}

#[tokio::test]
async fn reference_facets_are_independent() {
    let source = source_with(&[
        (
            "combined_certificate_expiry_reports",
            "Host,Expires
vc01,2025-01-01
",
        ),
        ("customer_locations", "Customer,Region
Beta,us
Acme,eu
"),
    ])
    .await;
    let output = ReportAssembler::new(source)
        .assemble(ReportKind::CertificateExpiry, &ReportFilters::default())
        .await
        .unwrap();

    assert_eq!(output.status, ReportStatus::Complete);
    assert_eq!(output.facets.customers, vec!["Acme", "Beta"]);
    assert!(output.facets.locations.is_empty());
}

#[tokio::test]
async fn vinfo_without_location_degrades_instead_of_failing() {
    let source = source_with(&[("rvtools_vinfo", "VM,Customer\nvm1,Acme\n")]).await;
    let output = ReportAssembler::new(source)
        .assemble(ReportKind::Vinfo, &ReportFilters::default())
        .await
        .unwrap();
    assert!(output.is_degraded());
}

#[tokio::test]
async fn alerts_filter_by_exact_location() {
    let source = source_with(&[(
        "combined_vrops_list_of_alerts",
        "Alert,Location\ncpu,ams\ndisk,ber\nmem,ams\n",
    )])
    .await;
    let assembler = ReportAssembler::new(source);

    let all = assembler
        .assemble(ReportKind::Alerts, &ReportFilters::default())
        .await
        .unwrap();
    assert_eq!(all.rows.len(), 3);

    let ams = assembler
        .assemble(ReportKind::Alerts, &ReportFilters::default().with_location("ams"))
        .await
        .unwrap();
    let alerts: Vec<String> = ams.rows.iter().map(|r| r["Alert"].to_string()).collect();
    assert_eq!(alerts, vec!["cpu", "mem"]);
}

#[tokio::test]
async fn statistics_summarizes_latest_reading() {
    let source = source_with(&[(
        "vrops_alerts_historical",
        "date,location,customer,critical,immediate,warning,total\n\
         2024-02-01,ams,Acme,3,1,1,5\n\
         2024-02-02,ams,Acme,1,1,1,3\n",
    )])
    .await;
    let output = ReportAssembler::new(source)
        .assemble(ReportKind::Statistics, &ReportFilters::default())
        .await
        .unwrap();

    assert_eq!(output.rows.len(), 1);
    let row = &output.rows[0];
    assert_eq!(row["date"], Value::text("2024-02-02"));
    assert_eq!(row["trend"], Value::text("decrease"));
    assert_eq!(row["color"], Value::text("#d4edda"));
    assert_eq!(output.facets.locations, vec!["ams"]);
}

#[tokio::test]
async fn monthly_report_carries_period_and_frequencies() {
    let source = source_with(&[
        (
            "report",
            "customer,location,report name,status\nAcme,ams,vinfo,Delivered\nBeta,ber,vinfo,Missing\n",
        ),
        ("frequencies", "report name,frequency\nvinfo,monthly\n"),
        ("customer_locations", CUSTOMER_LOCATIONS),
    ])
    .await;
    let filters = ReportFilters {
        month: Some(2),
        year: Some(2024),
        exclude_missing: true,
        ..Default::default()
    };
    let output = ReportAssembler::new(source)
        .assemble(ReportKind::Monthly, &filters)
        .await
        .unwrap();

    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.facets.customers, vec!["Acme", "Beta"]);
    assert_eq!(output.facets.report_names, vec!["vinfo"]);
    assert_eq!(output.frequencies.len(), 1);
    let period = output.period.unwrap();
    assert_eq!(period.month_name, "February");

    let json = serde_json::to_value(&ReportOutput::degraded(
        ReportKind::Monthly,
        DegradedReason::EmptyDataset {
            dataset: "report".into(),
        },
    ))
    .unwrap();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["reason"]["kind"], "empty_dataset");
}

const KB: &str = "https://kb.example/esxi";

fn kb_page() -> String {
    let row = |v: &str, b: &str| {
        format!("<tr><td>ESXi</td><td>{v}</td><td>2024-01-01</td><td>{b}</td><td>ISO</td></tr>")
    };
    format!(
        "<table><tr><th>h</th></tr>{}{}</table>",
        row("ESXi 8.0 Update 3", "24022510"),
        row("ESXi 8.0 Update 2", "22380479")
    )
}

fn reporter(source: Arc<ObjectStoreSource>, fetcher: StaticFetcher) -> VersionReporter {
    VersionReporter::new(
        ReportAssembler::new(source),
        Correlator::new(Arc::new(fetcher)).unwrap(),
        KnowledgeBaseUrls {
            esxi: KB.into(),
            vcenter: "https://kb.example/vcenter".into(),
        },
    )
}

#[tokio::test]
async fn host_versions_are_labelled_and_filtered() {
    let source = source_with(&[(
        "combined_vhosts_reports",
        "Host,ESX Version,Location,Customer\n\
         esx01,VMware ESXi 8.0.3 build-24022510,ams,Acme\n\
         esx02,VMware ESXi 8.0.2 build-22380479,ber,Beta\n\
         esx03,VMware ESXi 7.0.3 build-1,ams,Acme\n",
    )])
    .await;
    let reporter = reporter(source, StaticFetcher::new().with_page(KB, kb_page()));

    let report = reporter
        .report(VersionView::Hosts, &ReportFilters::default().with_location("ams"))
        .await
        .unwrap();
    let VersionReport::Hosts {
        hosts_table_data,
        pie_chart_data,
        scraped_data,
    } = report
    else {
        panic!("expected hosts report");
    };
    let labels: Vec<String> = hosts_table_data.iter().map(|r| r["Label"].to_string()).collect();
    assert_eq!(labels, vec!["N", "NoLabel"]);
    assert_eq!(pie_chart_data.len(), 2);
    assert_eq!(scraped_data.len(), 2);
    assert_eq!(
        hosts_table_data[0].keys().cloned().collect::<Vec<_>>(),
        vec!["Host", "Version", "Build", "Location", "Customer", "Label"]
    );
}

#[tokio::test]
async fn host_versions_read_lowercase_location_and_customer() {
    let source = source_with(&[(
        "combined_vhosts_reports",
        "host,ESX Version,location,customer\n\
         esx01,VMware ESXi 8.0.2 build-22380479,ams,Acme\n",
    )])
    .await;
    let reporter = reporter(source, StaticFetcher::new().with_page(KB, kb_page()));

    let json = serde_json::to_value(
        reporter
            .report(VersionView::Hosts, &ReportFilters::default())
            .await
            .unwrap(),
    )
    .unwrap();
    let row = &json["hosts_table_data"][0];
    assert_eq!(row["Host"], "esx01");
    assert_eq!(row["Location"], "ams");
    assert_eq!(row["Customer"], "Acme");
    assert_eq!(row["Label"], "N-1");
}

#[tokio::test]
async fn vcenter_view_only_considers_appliances() {
    let source = source_with(&[(
        "rvtools_vinfo",
        "VM,VI SDK Server type,Location,Customer\n\
         ams-vcs001,VMware vCenter Server 8.0.2 build-22385739,ams,Acme\n\
         ams-web01,VMware vCenter Server 8.0.2 build-22385739,ams,Acme\n",
    )])
    .await;
    // No page registered: the scrape fails and everything is unlabelled.
    let reporter = reporter(source, StaticFetcher::new());

    let report = reporter
        .report(VersionView::Vcenter, &ReportFilters::default())
        .await
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["vcs_machines_data"].as_array().unwrap().len(), 1);
    assert_eq!(json["vcs_machines_data"][0]["Label"], "NoLabel");
    assert_eq!(json["vcenter_data"], serde_json::json!([]));
    assert_eq!(
        json["pie_chart_data"],
        serde_json::json!([{"Label": "NoLabel", "count": 1}])
    );
}

#[tokio::test]
async fn catalog_view_lists_releases_and_locations() {
    let source = source_with(&[("customer_locations", CUSTOMER_LOCATIONS)]).await;
    let reporter = reporter(source, StaticFetcher::new().with_page(KB, kb_page()));

    let json = serde_json::to_value(
        reporter
            .report(VersionView::Catalog, &ReportFilters::default())
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(json["table_data"][1]["Label"], "N-1");
    assert_eq!(json["table_data"][1]["Build Number"], "22380479");
    assert_eq!(json["locations"], serde_json::json!(["ams", "ber", "osl"]));
}
