use crate::assembler::Inputs;
use crate::error::Result;
use crate::filters::ReportFilters;
use crate::kind::ReportKind;
use crate::output::{DegradedReason, Facets, ReportOutput};
use crate::schema::{MONTHLY_CUSTOMER, MONTHLY_LOCATION, REFERENCE_LOCATION, REPORT_NAME};
use reports_dataset::Dataset;

const MISSING_MARKER: &str = "Missing";

/// Rows of the monthly delivery report narrowed by customer, location and
/// report name. With `exclude_missing`, rows mentioning "Missing" in any text
/// cell are dropped.
pub fn filter_monthly(
    report: &Dataset,
    filters: &ReportFilters,
    customer: &str,
    location: &str,
    report_name: &str,
) -> Dataset {
    let wanted = [
        (customer, filters.customer()),
        (location, filters.location()),
        (report_name, filters.report()),
    ];
    report.filter(|row| {
        let selected = wanted.iter().all(|(column, value)| match value {
            Some(value) => row.value(column).key().as_deref() == Some(*value),
            None => true,
        });
        let complete = !filters.exclude_missing
            || !row
                .cells()
                .iter()
                .filter_map(|cell| cell.as_text())
                .any(|text| text.contains(MISSING_MARKER));
        selected && complete
    })
}

pub(crate) fn assemble(inputs: &Inputs, filters: &ReportFilters) -> Result<ReportOutput> {
    let kind = ReportKind::Monthly;
    let period = filters.period()?;
    let Some(report) = inputs.primary() else {
        return Ok(ReportOutput::degraded(
            kind,
            DegradedReason::MissingDataset {
                dataset: "report".into(),
            },
        ));
    };
    let (Some(customer), Some(location), Some(report_name)) = (
        report.schema.get(&MONTHLY_CUSTOMER),
        report.schema.get(&MONTHLY_LOCATION),
        report.schema.get(&REPORT_NAME),
    ) else {
        return Ok(ReportOutput::degraded(
            kind,
            DegradedReason::MissingColumns {
                dataset: report.name.into(),
                columns: vec!["customer".into(), "location".into(), "report name".into()],
            },
        ));
    };

    let rows = filter_monthly(&report.dataset, filters, customer, location, report_name);
    let locations = inputs
        .reference()
        .and_then(|r| {
            r.schema
                .get(&REFERENCE_LOCATION)
                .map(|c| r.dataset.distinct_sorted(c))
        })
        .unwrap_or_default();
    let facets = Facets {
        customers: report.dataset.distinct_sorted(customer),
        locations,
        report_names: report.dataset.distinct_sorted(report_name),
    };
    let frequencies = inputs
        .get("frequencies")
        .map(|f| f.dataset.to_records())
        .unwrap_or_default();

    let mut output = ReportOutput::complete(kind, rows.to_records(), facets);
    output.frequencies = frequencies;
    output.period = Some(period);
    Ok(output)
}
