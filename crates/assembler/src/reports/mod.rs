//! Per-kind report bodies. Each function receives inputs that already passed
//! their declaration check.

pub(crate) mod inventory;
pub(crate) mod monthly;
pub(crate) mod statistics;

use crate::assembler::{Inputs, Loaded};
use crate::error::Result;
use crate::filters::ReportFilters;
use crate::kind::{ReportKind, CUSTOMER_LOCATIONS};
use crate::output::{DegradedReason, Facets, ReportOutput};
use crate::schema::{
    CUSTOMER, EXCLUDED_LOCATION, EXCLUDED_NETWORK, LOCATION, NETWORK, REFERENCE_LOCATION,
};
use reports_dataset::{Dataset, JoinSpec, Value};
use std::collections::HashSet;

pub(crate) const CUSTOMER_COLUMN: &str = "Customer";

fn missing(kind: ReportKind, dataset: &str) -> ReportOutput {
    ReportOutput::degraded(
        kind,
        DegradedReason::MissingDataset {
            dataset: dataset.to_string(),
        },
    )
}

fn primary_name(kind: ReportKind) -> &'static str {
    kind.inputs().first().map_or("", |input| input.name)
}

/// Customers and locations listed by the reference dataset, sorted.
pub(crate) fn reference_facets(reference: Option<&Loaded>) -> Facets {
    let Some(reference) = reference else {
        return Facets::default();
    };
    Facets {
        customers: reference
            .schema
            .get(&CUSTOMER)
            .map(|c| reference.dataset.distinct_sorted(c))
            .unwrap_or_default(),
        locations: reference
            .schema
            .get(&REFERENCE_LOCATION)
            .map(|c| reference.dataset.distinct_sorted(c))
            .unwrap_or_default(),
        report_names: Vec::new(),
    }
}

/// Attaches `Customer` from the reference dataset by location. Every row is
/// kept exactly once; existing customer values are not overwritten.
pub fn enrich_with_customer(
    dataset: &Dataset,
    location_column: &str,
    reference: &Dataset,
    reference_location: &str,
    reference_customer: &str,
) -> Result<Dataset> {
    Ok(dataset.left_join(
        reference,
        &JoinSpec {
            on: vec![(location_column, reference_location)],
            attach: vec![(reference_customer, CUSTOMER_COLUMN)],
            fill: Value::Null,
        },
    )?)
}

/// Drops rows whose exact (network, location) pair is listed in `exclusions`.
/// Rows with a null network or location are kept.
pub fn exclude_pairs(
    dataset: &Dataset,
    network: &str,
    location: &str,
    exclusions: &Dataset,
    excluded_network: &str,
    excluded_location: &str,
) -> Dataset {
    let excluded: HashSet<(String, String)> = exclusions
        .rows()
        .filter_map(|row| {
            Some((
                row.value(excluded_network).key()?,
                row.value(excluded_location).key()?,
            ))
        })
        .collect();
    dataset.filter(|row| match (row.value(network).key(), row.value(location).key()) {
        (Some(net), Some(loc)) => !excluded.contains(&(net, loc)),
        _ => true,
    })
}

pub(crate) fn passthrough(kind: ReportKind, inputs: &Inputs) -> ReportOutput {
    match inputs.primary() {
        Some(primary) => ReportOutput::complete(kind, primary.dataset.to_records(), Facets::default()),
        None => missing(kind, primary_name(kind)),
    }
}

pub(crate) fn firmware(inputs: &Inputs) -> Result<ReportOutput> {
    let kind = ReportKind::Firmware;
    let Some(primary) = inputs.primary() else {
        return Ok(missing(kind, primary_name(kind)));
    };
    let Some(reference) = inputs.get(CUSTOMER_LOCATIONS) else {
        return Ok(missing(kind, CUSTOMER_LOCATIONS));
    };
    let (Some(location), Some(reference_location)) = (
        primary.schema.get(&LOCATION),
        reference.schema.get(&REFERENCE_LOCATION),
    ) else {
        return Ok(missing(kind, primary.name));
    };

    let rows = match reference.schema.get(&CUSTOMER) {
        Some(customer) => enrich_with_customer(
            &primary.dataset,
            location,
            &reference.dataset,
            reference_location,
            customer,
        )?,
        None => {
            log::warn!("{CUSTOMER_LOCATIONS} has no customer column; firmware rows stay unenriched");
            primary.dataset.clone()
        }
    };
    Ok(ReportOutput::complete(
        kind,
        rows.to_records(),
        reference_facets(Some(reference)),
    ))
}

pub(crate) fn vinfo(inputs: &Inputs) -> ReportOutput {
    let kind = ReportKind::Vinfo;
    let Some(primary) = inputs.primary() else {
        return missing(kind, primary_name(kind));
    };
    let facet = |column: Option<&str>| {
        column
            .map(|c| primary.dataset.distinct_sorted(c))
            .unwrap_or_default()
    };
    let facets = Facets {
        customers: facet(primary.schema.get(&CUSTOMER)),
        locations: facet(primary.schema.get(&LOCATION)),
        report_names: Vec::new(),
    };
    ReportOutput::complete(kind, primary.dataset.to_records(), facets)
}

pub(crate) fn network_utilization(inputs: &Inputs) -> ReportOutput {
    let kind = ReportKind::NetworkUtilization;
    let Some(primary) = inputs.primary() else {
        return missing(kind, primary_name(kind));
    };
    let columns = (primary.schema.get(&NETWORK), primary.schema.get(&LOCATION));
    let exclusions = inputs.get("excluded_networks");

    let rows = match (columns, exclusions) {
        ((Some(network), Some(location)), Some(excluded)) => {
            match (
                excluded.schema.get(&EXCLUDED_NETWORK),
                excluded.schema.get(&EXCLUDED_LOCATION),
            ) {
                (Some(ex_network), Some(ex_location)) => {
                    let kept = exclude_pairs(
                        &primary.dataset,
                        network,
                        location,
                        &excluded.dataset,
                        ex_network,
                        ex_location,
                    );
                    log::info!(
                        "Excluded {} network rows",
                        primary.dataset.len() - kept.len()
                    );
                    kept
                }
                _ => primary.dataset.clone(),
            }
        }
        ((None, _) | (_, None), Some(_)) => {
            log::warn!("Network utilization report lacks Network/Location columns; exclusions skipped");
            primary.dataset.clone()
        }
        _ => primary.dataset.clone(),
    };
    ReportOutput::complete(kind, rows.to_records(), reference_facets(inputs.reference()))
}

pub(crate) fn with_reference_facets(kind: ReportKind, inputs: &Inputs) -> ReportOutput {
    let Some(primary) = inputs.primary() else {
        return missing(kind, primary_name(kind));
    };
    ReportOutput::complete(
        kind,
        primary.dataset.to_records(),
        reference_facets(inputs.reference()),
    )
}

pub(crate) fn alerts(inputs: &Inputs, filters: &ReportFilters) -> ReportOutput {
    let kind = ReportKind::Alerts;
    let Some(primary) = inputs.primary() else {
        return missing(kind, primary_name(kind));
    };
    let location_column = primary.schema.get(&LOCATION);
    let rows = match (filters.location(), location_column) {
        (Some(wanted), Some(column)) => primary
            .dataset
            .filter(|row| row.value(column).key().as_deref() == Some(wanted)),
        _ => primary.dataset.clone(),
    };
    let facets = Facets {
        locations: location_column
            .map(|c| primary.dataset.distinct_sorted(c))
            .unwrap_or_default(),
        ..Facets::default()
    };
    ReportOutput::complete(kind, rows.to_records(), facets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reports_dataset::read_csv;

    #[test]
    fn exclusion_removes_exact_pairs_only() {
        let data = read_csv(b"Network,Location,Util\nnet1,loc1,10\nnet1,loc2,20\nnet2,loc1,30\n,loc1,40\n").unwrap();
        let exclusions = read_csv(b"Network,Location\nnet1,loc1\n").unwrap();

        let kept = exclude_pairs(&data, "Network", "Location", &exclusions, "Network", "Location");
        let pairs: Vec<(String, String)> = kept
            .rows()
            .map(|r| (r.value("Network").to_string(), r.value("Location").to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("net1".to_string(), "loc2".to_string()),
                ("net2".to_string(), "loc1".to_string()),
                ("".to_string(), "loc1".to_string()),
            ]
        );
    }

    #[test]
    fn enrichment_keeps_each_row_once_and_fills_gaps() {
        let data = read_csv(b"Server,Location,Customer\ns1,ams,\ns2,ber,Given\ns3,osl,\n").unwrap();
        let reference = read_csv(b"location,Customer\nams,Acme\nams,Dup\nber,Beta\n").unwrap();

        let enriched =
            enrich_with_customer(&data, "Location", &reference, "location", "Customer").unwrap();
        let customers: Vec<Value> = enriched
            .column_values("Customer")
            .unwrap()
            .cloned()
            .collect();
        assert_eq!(
            customers,
            vec![Value::text("Acme"), Value::text("Given"), Value::Null]
        );
        assert_eq!(enriched.len(), 3);
    }
}
