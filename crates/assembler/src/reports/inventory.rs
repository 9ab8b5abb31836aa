use crate::assembler::Inputs;
use crate::error::Result;
use crate::kind::ReportKind;
use crate::output::{DegradedReason, Facets, ReportOutput};
use crate::schema::{INVENTORY_IDENTITY, REPORT_DATE};
use reports_dataset::{resolve, value_to_datetime, Dataset, Value};

pub const REPORT_DATE_COLUMN: &str = "Report Date";

/// Rewrites the report date column under `Report Date` as calendar dates, so
/// readings from the same day deduplicate. Unparseable dates become null.
pub fn normalize_report_dates(dataset: &mut Dataset) -> Result<()> {
    let Some(source) = resolve(dataset.columns(), REPORT_DATE.variants) else {
        return Ok(());
    };
    let values = dataset
        .rows()
        .map(|row| {
            value_to_datetime(row.value(source)).map_or(Value::Null, |dt| Value::Date(dt.date()))
        })
        .collect();
    dataset.set_column(REPORT_DATE_COLUMN, values)?;
    Ok(())
}

/// Concatenation of both inventories, date-normalized, with repeated
/// (Customer, Location, Report Date, VM, Name) entries removed; the first
/// occurrence wins. Only the identity columns present take part.
pub fn merge_inventories(parts: &[&Dataset]) -> Result<Dataset> {
    let mut merged = parts
        .iter()
        .fold(Dataset::empty(), |acc, part| acc.concat(part));
    normalize_report_dates(&mut merged)?;
    let identity: Vec<&str> = INVENTORY_IDENTITY
        .iter()
        .copied()
        .filter(|c| merged.has_column(c))
        .collect();
    if identity.is_empty() {
        return Ok(merged);
    }
    let before = merged.len();
    let deduped = merged.dedup_by(&identity)?;
    log::debug!(
        "Environment inventory dedup on {identity:?}: {before} -> {} rows",
        deduped.len()
    );
    Ok(deduped)
}

pub(crate) fn env_versions(inputs: &Inputs) -> Result<ReportOutput> {
    let kind = ReportKind::EnvVersions;
    let parts: Vec<&Dataset> = inputs.iter().map(|l| &l.dataset).collect();
    if parts.is_empty() {
        let names: Vec<&str> = kind.inputs().iter().map(|i| i.name).collect();
        return Ok(ReportOutput::degraded(
            kind,
            DegradedReason::EmptyDataset {
                dataset: names.join(", "),
            },
        ));
    }
    let merged = merge_inventories(&parts)?;
    Ok(ReportOutput::complete(kind, merged.to_records(), Facets::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use reports_dataset::read_csv;

    #[test]
    fn merge_truncates_times_and_dedups() {
        let non_vcf = read_csv(
            b"Customer,Location,Report Date,VM,Version\n\
              Acme,ams,2024-05-01 08:00:00,vc01,8.0\n\
              Acme,ams,2024-05-01 17:30:00,vc01,8.0\n",
        )
        .unwrap();
        let vcf = read_csv(
            b"Customer,Location,Report Date,Name,Version\n\
              Acme,ams,2024-05-01,sddc,5.1\n\
              Acme,ams,garbage,sddc,5.1\n",
        )
        .unwrap();

        let merged = merge_inventories(&[&non_vcf, &vcf]).unwrap();
        let dates: Vec<Value> = merged
            .column_values(REPORT_DATE_COLUMN)
            .unwrap()
            .cloned()
            .collect();
        let day = Value::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(dates, vec![day.clone(), day, Value::Null]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn dedup_is_idempotent() {
        let data = read_csv(b"Customer,VM,Report Date\nA,vm1,2024-01-01\nA,vm1,2024-01-01\nB,vm2,2024-01-01\n").unwrap();
        let once = merge_inventories(&[&data]).unwrap();
        let twice = merge_inventories(&[&once]).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn date_only_inputs_become_dates() {
        let mut data = read_csv(b"date,VM\n2024-01-01,vm1\n").unwrap();
        normalize_report_dates(&mut data).unwrap();
        assert_eq!(
            data.row(0).unwrap().value(REPORT_DATE_COLUMN),
            &Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(data.columns(), ["date", "VM", "Report Date"]);
    }
}
