use crate::assembler::Inputs;
use crate::kind::ReportKind;
use crate::output::{DegradedReason, Facets, ReportOutput};
use crate::schema::{CRITICAL, IMMEDIATE, STAT_CUSTOMER, STAT_DATE, STAT_LOCATION, TOTAL, WARNING};
use chrono::NaiveDateTime;
use reports_dataset::{value_to_datetime, Dataset, Record, ResolvedSchema, Value, DATE_FORMAT};
use serde::Serialize;
use std::collections::HashMap;

pub const INCREASE_COLOR: &str = "#f8d7da";
pub const DECREASE_COLOR: &str = "#d4edda";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increase,
    Decrease,
    Unchanged,
}

impl Trend {
    fn from_diff(diff: Option<i64>) -> Self {
        match diff {
            Some(d) if d > 0 => Trend::Increase,
            Some(d) if d < 0 => Trend::Decrease,
            _ => Trend::Unchanged,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increase => "increase",
            Trend::Decrease => "decrease",
            Trend::Unchanged => "unchanged",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Trend::Increase => INCREASE_COLOR,
            Trend::Decrease => DECREASE_COLOR,
            Trend::Unchanged => "",
        }
    }
}

/// One alert-count reading.
#[derive(Debug, Clone)]
struct Reading {
    customer: Option<Value>,
    date: Option<NaiveDateTime>,
    location: Value,
    critical: i64,
    immediate: i64,
    warning: i64,
    total: i64,
}

impl Reading {
    fn record(&self, diff: Option<i64>) -> Record {
        let trend = Trend::from_diff(diff);
        let customer = match &self.customer {
            Some(v) if !v.is_null() => v.clone(),
            _ => Value::text("Unknown"),
        };
        let date = self.date.map_or_else(
            || Value::text("Missing"),
            |d| Value::text(d.format(DATE_FORMAT).to_string()),
        );
        let mut record = Record::new();
        record.insert("customer".into(), customer);
        record.insert("date".into(), date);
        record.insert("location".into(), self.location.clone());
        record.insert("critical".into(), Value::Int(self.critical));
        record.insert("immediate".into(), Value::Int(self.immediate));
        record.insert("warning".into(), Value::Int(self.warning));
        record.insert("total".into(), Value::Int(self.total));
        record.insert("trend".into(), Value::text(trend.as_str()));
        record.insert("color".into(), Value::text(trend.color()));
        record
    }
}

fn readings(dataset: &Dataset, schema: &ResolvedSchema, date: &str, location: &str) -> Vec<Reading> {
    let count = |row: &reports_dataset::RowRef<'_>, column| {
        schema
            .get(column)
            .and_then(|c| row.value(c).as_i64())
            .unwrap_or(0)
    };
    let customer = schema.get(&STAT_CUSTOMER);
    dataset
        .rows()
        .map(|row| Reading {
            customer: customer.map(|c| row.value(c).clone()),
            date: value_to_datetime(row.value(date)),
            location: row.value(location).clone(),
            critical: count(&row, &CRITICAL),
            immediate: count(&row, &IMMEDIATE),
            warning: count(&row, &WARNING),
            total: count(&row, &TOTAL),
        })
        .collect()
}

/// Latest reading per location, tagged with the change in critical alerts
/// against the reading before it. Readings with unparseable dates sort after
/// dated ones and count as "Missing".
fn latest_per_location(readings: Vec<Reading>) -> Vec<Record> {
    let mut groups: Vec<(Option<String>, Vec<Reading>)> = Vec::new();
    let mut index: HashMap<Option<String>, usize> = HashMap::new();
    for reading in readings {
        let key = reading.location.key();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(reading);
    }

    let mut latest: Vec<(Option<NaiveDateTime>, Record)> = Vec::new();
    for (_, mut group) in groups {
        // Ascending, undated last; stable so equal dates keep input order.
        group.sort_by_key(|r| (r.date.is_none(), r.date));
        let pick = group
            .iter()
            .rposition(|r| r.date.is_some())
            .unwrap_or(group.len() - 1);
        let diff = pick
            .checked_sub(1)
            .map(|prev| group[pick].critical - group[prev].critical);
        latest.push((group[pick].date, group[pick].record(diff)));
    }
    // Newest first, undated last.
    latest.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    latest.into_iter().map(|(_, record)| record).collect()
}

pub(crate) fn assemble(inputs: &Inputs) -> ReportOutput {
    let kind = ReportKind::Statistics;
    let Some(primary) = inputs.primary() else {
        return ReportOutput::degraded(
            kind,
            DegradedReason::MissingDataset {
                dataset: "vrops_alerts_historical".into(),
            },
        );
    };
    let (Some(date), Some(location)) = (
        primary.schema.get(&STAT_DATE),
        primary.schema.get(&STAT_LOCATION),
    ) else {
        return ReportOutput::degraded(
            kind,
            DegradedReason::MissingColumns {
                dataset: primary.name.into(),
                columns: vec!["date".into(), "location".into()],
            },
        );
    };

    let rows = latest_per_location(readings(&primary.dataset, &primary.schema, date, location));
    let facets = Facets {
        locations: primary.dataset.distinct_sorted(location),
        ..Facets::default()
    };
    ReportOutput::complete(kind, rows, facets)
}
