use crate::dataset::Dataset;
use crate::error::Result;
use crate::value::Value;
use std::collections::HashMap;

/// Parses CSV bytes (header row first, `"` quoting). Blank input is an empty
/// dataset rather than an error. Short rows are padded with nulls; surplus
/// cells are dropped.
pub fn read_csv(bytes: &[u8]) -> Result<Dataset> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Dataset::empty());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quote(b'"')
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let columns = dedupe_headers(headers.iter());
    let width = columns.len();
    let mut dataset = Dataset::new(columns)?;

    let mut truncated = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) && record.len() <= 1 {
            continue;
        }
        if record.len() > width {
            truncated += 1;
        }
        let row: Vec<Value> = (0..width)
            .map(|i| record.get(i).map_or(Value::Null, Value::infer))
            .collect();
        dataset.push_row(row)?;
    }
    if truncated > 0 {
        log::warn!("CSV input had {truncated} rows wider than its header; extra cells dropped");
    }
    Ok(dataset)
}

/// Serializes a dataset to CSV with a header row. Nulls become empty cells.
pub fn write_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if !dataset.columns().is_empty() {
        writer.write_record(dataset.columns())?;
    }
    for row in dataset.rows() {
        writer.write_record(row.cells().iter().map(|v| v.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| crate::error::DatasetError::Io(err.into_error()))
}

/// Repeated header names get a numeric suffix (`name.1`, `name.2`, ...).
fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for raw in headers {
        let name = raw.to_string();
        let count = counts.entry(name.clone()).or_insert(0);
        if *count == 0 {
            out.push(name);
        } else {
            out.push(format!("{name}.{count}"));
        }
        *count += 1;
    }
    out
}
