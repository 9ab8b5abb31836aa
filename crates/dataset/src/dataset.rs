use crate::error::{DatasetError, Result};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// One output row, keyed by column name in dataset column order.
pub type Record = IndexMap<String, Value>;

/// Ordered rows sharing one header. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl<'a> RowRef<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.cells[idx])
    }

    /// Same as [`get`](Self::get) but treats an absent column as null.
    pub fn value(&self, column: &str) -> &'a Value {
        const NULL: &Value = &Value::Null;
        self.get(column).unwrap_or(NULL)
    }

    pub fn cells(&self) -> &'a [Value] {
        self.cells
    }

    pub fn to_record(&self) -> Record {
        self.columns
            .iter()
            .cloned()
            .zip(self.cells.iter().cloned())
            .collect()
    }
}

/// Left-join description: `on` pairs (left column, right column) form the key,
/// `attach` pairs (right column, output column) are copied onto matching rows.
#[derive(Debug, Clone, Default)]
pub struct JoinSpec<'a> {
    pub on: Vec<(&'a str, &'a str)>,
    pub attach: Vec<(&'a str, &'a str)>,
    /// Value written to attached columns when a left row has no match.
    pub fill: Value,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(DatasetError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut dataset = Self::new(columns)?;
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DatasetError::RowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn row(&self, idx: usize) -> Option<RowRef<'_>> {
        self.rows.get(idx).map(|cells| RowRef {
            columns: &self.columns,
            cells,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        self.rows.iter().map(move |cells| RowRef {
            columns: &self.columns,
            cells,
        })
    }

    pub fn column_values(&self, column: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Distinct non-null values of `column`, rendered as strings, sorted ascending.
    pub fn distinct_sorted(&self, column: &str) -> Vec<String> {
        let Some(values) = self.column_values(column) else {
            return Vec::new();
        };
        let mut out: Vec<String> = values
            .filter_map(Value::key)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        out.sort();
        out
    }

    /// Adds `column`, or replaces its cells when it already exists.
    pub fn set_column(&mut self, column: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(DatasetError::RowWidth {
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        match self.column_index(column) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(column.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn filter(&self, mut keep: impl FnMut(RowRef<'_>) -> bool) -> Dataset {
        let rows = self
            .rows
            .iter()
            .filter(|cells| {
                keep(RowRef {
                    columns: &self.columns,
                    cells,
                })
            })
            .cloned()
            .collect();
        Dataset {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Stacks `other` under `self`. Columns are unioned (self's order first);
    /// cells a side does not have become null.
    pub fn concat(&self, other: &Dataset) -> Dataset {
        let mut columns = self.columns.clone();
        for column in &other.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        let mut rows = Vec::with_capacity(self.rows.len() + other.rows.len());
        for part in [self, other] {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| part.column_index(c)).collect();
            for row in &part.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|idx| idx.map_or(Value::Null, |i| row[i].clone()))
                        .collect(),
                );
            }
        }
        Dataset { columns, rows }
    }

    /// Drops rows whose values in `key_columns` repeat an earlier row. Nulls compare
    /// equal to each other here, matching spreadsheet-style duplicate removal.
    pub fn dedup_by(&self, key_columns: &[&str]) -> Result<Dataset> {
        let indices = key_columns
            .iter()
            .map(|c| {
                self.column_index(c)
                    .ok_or_else(|| DatasetError::UnknownColumn(c.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        if indices.is_empty() {
            return Ok(self.clone());
        }
        let mut seen: HashSet<Vec<Option<String>>> = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(indices.iter().map(|&i| row[i].key()).collect()))
            .cloned()
            .collect();
        Ok(Dataset {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Left join: every row of `self` appears exactly once in the output. The first
    /// right row with a matching key wins; left rows with a null key never match.
    /// An attached column that already exists on the left keeps non-null left
    /// values and only fills the gaps.
    pub fn left_join(&self, right: &Dataset, spec: &JoinSpec<'_>) -> Result<Dataset> {
        let left_keys = spec
            .on
            .iter()
            .map(|(l, _)| {
                self.column_index(l)
                    .ok_or_else(|| DatasetError::UnknownColumn(l.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let right_keys = spec
            .on
            .iter()
            .map(|(_, r)| {
                right
                    .column_index(r)
                    .ok_or_else(|| DatasetError::UnknownColumn(r.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let attach = spec
            .attach
            .iter()
            .map(|(r, out)| {
                right
                    .column_index(r)
                    .map(|idx| (idx, *out))
                    .ok_or_else(|| DatasetError::UnknownColumn(r.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut lookup: HashMap<Vec<String>, usize> = HashMap::new();
        for (pos, row) in right.rows.iter().enumerate() {
            if let Some(key) = composite_key(row, &right_keys) {
                lookup.entry(key).or_insert(pos);
            }
        }

        let mut joined = self.clone();
        for (right_idx, out) in attach {
            let values: Vec<Value> = self
                .rows
                .iter()
                .map(|row| {
                    composite_key(row, &left_keys)
                        .and_then(|key| lookup.get(&key))
                        .map(|&pos| right.rows[pos][right_idx].clone())
                        .filter(|v| !v.is_null())
                        .unwrap_or_else(|| spec.fill.clone())
                })
                .collect();
            match joined.column_index(out) {
                Some(existing) => {
                    let merged = joined
                        .rows
                        .iter()
                        .zip(values)
                        .map(|(row, new)| {
                            if row[existing].is_null() {
                                new
                            } else {
                                row[existing].clone()
                            }
                        })
                        .collect();
                    joined.set_column(out, merged)?;
                }
                None => joined.set_column(out, values)?,
            }
        }
        Ok(joined)
    }

    /// Keeps only `columns`, in that order. Columns the dataset lacks come back null.
    pub fn project(&self, columns: &[&str]) -> Dataset {
        let mapping: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                mapping
                    .iter()
                    .map(|idx| idx.map_or(Value::Null, |i| row[i].clone()))
                    .collect()
            })
            .collect();
        Dataset {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn to_records(&self) -> Vec<Record> {
        self.rows().map(|row| row.to_record()).collect()
    }
}

fn composite_key(row: &[Value], indices: &[usize]) -> Option<Vec<String>> {
    indices.iter().map(|&i| row[i].key()).collect()
}
