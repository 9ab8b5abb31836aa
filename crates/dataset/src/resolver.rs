use crate::dataset::Dataset;

/// A semantic column and the physical spellings it may appear under, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalColumn {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

impl LogicalColumn {
    pub const fn new(name: &'static str, variants: &'static [&'static str]) -> Self {
        Self { name, variants }
    }

    pub fn resolve_in(&self, dataset: &Dataset) -> Option<&'static str> {
        resolve(dataset.columns(), self.variants)
    }
}

/// First variant (in caller order) that is one of `columns`. Matching is exact and
/// case-sensitive; `None` is a normal outcome.
pub fn resolve<'v, S: AsRef<str>>(columns: &[S], variants: &[&'v str]) -> Option<&'v str> {
    variants
        .iter()
        .copied()
        .find(|variant| columns.iter().any(|c| c.as_ref() == *variant))
}

/// Logical → physical mapping computed once for one dataset.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSchema {
    entries: Vec<(&'static str, Option<&'static str>)>,
}

impl ResolvedSchema {
    pub fn resolve(dataset: &Dataset, columns: &[LogicalColumn]) -> Self {
        Self {
            entries: columns
                .iter()
                .map(|col| (col.name, col.resolve_in(dataset)))
                .collect(),
        }
    }

    pub fn get(&self, column: &LogicalColumn) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == column.name)
            .and_then(|(_, physical)| *physical)
    }

    pub fn missing(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(_, physical)| physical.is_none())
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Input contract of one dataset: columns that must resolve and columns that may.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaSpec {
    pub required: &'static [LogicalColumn],
    pub optional: &'static [LogicalColumn],
}

impl SchemaSpec {
    pub const fn new(
        required: &'static [LogicalColumn],
        optional: &'static [LogicalColumn],
    ) -> Self {
        Self { required, optional }
    }

    /// Resolves every declared column. `Err` carries the logical names of the
    /// required columns that did not resolve.
    pub fn check(&self, dataset: &Dataset) -> Result<ResolvedSchema, Vec<&'static str>> {
        let required = ResolvedSchema::resolve(dataset, self.required);
        let missing = required.missing();
        if !missing.is_empty() {
            return Err(missing);
        }
        let optional = ResolvedSchema::resolve(dataset, self.optional);
        let mut entries = required.entries;
        entries.extend(optional.entries);
        Ok(ResolvedSchema { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    const LOCATION: LogicalColumn = LogicalColumn::new("Location", &["Location", "location", "LOCATION"]);
    const CUSTOMER: LogicalColumn = LogicalColumn::new("Customer", &["Customer", "customer", "CUSTOMER"]);

    fn dataset(columns: &[&str]) -> Dataset {
        Dataset::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![columns.iter().map(|_| Value::Null).collect()],
        )
        .unwrap()
    }

    #[test]
    fn resolve_honours_caller_priority() {
        let columns = ["location", "Location"];
        assert_eq!(resolve(&columns, &["Location", "location"]), Some("Location"));
        assert_eq!(resolve(&columns, &["location", "Location"]), Some("location"));
    }

    #[test]
    fn resolve_returns_none_without_match() {
        let columns = ["Site"];
        assert_eq!(resolve(&columns, LOCATION.variants), None);
    }

    #[test]
    fn single_present_variant_wins_regardless_of_others() {
        let columns = ["LOCATION", "Host"];
        assert_eq!(resolve(&columns, LOCATION.variants), Some("LOCATION"));
    }

    #[test]
    fn schema_check_reports_missing_required() {
        const SPEC: SchemaSpec = SchemaSpec::new(&[LOCATION], &[CUSTOMER]);
        let err = SPEC.check(&dataset(&["Host"])).unwrap_err();
        assert_eq!(err, vec!["Location"]);

        let schema = SPEC.check(&dataset(&["location", "Host"])).unwrap();
        assert_eq!(schema.get(&LOCATION), Some("location"));
        assert_eq!(schema.get(&CUSTOMER), None);
    }
}
