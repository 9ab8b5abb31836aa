use crate::catalog::{CatalogParser, DescriptorPattern, Product, ReleaseEntry, LABEL_COLUMN, NO_LABEL};
use crate::error::Result;
use crate::fetch::PageFetcher;
use reports_dataset::{Dataset, JoinSpec, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inventory columns written by the correlator before the join.
pub const VERSION_COLUMN: &str = "Version";
pub const BUILD_COLUMN: &str = "Build";

/// Rows carrying one label, for the distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    #[serde(rename = "Label")]
    pub label: String,
    pub count: usize,
}

/// Inventory rows with their labels, the label distribution and the catalogue
/// the labels came from.
#[derive(Debug, Clone)]
pub struct Correlation {
    pub rows: Dataset,
    pub label_counts: Vec<LabelCount>,
    pub catalog: Vec<ReleaseEntry>,
}

pub struct Correlator {
    fetcher: Arc<dyn PageFetcher>,
    parser: CatalogParser,
}

impl Correlator {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Ok(Self {
            fetcher,
            parser: CatalogParser::new()?,
        })
    }

    /// Scrapes one product's release catalogue. Any failure is logged and
    /// yields an empty catalogue.
    pub async fn catalog(&self, url: &str, product: Product) -> Vec<ReleaseEntry> {
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(err) => {
                log::warn!("Failed to fetch {product} knowledge base {url}: {err}");
                return Vec::new();
            }
        };
        let entries = self.parser.parse(&html, product);
        if entries.is_empty() {
            log::warn!("No {product} release rows found at {url}");
        } else {
            log::info!("Scraped {} {product} releases from {url}", entries.len());
        }
        entries
    }

    /// Scrapes `url` and labels every inventory row.
    pub async fn correlate(
        &self,
        inventory: &Dataset,
        url: &str,
        product: Product,
    ) -> Result<Correlation> {
        let catalog = self.catalog(url, product).await;
        let (rows, label_counts) = label_inventory(inventory, &catalog, product)?;
        Ok(Correlation {
            rows,
            label_counts,
            catalog,
        })
    }
}

/// Joins inventory rows to the catalogue on (major.minor, build). Every input
/// row appears exactly once; rows without a match are labelled "NoLabel".
pub fn label_inventory(
    inventory: &Dataset,
    catalog: &[ReleaseEntry],
    product: Product,
) -> Result<(Dataset, Vec<LabelCount>)> {
    let pattern = DescriptorPattern::for_product(product)?;
    let keys: Vec<Option<(String, String)>> = match inventory.column_values(product.descriptor_column()) {
        Some(values) => values
            .map(|v| v.as_text().and_then(|text| pattern.extract(text)))
            .collect(),
        None => {
            log::warn!(
                "Inventory has no {:?} column; every {product} row is unlabelled",
                product.descriptor_column()
            );
            vec![None; inventory.len()]
        }
    };

    let kept: Vec<&str> = inventory
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|c| *c != LABEL_COLUMN)
        .collect();
    let mut labeled = inventory.project(&kept);
    let (versions, builds): (Vec<Value>, Vec<Value>) = keys
        .into_iter()
        .map(|key| match key {
            Some((version, build)) => (Value::text(version), Value::text(build)),
            None => (Value::Null, Value::Null),
        })
        .unzip();
    labeled.set_column(VERSION_COLUMN, versions)?;
    labeled.set_column(BUILD_COLUMN, builds)?;

    let lookup = Dataset::from_rows(
        vec!["major_minor".into(), "build".into(), "label".into()],
        catalog
            .iter()
            .map(|e| {
                vec![
                    e.major_minor.as_deref().map_or(Value::Null, Value::text),
                    Value::text(e.build.as_str()),
                    Value::text(e.label.as_str()),
                ]
            })
            .collect(),
    )?;
    let joined = labeled.left_join(
        &lookup,
        &JoinSpec {
            on: vec![(VERSION_COLUMN, "major_minor"), (BUILD_COLUMN, "build")],
            attach: vec![("label", LABEL_COLUMN)],
            fill: Value::text(NO_LABEL),
        },
    )?;

    let counts = count_labels(&joined);
    Ok((joined, counts))
}

/// Rows per label, in order of first appearance.
pub fn count_labels(rows: &Dataset) -> Vec<LabelCount> {
    let mut counts: Vec<LabelCount> = Vec::new();
    let Some(values) = rows.column_values(LABEL_COLUMN) else {
        return counts;
    };
    for value in values {
        let label = value.to_string();
        match counts.iter_mut().find(|c| c.label == label) {
            Some(entry) => entry.count += 1,
            None => counts.push(LabelCount { label, count: 1 }),
        }
    }
    counts
}
