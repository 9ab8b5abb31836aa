use crate::error::Result;
use crate::html::{HtmlRow, TableParser};
use regex::Regex;
use reports_dataset::{Dataset, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of leading `<table>` elements read from a knowledge-base page.
pub const CATALOG_TABLES: usize = 2;

pub const MAJOR_MINOR_COLUMN: &str = "Major_Minor_Version";
pub const LABEL_COLUMN: &str = "Label";
pub const NO_LABEL: &str = "NoLabel";

/// Product lines whose release history is published as knowledge-base tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Esxi,
    Vcenter,
}

/// Fixed cell positions of one product's release table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KbLayout {
    pub release_name: Option<usize>,
    pub version: usize,
    pub release_date: usize,
    pub build: usize,
    pub available_as: Option<usize>,
    /// Rows with fewer `<td>` cells are skipped.
    pub min_cells: usize,
    /// Skipped rows still consume a rank.
    pub rank_skipped: bool,
}

impl KbLayout {
    pub const ESXI: KbLayout = KbLayout {
        release_name: None,
        version: 1,
        release_date: 2,
        build: 3,
        available_as: Some(4),
        min_cells: 2,
        rank_skipped: false,
    };

    pub const VCENTER: KbLayout = KbLayout {
        release_name: Some(0),
        version: 1,
        release_date: 2,
        build: 4,
        available_as: None,
        min_cells: 5,
        rank_skipped: true,
    };
}

impl Product {
    pub const ALL: [Product; 2] = [Product::Esxi, Product::Vcenter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Esxi => "esxi",
            Product::Vcenter => "vcenter",
        }
    }

    pub fn layout(&self) -> KbLayout {
        match self {
            Product::Esxi => KbLayout::ESXI,
            Product::Vcenter => KbLayout::VCENTER,
        }
    }

    /// Inventory descriptor pattern; group 1 is major.minor, group 2 the build.
    pub fn descriptor_pattern(&self) -> &'static str {
        match self {
            Product::Esxi => r"VMware ESXi (\d+\.\d+)\.\d+ build-(\d+)",
            Product::Vcenter => r"VMware vCenter Server (\d+\.\d+)\.\d+ build-(\d+)",
        }
    }

    /// Inventory column carrying the descriptor text.
    pub fn descriptor_column(&self) -> &'static str {
        match self {
            Product::Esxi => "ESX Version",
            Product::Vcenter => "VI SDK Server type",
        }
    }

    /// Build column name of the scraped catalogue.
    pub fn build_column(&self) -> &'static str {
        match self {
            Product::Esxi => "Build Number",
            Product::Vcenter => "Build Version",
        }
    }

    /// Column layout of the scraped catalogue as served to clients.
    pub fn catalog_columns(&self) -> &'static [&'static str] {
        match self {
            Product::Esxi => &[
                "Version",
                "Build Number",
                "Release Date",
                "Available As",
                LABEL_COLUMN,
                MAJOR_MINOR_COLUMN,
            ],
            Product::Vcenter => &[
                "Release Name",
                "Version",
                "Date",
                "Build Version",
                LABEL_COLUMN,
                MAJOR_MINOR_COLUMN,
            ],
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "esxi" | "hosts" => Ok(Product::Esxi),
            "vcenter" | "vcs" => Ok(Product::Vcenter),
            other => Err(format!("unknown product line: {other}")),
        }
    }
}

/// One release row scraped from a knowledge-base table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
    pub release_name: Option<String>,
    pub version: String,
    pub release_date: String,
    pub build: String,
    pub available_as: Option<String>,
    pub label: String,
    pub major_minor: Option<String>,
}

/// Recency label for the `index`-th row of a table: "N", "N-1", "N-2", ...
pub fn rank_label(index: usize) -> String {
    if index == 0 {
        "N".to_string()
    } else {
        format!("N-{index}")
    }
}

fn cell(row: &HtmlRow, idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

/// Reads knowledge-base pages into release entries.
pub struct CatalogParser {
    tables: TableParser,
    numeric_pair: Regex,
}

impl CatalogParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tables: TableParser::new()?,
            numeric_pair: Regex::new(r"\d+\.\d+")?,
        })
    }

    /// Major.minor key of a version string: the first `digits.digits` run, else
    /// the first two dot-separated parts.
    pub fn major_minor(&self, version: &str) -> Option<String> {
        let version = version.trim();
        if let Some(found) = self.numeric_pair.find(version) {
            return Some(found.as_str().to_string());
        }
        let joined = version.split('.').take(2).collect::<Vec<_>>().join(".");
        (!joined.is_empty()).then_some(joined)
    }

    /// Release rows of one product.
    ///
    /// Only the first [`CATALOG_TABLES`] tables are read; each table's first row
    /// is its header. Labels restart at "N" for every table. With
    /// [`KbLayout::rank_skipped`] the rank is the row's position among all data
    /// rows, short ones included.
    pub fn parse(&self, html: &str, product: Product) -> Vec<ReleaseEntry> {
        let layout = product.layout();
        let mut entries = Vec::new();
        for table in self.tables.tables(html).into_iter().take(CATALOG_TABLES) {
            let data_rows = table.iter().skip(1).enumerate();
            let mut kept = 0;
            for (position, row) in data_rows {
                if row.len() < layout.min_cells {
                    continue;
                }
                let index = if layout.rank_skipped { position } else { kept };
                kept += 1;
                let version = cell(row, layout.version);
                entries.push(ReleaseEntry {
                    release_name: layout.release_name.map(|i| cell(row, i)),
                    major_minor: self.major_minor(&version),
                    version,
                    release_date: cell(row, layout.release_date),
                    build: cell(row, layout.build),
                    available_as: layout.available_as.map(|i| cell(row, i)),
                    label: rank_label(index),
                });
            }
        }
        entries
    }
}

/// The catalogue as a dataset in the product's client-facing column layout.
pub fn catalog_dataset(entries: &[ReleaseEntry], product: Product) -> Result<Dataset> {
    let columns = product
        .catalog_columns()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let text = |s: &str| Value::text(s);
    let opt = |s: &Option<String>| s.as_deref().map_or(Value::Null, Value::text);
    let rows = entries
        .iter()
        .map(|e| match product {
            Product::Esxi => vec![
                text(&e.version),
                text(&e.build),
                text(&e.release_date),
                opt(&e.available_as),
                text(&e.label),
                opt(&e.major_minor),
            ],
            Product::Vcenter => vec![
                opt(&e.release_name),
                text(&e.version),
                text(&e.release_date),
                text(&e.build),
                text(&e.label),
                opt(&e.major_minor),
            ],
        })
        .collect();
    Ok(Dataset::from_rows(columns, rows)?)
}

/// Compiled inventory descriptor pattern for one product.
pub struct DescriptorPattern {
    regex: Regex,
}

impl DescriptorPattern {
    pub fn for_product(product: Product) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(product.descriptor_pattern())?,
        })
    }

    /// (major.minor, build) from a descriptor such as
    /// `VMware ESXi 8.0.3 build-24022510`.
    pub fn extract(&self, descriptor: &str) -> Option<(String, String)> {
        let caps = self.regex.captures(descriptor)?;
        Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn labels_count_back_from_newest() {
        let labels: Vec<String> = (0..3).map(rank_label).collect();
        assert_eq!(labels, vec!["N", "N-1", "N-2"]);
    }

    #[test]
    fn major_minor_prefers_numeric_pair() {
        let parser = CatalogParser::new().unwrap();
        assert_eq!(parser.major_minor("ESXi 8.0 Update 3").as_deref(), Some("8.0"));
        assert_eq!(parser.major_minor("8.0.3.00400").as_deref(), Some("8.0"));
        assert_eq!(
            parser.major_minor("vCenter Server 7.0 Update 3r").as_deref(),
            Some("7.0")
        );
        assert_eq!(parser.major_minor("7").as_deref(), Some("7"));
        assert_eq!(parser.major_minor(""), None);
    }

    #[test]
    fn descriptor_extraction() {
        let esxi = DescriptorPattern::for_product(Product::Esxi).unwrap();
        assert_eq!(
            esxi.extract("VMware ESXi 8.0.3 build-24022510"),
            Some(("8.0".to_string(), "24022510".to_string()))
        );
        assert_eq!(esxi.extract("VMware ESXi 8.0 build-1"), None);

        let vcenter = DescriptorPattern::for_product(Product::Vcenter).unwrap();
        assert_eq!(
            vcenter.extract("VMware vCenter Server 7.0.3 build-21477706"),
            Some(("7.0".to_string(), "21477706".to_string()))
        );
    }

    #[test]
    fn vcenter_rows_need_five_cells() {
        let html = "<table>\
            <tr><td>Name</td><td>Version</td><td>Date</td><td>x</td><td>Build</td></tr>\
            <tr><td>vCenter 8.0 U3</td><td>8.0.3</td><td>2024-06-25</td><td>-</td><td>24022515</td></tr>\
            <tr><td>short</td><td>8.0.2</td></tr>\
            <tr><td>vCenter 8.0 U2</td><td>8.0.2</td><td>2023-09-21</td><td>-</td><td>22385739</td></tr>\
            </table>";
        let entries = CatalogParser::new().unwrap().parse(html, Product::Vcenter);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].release_name.as_deref(), Some("vCenter 8.0 U3"));
        assert_eq!(entries[0].build, "24022515");
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["N", "N-2"]);
    }

    #[test]
    fn vcenter_section_rows_keep_their_rank() {
        let html = "<table>\
            <tr><th>Name</th><th>Version</th><th>Date</th><th>x</th><th>Build</th></tr>\
            <tr><td>vCenter 8.0 U3</td><td>8.0.3</td><td>2024-06-25</td><td>-</td><td>24022515</td></tr>\
            <tr><td colspan=5>vCenter Server 8.0 Update 2</td></tr>\
            <tr><td>vCenter 8.0 U2</td><td>8.0.2</td><td>2023-09-21</td><td>-</td><td>22385739</td></tr>\
            </table>";
        let entries = CatalogParser::new().unwrap().parse(html, Product::Vcenter);

        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["N", "N-2"]);
    }

    #[test]
    fn esxi_ranks_only_kept_rows() {
        let html = "<table>\
            <tr><th>Name</th><th>Version</th><th>Date</th><th>Build</th><th>As</th></tr>\
            <tr><td>ESXi 8.0 U3</td><td>8.0.3</td><td>2024-06-25</td><td>24022510</td><td>ISO</td></tr>\
            <tr><td colspan=5>older</td></tr>\
            <tr><td>ESXi 8.0 U2</td><td>8.0.2</td><td>2023-09-21</td><td>22380479</td><td>ISO</td></tr>\
            </table>";
        let entries = CatalogParser::new().unwrap().parse(html, Product::Esxi);

        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["N", "N-1"]);
    }

    #[test]
    fn only_first_two_tables_are_read() {
        let table = |build: &str| {
            format!(
                "<table><tr><th>h</th></tr><tr><td>ESXi 8.0</td><td>8.0.3</td><td>2024</td><td>{build}</td><td>ISO</td></tr></table>"
            )
        };
        let html = format!("{}{}{}", table("1"), table("2"), table("3"));
        let entries = CatalogParser::new().unwrap().parse(&html, Product::Esxi);

        let builds: Vec<&str> = entries.iter().map(|e| e.build.as_str()).collect();
        assert_eq!(builds, vec!["1", "2"]);
        assert!(entries.iter().all(|e| e.label == "N"));
    }
}
