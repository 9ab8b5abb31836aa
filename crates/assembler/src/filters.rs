use crate::error::{AssemblerError, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Selector values that mean "do not filter".
const MATCH_ALL: &[&str] = &["All Customers", "All Locations", "All Reports", "all", "All", ""];

/// Request-level narrowing of a report. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFilters {
    pub location: Option<String>,
    pub customer: Option<String>,
    pub report: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub exclude_missing: bool,
}

fn selected(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !MATCH_ALL.contains(v))
}

impl ReportFilters {
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn location(&self) -> Option<&str> {
        selected(&self.location)
    }

    pub fn customer(&self) -> Option<&str> {
        selected(&self.customer)
    }

    pub fn report(&self) -> Option<&str> {
        selected(&self.report)
    }

    /// Reporting period; missing parts default to the current month.
    pub fn period(&self) -> Result<Period> {
        let today = Local::now().date_naive();
        let month = self.month.unwrap_or_else(|| today.month());
        let year = self.year.unwrap_or_else(|| today.year());
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AssemblerError::InvalidFilter(format!("no such month: {year}-{month:02}"))
        })?;
        Ok(Period {
            month,
            year,
            month_name: first.format("%B").to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub month: u32,
    pub year: i32,
    pub month_name: String,
}
