//! Reads submitted table fields back into rows and result records.
//!
//! Each table input is posted as `{field}_{suffix}_{index}` where `index` is
//! the row's position in the catalog. Missing fields read as empty.

use std::collections::HashMap;

use crate::model::{AnalyteRow, Category, ScrapedResult};
use crate::services::catalog;

/// Editable cells of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Instrument,
    Method,
    Result,
    Unit,
}

impl RowField {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Instrument => "instrument",
            Self::Method => "method",
            Self::Result => "result",
            Self::Unit => "unit",
        }
    }
}

#[must_use]
pub fn field_name(field: RowField, category: Category, index: usize) -> String {
    format!("{}_{}_{index}", field.key(), category.suffix())
}

/// Every catalog row of one table exactly as posted, blanks and padding included.
#[must_use]
pub fn read_raw_rows(fields: &HashMap<String, String>, category: Category) -> Vec<AnalyteRow> {
    collect_rows(fields, category, str::to_owned)
}

/// Like [`read_raw_rows`] with each cell trimmed.
#[must_use]
pub fn read_rows(fields: &HashMap<String, String>, category: Category) -> Vec<AnalyteRow> {
    collect_rows(fields, category, |v| v.trim().to_owned())
}

fn collect_rows(
    fields: &HashMap<String, String>,
    category: Category,
    clean: impl Fn(&str) -> String,
) -> Vec<AnalyteRow> {
    let value = |field: RowField, index: usize| {
        fields.get(&field_name(field, category, index)).map(|v| clean(v)).unwrap_or_default()
    };

    catalog::analytes(category)
        .iter()
        .enumerate()
        .map(|(i, name)| AnalyteRow {
            name: (*name).to_owned(),
            instrument: value(RowField::Instrument, i),
            method: value(RowField::Method, i),
            result: value(RowField::Result, i),
            unit: value(RowField::Unit, i),
        })
        .collect()
}

/// Keep populated rows (result or instrument filled), in order, tagged with `category`.
#[must_use]
pub fn scrape_rows(rows: &[AnalyteRow], category: Category) -> Vec<ScrapedResult> {
    rows.iter()
        .filter(|row| row.is_populated())
        .map(|row| ScrapedResult {
            category,
            analyte: row.name.clone(),
            instrument: row.instrument.clone(),
            method: row.method.clone(),
            result: row.result.clone(),
            unit: row.unit.clone(),
        })
        .collect()
}

#[must_use]
pub fn scrape_table(fields: &HashMap<String, String>, category: Category) -> Vec<ScrapedResult> {
    scrape_rows(&read_rows(fields, category), category)
}

#[cfg(test)]
#[path = "scraper_test.rs"]
mod tests;
