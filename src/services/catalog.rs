//! Analyte catalog and results-table construction.
//!
//! The catalog is fixed: one table row per analyte, in the order below. Form
//! field names and the scraper both rely on this order.

use crate::model::{AnalyteRow, Category};

pub const CHEMISTRY_ANALYTES: [&str; 26] = [
    "Glucosa",
    "Ácido Úrico",
    "Colesterol",
    "Colesterol HDL",
    "Triglicéridos",
    "Urea",
    "Creatinina",
    "Proteínas Total",
    "Albúmina",
    "Bilirrubina Total",
    "Bilirrubina Directa",
    "Amilasa",
    "Lipasa",
    "Fosfatasa Alcalina (ALP)",
    "AST (TGO)",
    "ALT (TGP)",
    "Gamma GGT",
    "LDH",
    "CK-TOTAL",
    "Calcio",
    "Fósforo",
    "Cloruro",
    "Sodio",
    "Potasio",
    "Magnesio",
    "Hierro",
];

pub const URINALYSIS_ANALYTES: [&str; 5] = ["Proteínas", "Glucosa", "Cuerpos cetónicos", "Bilirrubina", "Nitritos"];

/// How the result cell accepts input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// `type="number" step="any"`.
    Numeric,
    /// Free text, for qualitative tokens (`+`, `++`, `neg`).
    FreeText,
}

/// Columns the copy-down utility may fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyColumn {
    Instrument,
    Method,
}

#[must_use]
pub fn analytes(category: Category) -> &'static [&'static str] {
    match category {
        Category::Chemistry => &CHEMISTRY_ANALYTES,
        Category::Urinalysis => &URINALYSIS_ANALYTES,
    }
}

#[must_use]
pub fn result_input_mode(category: Category) -> InputMode {
    match category {
        Category::Chemistry => InputMode::Numeric,
        Category::Urinalysis => InputMode::FreeText,
    }
}

/// Fresh, empty rows for one table.
#[must_use]
pub fn build_rows(category: Category) -> Vec<AnalyteRow> {
    analytes(category).iter().map(|name| AnalyteRow::blank(name)).collect()
}

/// Fill every empty cell with the first cell's value. Non-empty cells are
/// never touched; an empty first value leaves the column as it was.
pub fn copy_down(values: &mut [String]) {
    let Some((first, rest)) = values.split_first_mut() else {
        return;
    };
    for value in rest.iter_mut().filter(|v| v.is_empty()) {
        value.clone_from(first);
    }
}

/// Column-wise [`copy_down`] over the rows of a single table.
pub fn copy_down_rows(rows: &mut [AnalyteRow], column: CopyColumn) {
    let mut values: Vec<String> = rows.iter().map(|row| cell(row, column).clone()).collect();
    copy_down(&mut values);
    for (row, value) in rows.iter_mut().zip(values) {
        *cell_mut(row, column) = value;
    }
}

fn cell(row: &AnalyteRow, column: CopyColumn) -> &String {
    match column {
        CopyColumn::Instrument => &row.instrument,
        CopyColumn::Method => &row.method,
    }
}

fn cell_mut(row: &mut AnalyteRow, column: CopyColumn) -> &mut String {
    match column {
        CopyColumn::Instrument => &mut row.instrument,
        CopyColumn::Method => &mut row.method,
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
