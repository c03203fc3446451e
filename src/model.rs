//! Submission data model.
//!
//! DESIGN
//! ======
//! Field names on the wire keep the keys already used by stored documents
//! (`laboratorio`, `resultados`, `tipos_incluidos`, ...). Rust-side names stay
//! English. The submission timestamp is never part of the record: the store
//! assigns it server-side under [`SERVER_TIMESTAMP_FIELD`].

use serde::{Deserialize, Serialize};
use time::Date;

/// Document key the store fills with its own clock on write.
pub const SERVER_TIMESTAMP_FIELD: &str = "timestamp";

time::serde::format_description!(report_date_format, Date, "[year]-[month]-[day]");

// =============================================================================
// CATEGORY
// =============================================================================

/// Analyte table a result row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Química Clínica")]
    Chemistry,
    #[serde(rename = "Uroanálisis")]
    Urinalysis,
}

impl Category {
    pub const ALL: [Self; 2] = [Self::Chemistry, Self::Urinalysis];

    /// Display label, also the persisted `categoria` value.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Chemistry => "Química Clínica",
            Self::Urinalysis => "Uroanálisis",
        }
    }

    /// Suffix used in form field names (`result_chem_3`).
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Chemistry => "chem",
            Self::Urinalysis => "uro",
        }
    }

    /// Section heading used in the notification summary.
    #[must_use]
    pub fn summary_heading(self) -> &'static str {
        match self {
            Self::Chemistry => "QUÍMICA CLÍNICA",
            Self::Urinalysis => "UROANÁLISIS",
        }
    }

    #[must_use]
    pub fn from_suffix(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.suffix() == raw)
    }
}

// =============================================================================
// ROWS
// =============================================================================

/// One editable row of an analyte table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyteRow {
    /// Fixed catalog label.
    pub name: String,
    pub instrument: String,
    pub method: String,
    /// Numeric value or qualitative token (`+`, `++`, `neg`).
    pub result: String,
    pub unit: String,
}

impl AnalyteRow {
    #[must_use]
    pub fn blank(name: &str) -> Self {
        Self { name: name.to_owned(), ..Self::default() }
    }

    /// A row is reported when either its result or its instrument is filled.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        !self.result.trim().is_empty() || !self.instrument.trim().is_empty()
    }
}

/// A populated row as persisted, tagged with its source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedResult {
    #[serde(rename = "categoria")]
    pub category: Category,
    pub analyte: String,
    pub instrument: String,
    pub method: String,
    pub result: String,
    pub unit: String,
}

// =============================================================================
// ROUND CODE
// =============================================================================

/// Proficiency round identifier of the form `EA-###-####`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoundCode(String);

impl RoundCode {
    /// Normalize to upper case and check the fixed format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        let bytes = normalized.as_bytes();
        let shape_ok = bytes.len() == 11
            && normalized.starts_with("EA-")
            && bytes[3..6].iter().all(u8::is_ascii_digit)
            && bytes[6] == b'-'
            && bytes[7..].iter().all(u8::is_ascii_digit);
        shape_ok.then_some(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoundCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SUBMISSION RECORD
// =============================================================================

/// Which analyte tables contributed at least one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryFlags {
    #[serde(rename = "quimica")]
    pub chemistry_present: bool,
    #[serde(rename = "uroanalisis")]
    pub urinalysis_present: bool,
}

impl CategoryFlags {
    #[must_use]
    pub fn from_results(results: &[ScrapedResult]) -> Self {
        Self {
            chemistry_present: results.iter().any(|r| r.category == Category::Chemistry),
            urinalysis_present: results.iter().any(|r| r.category == Category::Urinalysis),
        }
    }
}

/// One validated laboratory submission. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    #[serde(rename = "laboratorio")]
    pub laboratory: String,
    #[serde(rename = "codigo_ensayo")]
    pub round_code: RoundCode,
    #[serde(rename = "fecha_reporte", with = "report_date_format::option")]
    pub report_date: Option<Date>,
    #[serde(rename = "email_contacto")]
    pub contact_email: String,
    #[serde(rename = "comentarios")]
    pub comments: String,
    #[serde(rename = "resultados")]
    pub results: Vec<ScrapedResult>,
    #[serde(rename = "tipos_incluidos")]
    pub category_flags: CategoryFlags,
    #[serde(rename = "userAgent")]
    pub client_agent: String,
}

impl SubmissionRecord {
    /// Results of one category, in form order.
    pub fn results_in(&self, category: Category) -> impl Iterator<Item = &ScrapedResult> {
        self.results.iter().filter(move |r| r.category == category)
    }

    /// Report date rendered as `YYYY-MM-DD`, empty when not given.
    #[must_use]
    pub fn report_date_text(&self) -> String {
        self.report_date
            .map(|d| format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day()))
            .unwrap_or_default()
    }
}

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// Participating laboratory, as listed in `laboratorios.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaboratoryEntry {
    pub nombre: String,
}

/// Anonymized laboratory id in published reports. Older datasets use
/// numbers, newer ones strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabLabel {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for LabLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
