//! Laboratory reference list: load, sort, hand to the selection control.

use std::cmp::Ordering;
use std::path::Path;

use tracing::{error, info};

use crate::model::LaboratoryEntry;

/// Alert shown when the list cannot be loaded. The control stays empty.
pub const LOAD_FAILED_MESSAGE: &str = "Error cargando la lista de laboratorios. Por favor recarga la página.";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read laboratory list: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse laboratory list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read and sort `laboratorios.json`.
pub async fn load(path: &Path) -> Result<Vec<LaboratoryEntry>, LoadError> {
    let raw = tokio::fs::read_to_string(path).await.inspect_err(|e| {
        error!(error = %e, path = %path.display(), "laboratory list unreadable");
    })?;
    let labs = parse(&raw).inspect_err(|e| {
        error!(error = %e, path = %path.display(), "laboratory list malformed");
    })?;
    info!(count = labs.len(), "laboratories loaded");
    Ok(labs)
}

/// Parse a JSON array of `{ "nombre": ... }` and sort it for display.
pub fn parse(raw: &str) -> Result<Vec<LaboratoryEntry>, LoadError> {
    let mut labs: Vec<LaboratoryEntry> = serde_json::from_str(raw)?;
    sort_labs(&mut labs);
    Ok(labs)
}

/// Stable alphabetical sort on a locale-aware key: accents and case are
/// ignored first, then the raw names break ties.
pub fn sort_labs(labs: &mut [LaboratoryEntry]) {
    labs.sort_by(|a, b| compare_names(&a.nombre, &b.nombre));
}

#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// Lowercased name with Spanish/Latin diacritics folded to their base letter.
#[must_use]
pub fn collation_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
#[path = "laboratories_test.rs"]
mod tests;
