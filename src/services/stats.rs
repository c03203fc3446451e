//! Robust round statistics (ISO 13528 Algorithm A) and Z-score grading.
//!
//! ALGORITHM
//! =========
//! Start from the median and `1.483 * MAD`. If the MAD is zero fall back to
//! `IQR / 1.349`, then to the sample SD. Then iterate: winsorize at
//! `x* ± 1.5 s*`, take the mean of the clipped values as the new `x*` and
//! `1.134 * sd(clipped)` as the new `s*`, until both move less than
//! [`TOLERANCE`] or [`MAX_ITERATIONS`] is reached. Fewer than three values
//! use the classical mean and sample SD.

use serde::{Deserialize, Serialize};

use crate::model::LabLabel;

pub const MAX_ITERATIONS: usize = 50;
pub const TOLERANCE: f64 = 1e-6;

const MAD_SCALE: f64 = 1.483;
const IQR_SCALE: f64 = 1.349;
const WINSOR_FACTOR: f64 = 1.5;
const SD_CORRECTION: f64 = 1.134;

// =============================================================================
// DESCRIPTIVE
// =============================================================================

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator), 0 for fewer than two values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_sd(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Linearly interpolated percentile of already sorted values.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

#[must_use]
pub fn median(sorted: &[f64]) -> f64 {
    percentile(sorted, 50.0)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

// =============================================================================
// ROBUST ESTIMATE
// =============================================================================

/// Assigned value `x*` and robust standard deviation `s*`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustEstimate {
    pub mean: f64,
    pub sd: f64,
}

/// Returns `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn robust_mean_sd(values: &[f64]) -> Option<RobustEstimate> {
    if values.is_empty() {
        return None;
    }
    if values.len() < 3 {
        return Some(RobustEstimate { mean: mean(values), sd: sample_sd(values) });
    }

    let x = sorted_copy(values);
    let n = x.len() as f64;

    let mut x_star = median(&x);
    let deviations = sorted_copy(&x.iter().map(|v| (v - x_star).abs()).collect::<Vec<_>>());
    let mut s_star = MAD_SCALE * median(&deviations);
    if s_star == 0.0 {
        s_star = (percentile(&x, 75.0) - percentile(&x, 25.0)) / IQR_SCALE;
        if s_star == 0.0 {
            s_star = sample_sd(&x);
        }
    }

    for _ in 0..MAX_ITERATIONS {
        let delta = WINSOR_FACTOR * s_star;
        let clipped: Vec<f64> = x.iter().map(|v| v.clamp(x_star - delta, x_star + delta)).collect();

        let next_mean = mean(&clipped);
        let ss: f64 = clipped.iter().map(|v| (v - next_mean).powi(2)).sum();
        let next_sd = SD_CORRECTION * (ss / (n - 1.0)).sqrt();

        if (next_mean - x_star).abs() < TOLERANCE && (next_sd - s_star).abs() < TOLERANCE {
            break;
        }
        x_star = next_mean;
        s_star = next_sd;
    }

    Some(RobustEstimate { mean: x_star, sd: s_star })
}

/// `(x - x*) / s*`, undefined when `s*` is zero.
#[must_use]
pub fn z_score(value: f64, estimate: RobustEstimate) -> Option<f64> {
    if estimate.sd == 0.0 {
        return None;
    }
    Some((value - estimate.mean) / estimate.sd)
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// ISO/IEC 17043 performance grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Acceptable, `|z| <= 2`.
    A,
    /// Questionable, `2 < |z| < 3`.
    C,
    /// Unacceptable, `|z| >= 3`.
    I,
    /// Not reported.
    #[serde(rename = "NR")]
    NotReported,
}

#[must_use]
pub fn classify(z: Option<f64>) -> Classification {
    match z.map(f64::abs) {
        None => Classification::NotReported,
        Some(a) if a <= 2.0 => Classification::A,
        Some(a) if a < 3.0 => Classification::C,
        Some(_) => Classification::I,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// =============================================================================
// ANALYTE REPORT
// =============================================================================

/// One laboratory's raw result; `resultado: null` means not reported.
#[derive(Debug, Clone, Deserialize)]
pub struct RawResult {
    pub lab: LabLabel,
    pub resultado: Option<f64>,
}

/// Raw results of one analyte in one round.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyteInput {
    pub nombre: String,
    #[serde(default)]
    pub unidad: String,
    pub resultados: Vec<RawResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLab {
    pub id: LabLabel,
    pub resultado: f64,
    pub z_score: f64,
    pub clasificacion: Classification,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeCounts {
    pub total: usize,
    pub aceptables: usize,
    pub cuestionables: usize,
    pub inaceptables: usize,
}

/// Scored analyte as published in the round report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyteReport {
    pub nombre: String,
    pub unidad: String,
    pub n: usize,
    pub valor_asignado: f64,
    pub sd_robusta: f64,
    /// Coefficient of variation in percent, one decimal.
    pub cv: f64,
    /// Scored labs sorted by ascending Z; unscored labs are left out.
    pub laboratorios: Vec<ScoredLab>,
    pub resumen: GradeCounts,
}

/// Score every reported result against the robust estimate of the group.
///
/// Returns `None` when no laboratory reported a value.
#[must_use]
pub fn score_analyte(input: &AnalyteInput) -> Option<AnalyteReport> {
    let values: Vec<f64> = input.resultados.iter().filter_map(|r| r.resultado).collect();
    let estimate = robust_mean_sd(&values)?;

    let mut laboratorios: Vec<ScoredLab> = input
        .resultados
        .iter()
        .filter_map(|r| {
            let value = r.resultado?;
            let z = z_score(value, estimate)?;
            Some(ScoredLab {
                id: r.lab.clone(),
                resultado: value,
                z_score: round_to(z, 2),
                clasificacion: classify(Some(z)),
            })
        })
        .collect();
    laboratorios.sort_by(|a, b| a.z_score.total_cmp(&b.z_score));

    let count = |grade: Classification| laboratorios.iter().filter(|l| l.clasificacion == grade).count();
    let resumen = GradeCounts {
        total: laboratorios.len(),
        aceptables: count(Classification::A),
        cuestionables: count(Classification::C),
        inaceptables: count(Classification::I),
    };

    let cv = if estimate.mean == 0.0 { 0.0 } else { round_to(estimate.sd / estimate.mean * 100.0, 1) };

    Some(AnalyteReport {
        nombre: input.nombre.clone(),
        unidad: input.unidad.clone(),
        n: values.len(),
        valor_asignado: round_to(estimate.mean, 2),
        sd_robusta: round_to(estimate.sd, 2),
        cv,
        laboratorios,
        resumen,
    })
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
