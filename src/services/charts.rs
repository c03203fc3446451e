//! Round report charts: one Z-score bar figure per analyte.
//!
//! The figures are plain Plotly `data`/`layout` objects built here and
//! handed to the page as JSON; the browser only calls `Plotly.newPlot`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::model::LabLabel;

/// Replaces the chart area when the dataset cannot be loaded.
pub const CHART_ERROR_MARKUP: &str = r#"<p class="error">Error cargando los datos de los gráficos.</p>"#;

pub const Y_RANGE: [f64; 2] = [-4.0, 4.0];

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("failed to read chart dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse chart dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

// =============================================================================
// DATASET
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoundMeta {
    pub ronda: String,
    pub fecha_informe: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LabScore {
    pub lab: LabLabel,
    pub z_score: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyteSeries {
    pub id: LabLabel,
    pub nombre: String,
    #[serde(default)]
    pub unidades: String,
    pub resultados: Vec<LabScore>,
}

/// Contents of `ensayos_aptitud.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoundDataset {
    pub meta: RoundMeta,
    pub analitos: Vec<AnalyteSeries>,
}

pub async fn load_dataset(path: &Path) -> Result<RoundDataset, ChartError> {
    let raw = tokio::fs::read_to_string(path).await.inspect_err(|e| {
        error!(error = %e, path = %path.display(), "chart dataset unreadable");
    })?;
    let dataset: RoundDataset = serde_json::from_str(&raw).inspect_err(|e| {
        error!(error = %e, path = %path.display(), "chart dataset malformed");
    })?;
    info!(round = %dataset.meta.ronda, analytes = dataset.analitos.len(), "chart dataset loaded");
    Ok(dataset)
}

// =============================================================================
// BANDS
// =============================================================================

/// Color band of a bar, by `|z|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// `|z| <= 2`
    Acceptable,
    /// `2 < |z| <= 3`
    Warning,
    /// `|z| > 3`
    Unsatisfactory,
}

impl Band {
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Acceptable => "#28a745",
            Self::Warning => "#ffc107",
            Self::Unsatisfactory => "#dc3545",
        }
    }
}

#[must_use]
pub fn band_for(z: f64) -> Band {
    let abs = z.abs();
    if abs > 3.0 {
        Band::Unsatisfactory
    } else if abs > 2.0 {
        Band::Warning
    } else {
        Band::Acceptable
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BandCounts {
    #[serde(rename = "aceptable")]
    pub acceptable: usize,
    #[serde(rename = "advertencia")]
    pub warning: usize,
    #[serde(rename = "insatisfactorio")]
    pub unsatisfactory: usize,
}

impl BandCounts {
    fn add(&mut self, band: Band) {
        match band {
            Band::Acceptable => self.acceptable += 1,
            Band::Warning => self.warning += 1,
            Band::Unsatisfactory => self.unsatisfactory += 1,
        }
    }
}

// =============================================================================
// FIGURES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub color: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTrace {
    pub x: Vec<LabLabel>,
    pub y: Vec<f64>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub marker: Marker,
    pub text: Vec<String>,
    pub hoverinfo: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

/// Band rectangle or threshold line spanning the full plot width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub xref: &'static str,
    pub yref: &'static str,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fillcolor: Option<&'static str>,
    pub line: ShapeLine,
}

impl Shape {
    fn band(y0: f64, y1: f64, fill: &'static str) -> Self {
        Self {
            kind: "rect",
            xref: "paper",
            yref: "y",
            x0: 0.0,
            x1: 1.0,
            y0,
            y1,
            fillcolor: Some(fill),
            line: ShapeLine { color: None, dash: None, width: Some(0) },
        }
    }

    fn threshold(y: f64, color: &'static str, dash: &'static str) -> Self {
        Self {
            kind: "line",
            xref: "paper",
            yref: "y",
            x0: 0.0,
            x1: 1.0,
            y0: y,
            y1: y,
            fillcolor: None,
            line: ShapeLine { color: Some(color), dash: Some(dash), width: None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YAxis {
    pub title: &'static str,
    pub range: [f64; 2],
    pub zeroline: bool,
    pub zerolinecolor: &'static str,
    pub zerolinewidth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: String,
    pub yaxis: YAxis,
    pub shapes: Vec<Shape>,
}

/// Everything needed to draw one analyte's chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyteChart {
    pub div_id: String,
    pub heading: String,
    pub data: Vec<BarTrace>,
    pub layout: Layout,
    pub counts: BandCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub header: String,
    pub charts: Vec<AnalyteChart>,
    pub counts: BandCounts,
}

fn threshold_shapes() -> Vec<Shape> {
    vec![
        Shape::band(-2.0, 2.0, "rgba(40, 167, 69, 0.1)"),
        Shape::threshold(2.0, "orange", "dash"),
        Shape::threshold(-2.0, "orange", "dash"),
        Shape::threshold(3.0, "red", "dot"),
        Shape::threshold(-3.0, "red", "dot"),
    ]
}

#[must_use]
pub fn build_chart(series: &AnalyteSeries) -> AnalyteChart {
    let mut counts = BandCounts::default();
    let mut colors = Vec::with_capacity(series.resultados.len());
    for r in &series.resultados {
        let band = band_for(r.z_score);
        counts.add(band);
        colors.push(band.color());
    }

    let trace = BarTrace {
        x: series.resultados.iter().map(|r| r.lab.clone()).collect(),
        y: series.resultados.iter().map(|r| r.z_score).collect(),
        kind: "bar",
        marker: Marker { color: colors },
        text: series.resultados.iter().map(|r| format!("Z: {}", r.z_score)).collect(),
        hoverinfo: "x+y+text",
    };

    AnalyteChart {
        div_id: format!("chart-{}", series.id),
        heading: format!("{} ({})", series.nombre, series.unidades),
        data: vec![trace],
        layout: Layout {
            title: format!("Desempeño (Z-Score) - {}", series.nombre),
            yaxis: YAxis { title: "Z-Score", range: Y_RANGE, zeroline: true, zerolinecolor: "#999", zerolinewidth: 2 },
            shapes: threshold_shapes(),
        },
        counts,
    }
}

#[must_use]
pub fn build_report(dataset: &RoundDataset) -> RoundReport {
    let charts: Vec<AnalyteChart> = dataset.analitos.iter().map(build_chart).collect();
    let counts = charts.iter().fold(BandCounts::default(), |acc, c| BandCounts {
        acceptable: acc.acceptable + c.counts.acceptable,
        warning: acc.warning + c.counts.warning,
        unsatisfactory: acc.unsatisfactory + c.counts.unsatisfactory,
    });
    RoundReport {
        header: format!("Ronda: {} (Fecha: {})", dataset.meta.ronda, dataset.meta.fecha_informe),
        charts,
        counts,
    }
}

#[cfg(test)]
#[path = "charts_test.rs"]
mod tests;
