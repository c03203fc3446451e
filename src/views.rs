//! Server-rendered HTML for the portal pages.
//!
//! Pages are assembled from escaped fragments inside the shared
//! `templates/layout.html` shell. Every user-supplied or file-sourced string
//! goes through [`escape_html`] before it reaches the output.

use crate::model::{AnalyteRow, Category, LaboratoryEntry};
use crate::services::auth::GateView;
use crate::services::catalog::{self, CopyColumn, InputMode};
use crate::services::charts::{CHART_ERROR_MARKUP, RoundReport};
use crate::services::laboratories::LOAD_FAILED_MESSAGE;
use crate::services::scraper::{self, RowField};
use crate::services::submission::{
    FIELD_COMMENTS, FIELD_CONTACT_EMAIL, FIELD_LABORATORY, FIELD_REPORT_DATE, FIELD_ROUND_CODE, SubmissionForm,
    SubmissionState,
};

const LAYOUT: &str = include_str!("../templates/layout.html");
const PLOTLY_SCRIPT: &str = r#"    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js" defer></script>"#;

pub const SUCCESS_MESSAGE: &str = "¡Resultados enviados con éxito! Gracias por su participación.";
pub const SUBMIT_ERROR_PREFIX: &str = "Error al enviar: ";

#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Wrap `body` in the site layout. `title` is escaped, `body` and `scripts` are not.
#[must_use]
pub fn render_page(title: &str, body: &str, scripts: &str) -> String {
    LAYOUT
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{SCRIPTS}}", scripts)
        .replace("{{BODY}}", body)
}

fn hidden_attr(visible: bool) -> &'static str {
    if visible { "" } else { " hidden" }
}

/// Blocking alert; the page script raises it as a dialog on load.
fn render_alert(message: &str) -> String {
    format!(r#"<div class="alert alert-error" role="alert" data-blocking="true">{}</div>"#, escape_html(message))
}

// =============================================================================
// VIEW MODELS
// =============================================================================

/// Laboratory selection control contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabOptions {
    Loaded(Vec<LaboratoryEntry>),
    Failed,
}

/// Header fields of the results form, as last entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub laboratory: String,
    pub round_code: String,
    pub report_date: String,
    pub comments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginView {
    pub email: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsView {
    pub gate: GateView,
    pub login: LoginView,
    pub labs: LabOptions,
    pub values: FormValues,
    pub chemistry: Vec<AnalyteRow>,
    pub urinalysis: Vec<AnalyteRow>,
    pub alert: Option<String>,
    pub state: SubmissionState,
}

impl ResultsView {
    /// Fresh page: empty tables, idle form.
    #[must_use]
    pub fn new(gate: GateView, labs: LabOptions) -> Self {
        Self {
            gate,
            login: LoginView::default(),
            labs,
            values: FormValues::default(),
            chemistry: catalog::build_rows(Category::Chemistry),
            urinalysis: catalog::build_rows(Category::Urinalysis),
            alert: None,
            state: SubmissionState::Idle,
        }
    }

    /// Page re-rendered with what the user submitted.
    #[must_use]
    pub fn from_form(gate: GateView, labs: LabOptions, form: &SubmissionForm, state: SubmissionState) -> Self {
        Self {
            values: FormValues {
                laboratory: form.laboratory.clone(),
                round_code: form.round_code.clone(),
                report_date: form.report_date.clone(),
                comments: form.comments.clone(),
            },
            chemistry: scraper::read_rows(&form.table_fields, Category::Chemistry),
            urinalysis: scraper::read_rows(&form.table_fields, Category::Urinalysis),
            state,
            ..Self::new(gate, labs)
        }
    }

    #[must_use]
    pub fn rows(&self, category: Category) -> &[AnalyteRow] {
        match category {
            Category::Chemistry => &self.chemistry,
            Category::Urinalysis => &self.urinalysis,
        }
    }
}

// =============================================================================
// LOGIN
// =============================================================================

#[must_use]
pub fn render_login(view: &LoginView) -> String {
    let error = view
        .error
        .as_deref()
        .map(|e| format!(r#"<p class="login-error" role="alert">{}</p>"#, escape_html(e)))
        .unwrap_or_default();
    format!(
        r#"<section id="login-section" class="card">
<h2>Acceso de laboratorios</h2>
<form id="login-form" method="post" action="/login">
<label for="login-email">Correo electrónico</label>
<input type="email" id="login-email" name="email" value="{email}" required autocomplete="username">
<label for="login-password">Contraseña</label>
<input type="password" id="login-password" name="password" required autocomplete="current-password">
{error}<button type="submit" id="login-btn" class="btn" data-busy-label="Ingresando...">Ingresar</button>
</form>
</section>"#,
        email = escape_html(&view.email),
    )
}

fn render_user_bar(email: &str) -> String {
    format!(
        r#"<div id="user-bar" class="user-bar"><span>{}</span><form method="post" action="/logout"><button type="submit" class="btn btn-link">Cerrar sesión</button></form></div>"#,
        escape_html(email)
    )
}

// =============================================================================
// RESULTS FORM
// =============================================================================

fn render_lab_select(labs: &LabOptions, selected: &str) -> String {
    let mut options = String::from(r#"<option value="">Seleccione su laboratorio...</option>"#);
    if let LabOptions::Loaded(entries) = labs {
        for lab in entries {
            let name = escape_html(&lab.nombre);
            let sel = if lab.nombre == selected { " selected" } else { "" };
            options.push_str(&format!(r#"<option value="{name}"{sel}>{name}</option>"#));
        }
    }
    format!(r#"<select id="lab-selector" name="{FIELD_LABORATORY}" required>{options}</select>"#)
}

fn copy_down_button(category: Category, column: CopyColumn) -> String {
    let column = match column {
        CopyColumn::Instrument => "instrument",
        CopyColumn::Method => "method",
    };
    format!(
        r#"<button type="button" class="copy-down" data-category="{}" data-column="{column}" title="Copiar el primer valor hacia abajo">&#8681;</button>"#,
        category.suffix()
    )
}

fn text_input(field: RowField, category: Category, index: usize, value: &str) -> String {
    format!(
        r#"<input type="text" class="form-control {key}-input-{suffix}" name="{name}" value="{value}">"#,
        key = field.key(),
        suffix = category.suffix(),
        name = scraper::field_name(field, category, index),
        value = escape_html(value),
    )
}

fn result_input(category: Category, index: usize, value: &str) -> String {
    let kind = match catalog::result_input_mode(category) {
        InputMode::Numeric => r#"type="number" step="any""#,
        InputMode::FreeText => r#"type="text""#,
    };
    format!(
        r#"<input {kind} class="form-control result-input-{suffix}" name="{name}" value="{value}">"#,
        suffix = category.suffix(),
        name = scraper::field_name(RowField::Result, category, index),
        value = escape_html(value),
    )
}

/// One analyte table with a row per catalog entry.
#[must_use]
pub fn render_analyte_table(category: Category, rows: &[AnalyteRow]) -> String {
    let suffix = category.suffix();
    let mut body = String::new();
    for (i, row) in rows.iter().enumerate() {
        body.push_str(&format!(
            r#"<tr><td class="analyte-name">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            escape_html(&row.name),
            text_input(RowField::Instrument, category, i, &row.instrument),
            text_input(RowField::Method, category, i, &row.method),
            result_input(category, i, &row.result),
            text_input(RowField::Unit, category, i, &row.unit),
        ));
        body.push('\n');
    }
    format!(
        r#"<h3>{label}</h3>
<table id="analytes-table-{suffix}" class="analytes-table">
<thead><tr><th>Analito</th><th>Instrumento {copy_instrument}</th><th>Método {copy_method}</th><th>Resultado</th><th>Unidades</th></tr></thead>
<tbody>
{body}</tbody>
</table>"#,
        label = escape_html(category.label()),
        copy_instrument = copy_down_button(category, CopyColumn::Instrument),
        copy_method = copy_down_button(category, CopyColumn::Method),
    )
}

fn render_results_form(view: &ResultsView) -> String {
    let mut out = String::new();

    let settled = view.state == SubmissionState::Settled;
    out.push_str(&format!(
        r#"<div id="success-message" class="success"{}>{}</div>"#,
        hidden_attr(settled),
        escape_html(SUCCESS_MESSAGE)
    ));
    out.push('\n');

    if view.labs == LabOptions::Failed {
        out.push_str(&render_alert(LOAD_FAILED_MESSAGE));
        out.push('\n');
    }
    if let Some(message) = &view.alert {
        out.push_str(&render_alert(&format!("{SUBMIT_ERROR_PREFIX}{message}")));
        out.push('\n');
    }

    let tables: String =
        Category::ALL.into_iter().map(|c| render_analyte_table(c, view.rows(c))).collect::<Vec<_>>().join("\n");
    let disabled = if view.state.submit_enabled() { "" } else { " disabled" };

    out.push_str(&format!(
        r#"<form id="results-form" method="post" action="/resultados">
<label for="lab-selector">Laboratorio</label>
{lab_select}
<label for="round-code">Código de ensayo</label>
<input type="text" id="round-code" name="{FIELD_ROUND_CODE}" value="{round_code}" placeholder="EA-001-2025" required>
<label for="report-date">Fecha de reporte</label>
<input type="date" id="report-date" name="{FIELD_REPORT_DATE}" value="{report_date}">
<label for="contact-email">Correo de contacto</label>
<input type="email" id="contact-email" name="{FIELD_CONTACT_EMAIL}" value="{contact_email}">
{tables}
<label for="comments">Comentarios</label>
<textarea id="comments" name="{FIELD_COMMENTS}" rows="3">{comments}</textarea>
<div id="loading-message" class="loading"{loading_hidden}>Enviando resultados...</div>
<button type="submit" id="submit-btn" class="btn" data-busy-label="Enviando..."{disabled}>Enviar resultados</button>
</form>"#,
        lab_select = render_lab_select(&view.labs, &view.values.laboratory),
        round_code = escape_html(&view.values.round_code),
        report_date = escape_html(&view.values.report_date),
        contact_email = escape_html(&view.gate.contact_email),
        comments = escape_html(&view.values.comments),
        loading_hidden = hidden_attr(view.state.progress_visible()),
    ));
    out
}

/// The gated results page: login for anonymous visitors, form otherwise.
#[must_use]
pub fn render_results_page(view: &ResultsView) -> String {
    let mut body = String::from("<h1>Reporte de resultados</h1>\n");
    if view.gate.login_visible {
        body.push_str(&render_login(&view.login));
        body.push('\n');
    }
    if view.gate.user_bar_visible {
        if let Some(email) = &view.gate.user_email {
            body.push_str(&render_user_bar(email));
            body.push('\n');
        }
    }
    if view.gate.form_visible {
        body.push_str(&render_results_form(view));
    }
    render_page("Reporte de resultados", &body, "")
}

// =============================================================================
// CHARTS
// =============================================================================

/// JSON safe to embed in a `<script>` element.
fn script_json<T: serde::Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value).ok().map(|s| s.replace('<', "\\u003c"))
}

fn render_charts_body(report: &RoundReport) -> Option<String> {
    let data = script_json(&report.charts)?;
    let mut out = format!(r#"<div class="report-header"><h3>{}</h3></div>"#, escape_html(&report.header));
    out.push_str(&format!(
        r#"
<ul class="band-counts">
<li class="band-acceptable">Aceptable (|Z| ≤ 2): {}</li>
<li class="band-warning">Advertencia (2 &lt; |Z| ≤ 3): {}</li>
<li class="band-unsatisfactory">Insatisfactorio (|Z| &gt; 3): {}</li>
</ul>"#,
        report.counts.acceptable, report.counts.warning, report.counts.unsatisfactory
    ));
    for chart in &report.charts {
        out.push_str(&format!(
            r#"
<div class="analito-wrapper section-light"><h3>{}</h3><div id="{}" class="chart"></div></div>"#,
            escape_html(&chart.heading),
            escape_html(&chart.div_id)
        ));
    }
    out.push_str(&format!("\n<script type=\"application/json\" id=\"chart-data\">{data}</script>"));
    Some(out)
}

/// Report page. `None` means the dataset could not be loaded.
#[must_use]
pub fn render_charts_page(report: Option<&RoundReport>) -> String {
    let inner = report.and_then(render_charts_body).unwrap_or_else(|| CHART_ERROR_MARKUP.to_owned());
    let body = format!("<h1>Informes de desempeño</h1>\n<div id=\"charts-container\">\n{inner}\n</div>");
    render_page("Informes", &body, PLOTLY_SCRIPT)
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;
