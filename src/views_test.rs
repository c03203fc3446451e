use super::*;
use crate::model::LabLabel;
use crate::services::charts::{AnalyteSeries, LabScore, RoundDataset, RoundMeta, build_report};
use crate::services::session::Session;
use crate::state::test_helpers::test_identity;

fn signed_in_gate() -> GateView {
    let session = Session::new(&test_identity("lab@example.com"));
    GateView::for_session(Some(&session), "")
}

fn labs(names: &[&str]) -> LabOptions {
    LabOptions::Loaded(names.iter().map(|n| LaboratoryEntry { nombre: (*n).to_owned() }).collect())
}

#[test]
fn escape_html_covers_markup_characters() {
    assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
}

#[test]
fn page_uses_layout() {
    let html = render_page("A & B", "<p>body</p>", "");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>A &amp; B | CONCALAB-UASD</title>"));
    assert!(html.contains("<p>body</p>"));
    assert!(!html.contains("{{"));
}

// =============================================================================
// results page
// =============================================================================

#[test]
fn anonymous_visitor_sees_only_login() {
    let gate = GateView::for_session(None, "");
    let html = render_results_page(&ResultsView::new(gate, labs(&["Lab A"])));
    assert!(html.contains(r#"id="login-form""#));
    assert!(!html.contains(r#"id="results-form""#));
    assert!(!html.contains(r#"id="user-bar""#));
}

#[test]
fn login_error_is_shown_with_email_kept() {
    let mut view = ResultsView::new(GateView::for_session(None, ""), LabOptions::Failed);
    view.login = LoginView { email: "a@b.c".into(), error: Some("Correo o contraseña incorrectos.".into()) };
    let html = render_results_page(&view);
    assert!(html.contains(r#"value="a@b.c""#));
    assert!(html.contains("Correo o contraseña incorrectos."));
}

#[test]
fn signed_in_user_sees_form_and_prefilled_email() {
    let html = render_results_page(&ResultsView::new(signed_in_gate(), labs(&["Lab A", "Lab <B>"])));
    assert!(!html.contains(r#"id="login-form""#));
    assert!(html.contains(r#"id="user-bar""#));
    assert!(html.contains(r#"id="results-form""#));
    assert!(html.contains(r#"name="email_contacto" value="lab@example.com""#));
    assert!(html.contains(r#"<option value="Lab &lt;B&gt;">Lab &lt;B&gt;</option>"#));
    assert!(html.contains(r#"id="success-message" class="success" hidden"#));
    assert!(html.contains(r#"id="loading-message" class="loading" hidden"#));
    assert!(!html.contains(r#"data-busy-label="Enviando..." disabled"#));
}

#[test]
fn lab_load_failure_shows_alert_and_empty_select() {
    let html = render_results_page(&ResultsView::new(signed_in_gate(), LabOptions::Failed));
    assert!(html.contains(LOAD_FAILED_MESSAGE));
    assert!(html.contains(r#"<select id="lab-selector" name="laboratorio" required><option value="">Seleccione su laboratorio...</option></select>"#));
}

#[test]
fn validation_alert_keeps_user_values() {
    let mut fields = std::collections::HashMap::new();
    fields.insert("laboratorio".to_owned(), "Lab A".to_owned());
    fields.insert("codigo_ensayo".to_owned(), "EA-1".to_owned());
    fields.insert("instrument_chem_2".to_owned(), "Vitros".to_owned());
    let form = SubmissionForm::from_fields(fields);

    let mut view = ResultsView::from_form(signed_in_gate(), labs(&["Lab A"]), &form, SubmissionState::Idle);
    view.alert = Some("El código de ensayo debe tener el formato EA-###-####.".into());
    let html = render_results_page(&view);

    assert!(html.contains(r#"data-blocking="true">Error al enviar: El código de ensayo"#));
    assert!(html.contains(r#"<option value="Lab A" selected>"#));
    assert!(html.contains(r#"name="codigo_ensayo" value="EA-1""#));
    assert!(html.contains(r#"name="instrument_chem_2" value="Vitros""#));
}

#[test]
fn settled_submission_shows_success_and_disables_submit() {
    let form = SubmissionForm::default();
    let view = ResultsView::from_form(signed_in_gate(), labs(&[]), &form, SubmissionState::Settled);
    let html = render_results_page(&view);
    assert!(html.contains(&format!(r#"id="success-message" class="success">{}"#, escape_html(SUCCESS_MESSAGE))));
    assert!(html.contains(r#"data-busy-label="Enviando..." disabled>"#));
}

// =============================================================================
// analyte tables
// =============================================================================

#[test]
fn chemistry_results_are_numeric() {
    let html = render_analyte_table(Category::Chemistry, &catalog::build_rows(Category::Chemistry));
    assert!(html.contains(r#"id="analytes-table-chem""#));
    assert!(html.contains(r#"<input type="number" step="any" class="form-control result-input-chem" name="result_chem_0""#));
    assert!(html.contains(r#"name="unit_chem_25""#));
    assert_eq!(html.matches("<tr><td").count(), 26);
    assert!(html.contains(r#"data-category="chem" data-column="instrument""#));
    assert!(html.contains(r#"data-category="chem" data-column="method""#));
}

#[test]
fn urinalysis_results_are_free_text() {
    let html = render_analyte_table(Category::Urinalysis, &catalog::build_rows(Category::Urinalysis));
    assert!(html.contains(r#"<input type="text" class="form-control result-input-uro" name="result_uro_4""#));
    assert!(html.contains("<td class=\"analyte-name\">Cuerpos cetónicos</td>"));
    assert_eq!(html.matches("<tr><td").count(), 5);
}

// =============================================================================
// charts page
// =============================================================================

#[test]
fn charts_page_embeds_figures() {
    let dataset = RoundDataset {
        meta: RoundMeta { ronda: "EA-001-2025".into(), fecha_informe: "2025-04-10".into() },
        analitos: vec![AnalyteSeries {
            id: LabLabel::Number(1),
            nombre: "Glucosa".into(),
            unidades: "mg/dL".into(),
            resultados: vec![LabScore { lab: LabLabel::Text("</script>".into()), z_score: 2.5 }],
        }],
    };
    let html = render_charts_page(Some(&build_report(&dataset)));
    assert!(html.contains("<h3>Ronda: EA-001-2025 (Fecha: 2025-04-10)</h3>"));
    assert!(html.contains(r#"<div id="chart-1" class="chart">"#));
    assert!(html.contains(r#"id="chart-data""#));
    assert!(html.contains("#ffc107"));
    assert!(!html.contains("\"</script>\""));
    assert!(html.contains("plotly"));
}

#[test]
fn charts_page_error_markup() {
    let html = render_charts_page(None);
    assert!(html.contains(r#"<div id="charts-container">"#));
    assert!(html.contains(CHART_ERROR_MARKUP));
}
