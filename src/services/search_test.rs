use super::*;

fn entry(title: &str, content: &str) -> IndexEntry {
    IndexEntry {
        title: title.into(),
        content: content.into(),
        kind: "paragraph".into(),
        page: "Inicio".into(),
        path: "/index.html".into(),
    }
}

#[test]
fn short_queries_return_nothing() {
    let index = vec![entry("Ensayos", "ab")];
    assert!(search(&index, "ab").is_empty());
    assert!(search(&index, "  ab  ").is_empty());
    assert_eq!(normalize_query(" ENS "), Some("ens".into()));
}

#[test]
fn scoring_weights() {
    let e = entry("Ensayos de aptitud", "Participe en los ensayos de aptitud");
    // title +10, content +5, "ensayos" +3 +1, "de" +3 +1, "aptitud" +3 +1
    assert_eq!(score(&e, "ensayos de aptitud"), 27);
    assert_eq!(score(&entry("Otro", "nada"), "ensayos"), 0);
    assert_eq!(score(&entry("Calidad", "control de calidad"), "calidad"), 19);
}

#[test]
fn results_sorted_by_score_then_index_order() {
    let index = vec![
        entry("Contacto", "escríbanos sobre calidad"),
        entry("Calidad", "gestión de la calidad"),
        entry("Nosotros", "calidad total"),
    ];
    let hits = search(&index, "calidad");
    let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, ["<mark>Calidad</mark>", "Contacto", "Nosotros"]);
    assert_eq!(hits[0].score, 19);
    assert_eq!(hits[1].score, 6);
}

#[test]
fn results_are_capped() {
    let index: Vec<IndexEntry> = (0..15).map(|i| entry(&format!("Ronda {i}"), "ronda")).collect();
    assert_eq!(search(&index, "ronda").len(), MAX_RESULTS);
}

#[test]
fn zero_score_entries_are_dropped() {
    let index = vec![entry("Uroanálisis", "tiras reactivas"), entry("Química", "glucosa")];
    let hits = search(&index, "glucosa");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page, "Inicio");
}

#[test]
fn highlight_escapes_then_marks_case_insensitively() {
    assert_eq!(highlight("Control <b>GLUCOSA</b>", "glucosa"), "Control &lt;b&gt;<mark>GLUCOSA</mark>&lt;/b&gt;");
    assert_eq!(highlight("Química clínica", "clínica"), "Química <mark>clínica</mark>");
    assert_eq!(highlight("sin coincidencias", "xyz"), "sin coincidencias");
}

#[test]
fn highlight_marks_every_word() {
    assert_eq!(
        highlight("Ensayos de Aptitud", "ensayos aptitud"),
        "<mark>Ensayos</mark> de <mark>Aptitud</mark>"
    );
}

#[test]
fn snippet_truncates_at_120_chars() {
    let long = "á".repeat(130);
    let snippet = truncate_snippet(&long);
    assert_eq!(snippet.chars().count(), 123);
    assert!(snippet.ends_with("..."));
    assert_eq!(truncate_snippet("corto"), "corto");
    assert_eq!(truncate_snippet(&"x".repeat(120)), "x".repeat(120));
}

#[tokio::test]
async fn bundled_index_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("site/data/search_index.json");
    let index = load_index(&path).await.unwrap();
    assert!(!index.is_empty());
}
