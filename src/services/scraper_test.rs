use super::*;

fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

#[test]
fn field_names_follow_suffix_and_index() {
    assert_eq!(field_name(RowField::Result, Category::Chemistry, 0), "result_chem_0");
    assert_eq!(field_name(RowField::Instrument, Category::Urinalysis, 4), "instrument_uro_4");
}

#[test]
fn read_rows_covers_whole_catalog() {
    let rows = read_rows(&HashMap::new(), Category::Chemistry);
    assert_eq!(rows.len(), 26);
    assert_eq!(rows[1].name, "Ácido Úrico");
    assert!(rows.iter().all(|r| !r.is_populated()));
}

#[test]
fn blank_rows_are_dropped() {
    let submitted = fields(&[("method_chem_0", "Enzimático"), ("unit_chem_0", "mg/dL")]);
    assert!(scrape_table(&submitted, Category::Chemistry).is_empty());
}

#[test]
fn rows_with_result_or_instrument_are_kept_in_order() {
    let submitted = fields(&[
        ("result_chem_6", "1.1"),
        ("unit_chem_6", "mg/dL"),
        ("instrument_chem_0", "Cobas c311"),
        ("method_chem_0", "GOD-PAP"),
        ("result_chem_0", "98.5"),
        ("instrument_chem_2", "Cobas c311"),
    ]);
    let scraped = scrape_table(&submitted, Category::Chemistry);
    let names: Vec<&str> = scraped.iter().map(|r| r.analyte.as_str()).collect();
    assert_eq!(names, ["Glucosa", "Colesterol", "Creatinina"]);
    assert_eq!(scraped[0].method, "GOD-PAP");
    assert_eq!(scraped[0].result, "98.5");
    assert_eq!(scraped[1].result, "");
    assert_eq!(scraped[2].unit, "mg/dL");
    assert!(scraped.iter().all(|r| r.category == Category::Chemistry));
}

#[test]
fn category_tag_matches_source_table() {
    let submitted = fields(&[("result_uro_0", "++"), ("result_chem_0", "101")]);
    let uro = scrape_table(&submitted, Category::Urinalysis);
    assert_eq!(uro.len(), 1);
    assert_eq!(uro[0].category, Category::Urinalysis);
    assert_eq!(uro[0].analyte, "Proteínas");
    assert_eq!(uro[0].result, "++");
}

#[test]
fn values_are_trimmed() {
    let submitted = fields(&[("result_uro_4", "  neg "), ("instrument_uro_3", "   ")]);
    let uro = scrape_table(&submitted, Category::Urinalysis);
    assert_eq!(uro.len(), 1);
    assert_eq!(uro[0].analyte, "Nitritos");
    assert_eq!(uro[0].result, "neg");
}

#[test]
fn raw_rows_keep_padding() {
    let submitted = fields(&[("instrument_uro_0", " Clinitek "), ("instrument_uro_1", "  ")]);
    let rows = read_raw_rows(&submitted, Category::Urinalysis);
    assert_eq!(rows[0].instrument, " Clinitek ");
    assert_eq!(rows[1].instrument, "  ");
    assert_eq!(rows[2].instrument, "");
}

#[test]
fn out_of_range_indices_are_ignored() {
    let submitted = fields(&[("result_uro_9", "+")]);
    assert!(scrape_table(&submitted, Category::Urinalysis).is_empty());
}
