use std::path::Path;

use penseg::SegError;
use penseg::core::Dataset;
use penseg::data::{LoadOptions, RawRow, build_dataset, parse_text};
use penseg::selection::{
    SEGMENT_ID_KEY, Selection, SelectionSet, export_file_name, export_json, export_rows,
    import_selections_from_json, resolve_time_key, snap_to_samples,
};
use serde_json::{Value, json};

/// Eleven samples with raw times 100..=110, so normalized times are 0..=10.
fn dataset() -> Dataset {
    let xs: Vec<f64> = (0..=10).map(f64::from).collect();
    let ts: Vec<f64> = (100..=110).map(f64::from).collect();
    let ps = vec![1.0; xs.len()];
    Dataset::from_vectors(&xs, &xs, &ts, &ps).expect("dataset")
}

fn labelled(spans: &[(f64, f64, &str)]) -> SelectionSet {
    let mut set = SelectionSet::new();
    set.replace_all(
        spans
            .iter()
            .map(|&(t0, t1, label)| Selection::new(t0, t1).with_locked_label(label)),
    );
    set
}

#[test]
fn export_tags_covered_rows_with_segment_label() {
    let dataset = dataset();
    let set = labelled(&[(1.0, 3.0, "A"), (5.0, 7.0, "B")]);

    let rows = export_rows(&dataset, &set);
    let tags: Vec<(f64, &str)> = rows
        .iter()
        .map(|row| {
            (
                row["t"].as_f64().expect("t"),
                row[SEGMENT_ID_KEY].as_str().expect("tag"),
            )
        })
        .collect();
    assert_eq!(
        tags,
        vec![
            (101.0, "A"),
            (102.0, "A"),
            (103.0, "A"),
            (105.0, "B"),
            (106.0, "B"),
            (107.0, "B"),
        ]
    );
    // Source columns are carried through untouched and in order.
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["x", "y", "p", "t", SEGMENT_ID_KEY]);
}

#[test]
fn shared_boundary_sample_goes_to_earlier_selection() {
    let dataset = dataset();
    let set = labelled(&[(4.0, 6.0, "late"), (2.0, 4.0, "early")]);

    let rows = export_rows(&dataset, &set);
    let at_four: Vec<&Value> = rows
        .iter()
        .filter(|row| row["t"] == json!(104.0))
        .map(|row| &row[SEGMENT_ID_KEY])
        .collect();
    assert_eq!(at_four, vec![&json!("early")]);
}

#[test]
fn unlocked_selections_export_their_auto_number() {
    let dataset = dataset();
    let mut set = SelectionSet::new();
    set.add_or_merge_range(6.0, 8.0).expect("b");
    set.add_or_merge_range(1.0, 2.0).expect("a");

    let rows = export_rows(&dataset, &set);
    assert_eq!(rows.first().map(|r| &r[SEGMENT_ID_KEY]), Some(&json!("#1")));
    assert_eq!(rows.last().map(|r| &r[SEGMENT_ID_KEY]), Some(&json!("#2")));
}

#[test]
fn export_then_import_restores_labelled_spans() {
    let dataset = dataset();
    let set = labelled(&[(1.0, 3.0, "A"), (5.0, 7.0, "B")]);
    let json = export_json(&dataset, &set).expect("export");

    let imported = import_selections_from_json(&json, &dataset).expect("import");
    let spans: Vec<(f64, f64, &str, bool)> = imported
        .iter()
        .map(|s| (s.t0, s.t1, s.label.as_deref().unwrap_or_default(), s.locked))
        .collect();
    assert_eq!(
        spans,
        vec![(1.0, 3.0, "A", true), (5.0, 7.0, "B", true)]
    );
}

#[test]
fn off_grid_times_snap_to_nearest_samples() {
    let dataset = dataset();
    let text = json!([
        {"t": 101.3, SEGMENT_ID_KEY: "A"},
        {"t": 103.6, SEGMENT_ID_KEY: "A"},
    ])
    .to_string();

    let imported = import_selections_from_json(&text, &dataset).expect("import");
    assert_eq!(imported.len(), 1);
    assert_eq!((imported[0].t0, imported[0].t1), (1.0, 4.0));
}

#[test]
fn collapsed_and_unlabelled_groups_are_dropped() {
    let dataset = dataset();
    let text = json!([
        {"t": 102.0, SEGMENT_ID_KEY: "single"},
        {"t": 105.0, SEGMENT_ID_KEY: "tiny"},
        {"t": 105.1, SEGMENT_ID_KEY: "tiny"},
        {"t": 106.0, SEGMENT_ID_KEY: null},
        {"t": 107.0},
        {"t": 107.0, SEGMENT_ID_KEY: 7},
        {"t": 109.0, SEGMENT_ID_KEY: 7},
        "not a row",
    ])
    .to_string();

    let imported = import_selections_from_json(&text, &dataset).expect("import");
    let labels: Vec<&str> = imported
        .iter()
        .map(|s| s.label.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(labels, vec!["7"]);
}

#[test]
fn imported_selections_are_sorted_by_start() {
    let dataset = dataset();
    let text = json!([
        {"t": 106.0, SEGMENT_ID_KEY: "second"},
        {"t": 108.0, SEGMENT_ID_KEY: "second"},
        {"t": 101.0, SEGMENT_ID_KEY: "first"},
        {"t": 103.0, SEGMENT_ID_KEY: "first"},
    ])
    .to_string();

    let imported = import_selections_from_json(&text, &dataset).expect("import");
    let labels: Vec<&str> = imported
        .iter()
        .map(|s| s.label.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(labels, vec!["first", "second"]);
}

#[test]
fn import_falls_back_to_common_time_names() {
    let mut row = RawRow::new();
    row.insert("Time".to_owned(), json!(1.0));
    row.insert("x".to_owned(), json!(2.0));
    let rows = vec![row];
    assert_eq!(resolve_time_key(&rows, Some("t")), Some("Time".to_owned()));
    assert_eq!(resolve_time_key(&rows, Some("x")), Some("x".to_owned()));
    assert_eq!(resolve_time_key(&[], Some("t")), None);
}

#[test]
fn import_without_time_column_is_rejected() {
    let dataset = dataset();
    let text = json!([{"stamp": 1.0, SEGMENT_ID_KEY: "A"}]).to_string();
    assert!(matches!(
        import_selections_from_json(&text, &dataset),
        Err(SegError::InvalidData(_))
    ));
}

#[test]
fn import_rejects_non_array_payloads() {
    let dataset = dataset();
    assert!(matches!(
        import_selections_from_json("{\"t\": 1}", &dataset),
        Err(SegError::InvalidData(_))
    ));
    assert!(matches!(
        import_selections_from_json("not json", &dataset),
        Err(SegError::Json(_))
    ));
}

#[test]
fn snapping_clamps_to_sample_range() {
    let times = [0.0, 1.0, 2.0];
    assert_eq!(snap_to_samples(&times, -5.0), 0.0);
    assert_eq!(snap_to_samples(&times, 1.4), 1.0);
    assert_eq!(snap_to_samples(&times, 9.0), 2.0);
    assert_eq!(snap_to_samples(&[], 3.0), 3.0);
}

#[test]
fn export_file_name_uses_source_stem() {
    assert_eq!(
        export_file_name(Path::new("/data/subject_01.csv")),
        "subject_01_segmented.json"
    );
    assert_eq!(export_file_name(Path::new("")), "data_segmented.json");
}

#[test]
fn reused_label_on_disjoint_spans_imports_without_overlap() {
    let dataset = dataset();
    let text = json!([
        {"t": 101.0, SEGMENT_ID_KEY: "A"},
        {"t": 102.0, SEGMENT_ID_KEY: "A"},
        {"t": 104.0, SEGMENT_ID_KEY: "B"},
        {"t": 105.0, SEGMENT_ID_KEY: "B"},
        {"t": 107.0, SEGMENT_ID_KEY: "A"},
        {"t": 108.0, SEGMENT_ID_KEY: "A"},
    ])
    .to_string();

    let imported = import_selections_from_json(&text, &dataset).expect("import");
    let spans: Vec<(f64, f64, &str)> = imported
        .iter()
        .map(|s| (s.t0, s.t1, s.label.as_deref().unwrap_or_default()))
        .collect();
    assert_eq!(
        spans,
        vec![(1.0, 2.0, "A"), (4.0, 5.0, "B"), (7.0, 8.0, "A")]
    );

    let mut set = SelectionSet::new();
    set.replace_all(imported);
    let ordered = set.sorted_by_t0();
    for pair in ordered.windows(2) {
        assert!(pair[0].1.t1 <= pair[1].1.t0);
    }
}

#[test]
fn interleaved_rows_never_yield_overlapping_selections() {
    let dataset = dataset();
    let text = json!([
        {"t": 101.0, SEGMENT_ID_KEY: "A"},
        {"t": 108.0, SEGMENT_ID_KEY: "A"},
        {"t": 104.0, SEGMENT_ID_KEY: "B"},
        {"t": 105.0, SEGMENT_ID_KEY: "B"},
    ])
    .to_string();

    let imported = import_selections_from_json(&text, &dataset).expect("import");
    let labels: Vec<&str> = imported
        .iter()
        .map(|s| s.label.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(labels, vec!["A"]);
}

#[test]
fn export_keeps_source_cell_text() {
    let mut text = String::from("x,y,pressure,t\n");
    for i in 0..5 {
        text.push_str(&format!("{i},{},0.5,{}\n", 10 - i, 1_000 + 10 * i));
    }
    let table = parse_text(&text, "pen.csv").expect("parse");
    let dataset = build_dataset(&table, &LoadOptions::default())
        .expect("load")
        .dataset;
    let mut set = SelectionSet::new();
    set.add_or_merge_range(0.0, 40.0).expect("full span");

    let json = export_json(&dataset, &set).expect("export");
    assert!(json.contains("\"t\": 1000,"));
    assert!(json.contains("\"x\": 0,"));
    assert!(json.contains("\"pressure\": 0.5,"));
    assert!(!json.contains("1000.0"));

    let rows: Vec<Value> = serde_json::from_str(&json).expect("json");
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4]["t"], json!(1040));
}
