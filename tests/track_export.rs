// tests/track_export.rs
use lead_scout::{ExportFormat, Item, Status, Tracker};

fn seeded_tracker(dir: &tempfile::TempDir) -> Tracker {
    let mut t = Tracker::open(dir.path().join("leads.json")).unwrap();
    let fp_a = t
        .track(
            &Item::new("a", "Rust Engineer, Platform", "https://a.com/1", "")
                .with_source("board_a"),
        )
        .unwrap();
    t.track(&Item::new("b", "Backend Engineer", "https://b.com/2", "").with_source("board_b"))
        .unwrap();
    t.update_status(&fp_a, Status::InProgress).unwrap();
    t
}

#[test]
fn csv_has_expected_header_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let t = seeded_tracker(&dir);

    let csv = t.export(ExportFormat::Csv, None).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "fingerprint,title,link,source,status,created_at,updated_at"
    );
    assert_eq!(lines.len(), 3);

    // a comma in the title forces quoting
    assert!(lines[1].contains("\"Rust Engineer, Platform\""));
    assert!(lines[1].contains("in_progress"));
    assert!(lines[2].contains("Backend Engineer"));
    assert!(lines[2].contains("new"));
}

#[test]
fn csv_rows_start_with_the_record_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let t = seeded_tracker(&dir);

    let csv = t.export(ExportFormat::Csv, None).unwrap();
    let all = t.get_all(None);
    for (line, rec) in csv.lines().skip(1).zip(&all) {
        assert!(line.starts_with(rec.fingerprint.as_str()));
    }
}

#[test]
fn json_export_parses_back_with_full_history() {
    let dir = tempfile::tempdir().unwrap();
    let t = seeded_tracker(&dir);

    let json = t.export(ExportFormat::Json, None).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let arr = parsed.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["item"]["title"], "Rust Engineer, Platform");
    assert_eq!(arr[0]["status"], "in_progress");
    assert_eq!(arr[0]["history"].as_array().unwrap().len(), 2);
    assert_eq!(arr[1]["status"], "new");
}

#[test]
fn status_filter_limits_export() {
    let dir = tempfile::tempdir().unwrap();
    let t = seeded_tracker(&dir);

    let csv = t.export(ExportFormat::Csv, Some(Status::New)).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("Backend Engineer"));
    assert!(!csv.contains("Platform"));

    // filter matching nothing still yields the header
    let empty = t.export(ExportFormat::Csv, Some(Status::Rejected)).unwrap();
    assert_eq!(empty.lines().count(), 1);
}

#[test]
fn export_to_file_writes_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let t = seeded_tracker(&dir);

    let out = dir.path().join("exports/leads.csv");
    t.export_to_file(&out, ExportFormat::Csv, None).unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("fingerprint,"));
    assert_eq!(written.lines().count(), 3);
    assert!(!out.with_file_name("leads.csv.tmp").exists());

    let json_out = dir.path().join("exports/leads.json");
    t.export_to_file(&json_out, ExportFormat::Json, None).unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_out).unwrap()).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
}
