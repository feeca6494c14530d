// tests/backup_sink.rs
use lead_scout::track::backup::{backup_store_once, BackupSink, DirSink, MockSink};
use lead_scout::{Item, Tracker};

#[tokio::test]
async fn backup_sink_receives_the_store_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("leads.json");
    let mut t = Tracker::open(&store_path).unwrap();
    t.track(&Item::new("a", "Lead A", "https://example.com/a", ""))
        .unwrap();

    let sink = MockSink::new();
    backup_store_once(&store_path, &sink).await.expect("ok");

    let calls = sink.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (name, contents) = &calls[0];
    assert!(name.starts_with("tracked-"));
    assert!(name.ends_with(".json"));
    assert!(contents.contains("Lead A"));
}

#[tokio::test]
async fn missing_store_backs_up_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let sink = MockSink::new();
    backup_store_once(&dir.path().join("never_written.json"), &sink)
        .await
        .expect("ok");
    assert!(sink.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn dir_sink_writes_a_restorable_file() {
    let dir = tempfile::tempdir().unwrap();
    let backups = dir.path().join("backups");

    let sink = DirSink::new(&backups);
    sink.store("tracked-20250101T000000Z.json", "{\"records\": []}")
        .await
        .expect("ok");

    let written = backups.join("tracked-20250101T000000Z.json");
    assert_eq!(
        std::fs::read_to_string(written).unwrap(),
        "{\"records\": []}"
    );
}
