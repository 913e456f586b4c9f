//! File-backed stores: JSON progress and SQLite results on disk.

use std::sync::Arc;

use recall_core::config::ResultsConfig;
use recall_core::{Catalog, RecallConfig, ResultRecord, TaskId};
use recall_host::{JsonProgressStore, ProgressStore, ProgressTracker, ResultsStore, SqliteResultsStore, VisitorId};

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::standard(&RecallConfig::default()).expect("catalog"))
}

#[test]
fn json_progress_round_trips_per_visitor_and_set() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonProgressStore::open(dir.path().join("progress.json"));
    let ada = VisitorId::new("ada");
    let bob = VisitorId::new("bob");

    assert_eq!(store.load_level(&ada, "standard").expect("load"), None);
    store.save_level(&ada, "standard", 3).expect("save");
    store.save_level(&ada, "kids", 1).expect("save");
    store.save_level(&bob, "standard", 5).expect("save");

    let reopened = JsonProgressStore::open(store.path());
    assert_eq!(reopened.load_level(&ada, "standard").expect("load"), Some(3));
    assert_eq!(reopened.load_level(&ada, "kids").expect("load"), Some(1));
    assert_eq!(reopened.load_level(&bob, "standard").expect("load"), Some(5));
}

#[test]
fn corrupt_progress_file_starts_fresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.json");
    std::fs::write(&path, b"{ not json").expect("write");

    let store = JsonProgressStore::open(&path);
    let ada = VisitorId::new("ada");
    assert_eq!(store.load_level(&ada, "standard").expect("load"), None);

    store.save_level(&ada, "standard", 2).expect("save");
    assert_eq!(store.load_level(&ada, "standard").expect("load"), Some(2));
}

#[test]
fn tracker_progress_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("progress.json");
    let ada = VisitorId::new("ada");

    {
        let store: Arc<dyn ProgressStore> = Arc::new(JsonProgressStore::open(&path));
        let mut tracker = ProgressTracker::load(ada.clone(), catalog(), store).expect("tracker");
        tracker.record_pass("digit-span").expect("pass");
        tracker.record_pass("backward-digit-span").expect("pass");
    }

    let store: Arc<dyn ProgressStore> = Arc::new(JsonProgressStore::open(&path));
    let tracker = ProgressTracker::load(ada, catalog(), store).expect("tracker");
    assert_eq!(tracker.unlocked_level(), 2);
    assert!(tracker.is_unlocked("letter-span"));
    assert!(!tracker.is_unlocked("pattern-grid"));
}

#[test]
fn stored_level_beyond_catalog_is_clamped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(JsonProgressStore::open(dir.path().join("progress.json")));
    store.save_level(&VisitorId::new("ada"), "standard", 99).expect("save");

    let tracker = ProgressTracker::load(VisitorId::new("ada"), catalog(), store).expect("tracker");
    assert_eq!(tracker.unlocked_level(), 7);
}

#[test]
fn sqlite_results_in_wal_mode_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("results.db");
    let store = SqliteResultsStore::open(&path, &ResultsConfig::default()).expect("open");

    for score in [40, 90, 75] {
        store
            .save_result(&ResultRecord {
                visitor_id: "ada".to_string(),
                task_id: TaskId::new("letter-span"),
                score,
            })
            .expect("save");
    }

    let results = store.results_for("ada").expect("results");
    assert_eq!(results.iter().map(|r| r.record.score).collect::<Vec<_>>(), vec![40, 90, 75]);
    assert_eq!(
        store.best_score("ada", &TaskId::new("letter-span")).expect("best"),
        Some(90)
    );
    assert!(path.exists());
}

#[test]
fn json_store_keeps_the_higher_level_across_trackers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store: Arc<dyn ProgressStore> = Arc::new(JsonProgressStore::open(dir.path().join("progress.json")));
    let ada = VisitorId::new("ada");
    let mut stale = ProgressTracker::load(ada.clone(), catalog(), Arc::clone(&store)).expect("tracker a");
    let mut fresh = ProgressTracker::load(ada.clone(), catalog(), Arc::clone(&store)).expect("tracker b");

    assert!(fresh.unlock("color-sequence").expect("unlock"));
    assert_eq!(stale.record_pass("digit-span").expect("pass"), None);
    assert_eq!(store.load_level(&ada, "standard").expect("load"), Some(4));
    assert_eq!(store.raise_level(&ada, "standard", 2).expect("raise"), 4);
    assert_eq!(store.load_level(&ada, "standard").expect("load"), Some(4));
}
