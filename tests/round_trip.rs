mod common;

use aws_sdk_dynamodb::types::AttributeValue;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::{TempDir, tempdir};

use common::{sorted_by_id, user, users, users_schema};
use dynadump::errors::DumpError;
use dynadump::export::export_table;
use dynadump::import::{ImportJob, ImportOutcome, import_data, import_table};
use dynadump::progress::{NoopProgress, Phase, Progress};
use dynadump::store::{MemoryStore, TableStore};

fn job(dir: &TempDir, source: &str, destination: &str, row_limit: u64) -> ImportJob {
    ImportJob {
        source_dir: dir.path().to_path_buf(),
        source_table: source.to_string(),
        destination_table: destination.to_string(),
        row_limit,
    }
}

#[derive(Default)]
struct CountingProgress {
    counts: Mutex<Vec<u64>>,
    failed: AtomicU64,
    finished: AtomicU64,
}

impl Progress for CountingProgress {
    fn item_processed(&self, _table: &str, count: u64) {
        self.counts.lock().unwrap().push(count);
    }

    fn item_failed(&self, _table: &str, _error: &DumpError) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn table_finished(&self, _phase: Phase, _table: &str, count: u64) {
        self.finished.store(count, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn export_then_import_restores_schema_and_items() {
    let dir = tempdir().unwrap();
    let source = MemoryStore::new().with_page_size(3);
    source.insert_table(users_schema("users"), users(10));

    let summary = export_table(&source, "users", dir.path(), &NoopProgress).await.unwrap();
    assert_eq!(summary.items, 10);
    assert_eq!(summary.pages, 4);

    let target = MemoryStore::new();
    let imported = import_table(&target, &job(&dir, "users", "users-copy", 0), &NoopProgress)
        .await
        .unwrap();
    assert_eq!(imported.written, 10);
    assert_eq!(imported.outcome, ImportOutcome::SourceExhausted);

    let restored = target.describe_table("users-copy").await.unwrap();
    let original = users_schema("users");
    assert_eq!(restored.key_schema, original.key_schema);
    assert_eq!(restored.attribute_definitions, original.attribute_definitions);
    assert_eq!(restored.global_secondary_indexes, original.global_secondary_indexes);
    assert_eq!(restored.local_secondary_indexes, None);

    assert_eq!(sorted_by_id(target.items("users-copy").unwrap()), users(10));
}

#[tokio::test]
async fn empty_table_round_trips() {
    let dir = tempdir().unwrap();
    let store = MemoryStore::new();
    store.insert_table(users_schema("empty"), Vec::new());

    export_table(&store, "empty", dir.path(), &NoopProgress).await.unwrap();
    let text = std::fs::read_to_string(dir.path().join("empty.data.json")).unwrap();
    let envelope: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(envelope["data"], serde_json::json!([]));
    assert_eq!(envelope["total"], 0);

    let summary = import_table(&store, &job(&dir, "empty", "empty", 0), &NoopProgress)
        .await
        .unwrap();
    assert_eq!(summary.attempted, 0);
    assert_eq!(store.items("empty").unwrap(), Vec::new());
}

#[tokio::test]
async fn envelope_total_matches_data_for_any_page_size() {
    for (count, page_size) in [(1, 1), (7, 7), (7, 3), (12, 5), (5, 100)] {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new()
            .with_page_size(page_size)
            .with_cursor_on_full_pages(true);
        store.insert_table(users_schema("t"), users(count));

        let summary = export_table(&store, "t", dir.path(), &NoopProgress).await.unwrap();
        assert_eq!(summary.items, count as u64);

        let text = std::fs::read_to_string(&summary.data_path).unwrap();
        let envelope: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(envelope["data"].as_array().unwrap().len(), count);
        assert_eq!(envelope["total"], count as u64);
    }
}

#[tokio::test]
async fn row_limit_bounds_write_attempts() {
    let dir = tempdir().unwrap();
    let source = MemoryStore::new().with_page_size(4);
    source.insert_table(users_schema("users"), users(10));
    export_table(&source, "users", dir.path(), &NoopProgress).await.unwrap();

    for (limit, attempts, outcome) in [
        (1, 1, ImportOutcome::LimitReached),
        (3, 3, ImportOutcome::LimitReached),
        (10, 10, ImportOutcome::LimitReached),
        (11, 10, ImportOutcome::SourceExhausted),
        (0, 10, ImportOutcome::SourceExhausted),
    ] {
        let target = MemoryStore::new();
        let summary = import_table(&target, &job(&dir, "users", "users", limit), &NoopProgress)
            .await
            .unwrap();

        assert_eq!(summary.attempted, attempts, "limit {}", limit);
        assert_eq!(target.put_attempts() as u64, attempts, "limit {}", limit);
        assert_eq!(summary.outcome, outcome, "limit {}", limit);
        assert_eq!(sorted_by_id(target.items("users").unwrap()), users(attempts as usize));
    }
}

#[tokio::test]
async fn rejected_items_do_not_stop_the_import() {
    let dir = tempdir().unwrap();
    let source = MemoryStore::new();
    source.insert_table(users_schema("users"), users(6));
    export_table(&source, "users", dir.path(), &NoopProgress).await.unwrap();

    let target = MemoryStore::new().with_put_filter(|item| {
        matches!(item.get("id"), Some(AttributeValue::N(n)) if n == "1" || n == "4")
    });
    let progress = CountingProgress::default();
    let summary = import_table(&target, &job(&dir, "users", "users", 0), &progress)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 6);
    assert_eq!(summary.written, 4);
    assert_eq!(summary.failed, 2);
    assert_eq!(*progress.counts.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(progress.failed.load(Ordering::SeqCst), 2);
    assert_eq!(progress.finished.load(Ordering::SeqCst), 4);

    let ids: Vec<_> = sorted_by_id(target.items("users").unwrap())
        .into_iter()
        .map(|item| item["id"].clone())
        .collect();
    assert_eq!(
        ids,
        ["0", "2", "3", "5"]
            .iter()
            .map(|n| AttributeValue::N(n.to_string()))
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn failed_scan_surfaces_error_and_closes_file() {
    let dir = tempdir().unwrap();
    let store = MemoryStore::new().with_page_size(2).with_scan_failure_at(1);
    store.insert_table(users_schema("users"), users(5));

    let err = export_table(&store, "users", dir.path(), &NoopProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, DumpError::Transport { .. }), "{:?}", err);

    let partial = std::fs::read_to_string(dir.path().join("users.data.json")).unwrap();
    assert!(partial.contains(r#""1""#));
    assert!(!partial.contains("total"));
}

#[tokio::test]
async fn missing_table_fails_export() {
    let dir = tempdir().unwrap();
    let store = MemoryStore::new();
    let err = export_table(&store, "ghost", dir.path(), &NoopProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, DumpError::TableNotFound(ref t) if t == "ghost"));
}

#[tokio::test]
async fn missing_artifacts_are_not_found() {
    let dir = tempdir().unwrap();
    let store = MemoryStore::new();

    let err = import_table(&store, &job(&dir, "nope", "nope", 0), &NoopProgress)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = import_data(&store, &job(&dir, "nope", "nope", 0), &NoopProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, DumpError::ArtifactNotFound { .. }));
}

#[tokio::test]
async fn imports_envelopes_in_the_legacy_layout() {
    let dir = tempdir().unwrap();
    let store = MemoryStore::new();
    store.insert_table(users_schema("legacy"), Vec::new());

    std::fs::write(
        dir.path().join("legacy.data.json"),
        "{ \"data\": [\r{\"id\":{\"N\":\"1\"},\"email\":{\"S\":\"a@b.c\"}},\r{\"id\":{\"N\":\"2\"},\"email\":{\"S\":\"d@e.f\"}}\r], \"total\": 2 }",
    )
    .unwrap();

    let summary = import_data(&store, &job(&dir, "legacy", "legacy", 0), &NoopProgress)
        .await
        .unwrap();
    assert_eq!(summary.written, 2);
    assert_eq!(store.items("legacy").unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_data_aborts_the_import() {
    let dir = tempdir().unwrap();
    let store = MemoryStore::new();
    store.insert_table(users_schema("broken"), Vec::new());

    let mut first = serde_json::to_string(&dynadump::conversions::item_to_json(&user(1)).unwrap()).unwrap();
    first.insert_str(0, "{\"data\": [");
    first.push_str(", {\"id\": ");
    std::fs::write(dir.path().join("broken.data.json"), first).unwrap();

    let err = import_data(&store, &job(&dir, "broken", "broken", 0), &NoopProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, DumpError::MalformedArtifact { .. }), "{:?}", err);
    assert_eq!(store.items("broken").unwrap(), vec![user(1)]);
}
