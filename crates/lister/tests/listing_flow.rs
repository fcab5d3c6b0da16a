use dirscope_lister::{
    EngineConfig, Lister, MemoryProbe, ScanError, ScanFilters, ScanRequest, SortKey, SortOrder,
};
use dirscope_protocol::ErrorCode;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Keeps RSS flat so governor decisions do not depend on the test process.
struct SteadyMemory;

impl MemoryProbe for SteadyMemory {
    fn resident_mb(&self) -> Option<f64> {
        Some(128.0)
    }
}

fn lister_with(config: EngineConfig) -> Lister {
    Lister::with_memory_probe(config, Arc::new(SteadyMemory))
}

fn lister() -> Lister {
    lister_with(EngineConfig::default())
}

fn write(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, body).expect("write file");
}

/// 3 top-level dirs with 7 files each, plus 2 root files and a hidden file.
fn nested_tree() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    for dir in ["alpha", "beta", "gamma"] {
        for i in 0..7 {
            let ext = if i % 2 == 0 { "rs" } else { "md" };
            write(&temp.path().join(dir).join(format!("f{i}.{ext}")), "x");
        }
    }
    write(&temp.path().join("README.md"), "readme");
    write(&temp.path().join("main.rs"), "fn main() {}");
    write(&temp.path().join(".secret"), "hidden");
    temp
}

fn request(dir: &Path, filters: ScanFilters) -> ScanRequest {
    ScanRequest::new(dir.to_string_lossy(), filters)
}

fn depth(max_depth: usize) -> ScanFilters {
    ScanFilters::new(
        max_depth,
        false,
        Vec::<String>::new(),
        SortKey::Name,
        SortOrder::Asc,
    )
}

#[test]
fn paging_through_offsets_visits_every_entry_once() {
    let temp = nested_tree();
    let lister = lister();
    let filters = depth(2);

    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let mut req = request(temp.path(), filters.clone());
        req.batch_size = 5;
        req.offset = offset;
        let response = lister.scan(&req).expect("scan page");
        assert_eq!(response.batch.total_count, 26);
        assert!(response.batch.entries.len() <= 5);
        seen.extend(
            response
                .batch
                .entries
                .iter()
                .map(|entry| entry.relative_path.clone()),
        );
        match response.batch.next_offset {
            Some(next) => offset = next,
            None => break,
        }
    }

    let unique: BTreeSet<&String> = seen.iter().collect();
    assert_eq!(seen.len(), 26);
    assert_eq!(unique.len(), 26);
    assert!(!seen.iter().any(|path| path.contains(".secret")));

    let mut whole = request(temp.path(), filters);
    whole.batch_size = 1000;
    let all: Vec<String> = lister
        .scan(&whole)
        .expect("scan all")
        .batch
        .entries
        .into_iter()
        .map(|entry| entry.relative_path)
        .collect();
    assert_eq!(seen, all);
}

#[test]
fn uncached_scans_of_an_unchanged_tree_agree() {
    let temp = nested_tree();
    let lister = lister();
    let mut req = request(
        temp.path(),
        ScanFilters::new(3, true, ["rs"], SortKey::Size, SortOrder::Desc),
    );
    req.use_cache = false;
    req.batch_size = 50;

    let first = lister.scan(&req).expect("first scan");
    let second = lister.scan(&req).expect("second scan");
    assert!(!first.cached);
    assert!(!second.cached);
    assert_eq!(first.batch, second.batch);
    assert_eq!(first.summary.total_files, second.summary.total_files);
    assert_eq!(
        first.summary.extension_counts,
        second.summary.extension_counts
    );
}

#[test]
fn hidden_entries_only_show_up_when_requested() {
    let temp = nested_tree();
    let lister = lister();

    let hidden = ScanFilters::new(
        1,
        true,
        Vec::<String>::new(),
        SortKey::Name,
        SortOrder::Asc,
    );
    let with_hidden = lister
        .scan(&request(temp.path(), hidden))
        .expect("scan with hidden");
    let without = lister
        .scan(&request(temp.path(), depth(1)))
        .expect("scan without hidden");

    assert_eq!(with_hidden.batch.total_count, without.batch.total_count + 1);
    assert!(with_hidden
        .batch
        .entries
        .iter()
        .any(|entry| entry.name == ".secret"));
}

#[test]
fn quoted_and_trailing_slash_arguments_share_one_cache_entry() {
    let temp = nested_tree();
    let lister = lister();
    let plain = temp.path().to_string_lossy().into_owned();

    let first = lister
        .scan(&ScanRequest::new(plain.clone(), depth(1)))
        .expect("plain");
    assert!(!first.cached);

    let quoted = lister
        .scan(&ScanRequest::new(format!("\"{plain}/\""), depth(1)))
        .expect("quoted");
    assert!(quoted.cached);
    assert_eq!(quoted.directory, first.directory);
    assert_eq!(quoted.batch, first.batch);
}

#[test]
fn different_filters_never_share_a_cached_window() {
    let temp = nested_tree();
    let lister = lister();

    let by_name = lister
        .scan(&request(temp.path(), depth(1)))
        .expect("by name");
    let by_size = lister
        .scan(&request(
            temp.path(),
            ScanFilters::new(
                1,
                false,
                Vec::<String>::new(),
                SortKey::Size,
                SortOrder::Desc,
            ),
        ))
        .expect("by size");

    assert!(!by_name.cached);
    assert!(!by_size.cached);
}

#[test]
fn expired_cache_entries_trigger_a_fresh_walk() {
    let temp = nested_tree();
    let lister = lister_with(EngineConfig {
        cache_ttl: Duration::ZERO,
        ..EngineConfig::default()
    });

    let first = lister.scan(&request(temp.path(), depth(1))).expect("first");
    write(&temp.path().join("late.txt"), "late");
    let second = lister.scan(&request(temp.path(), depth(1))).expect("second");

    assert!(!second.cached);
    assert_eq!(second.batch.total_count, first.batch.total_count + 1);
}

#[test]
fn disk_cache_survives_a_new_lister() {
    let temp = nested_tree();
    let cache_dir = TempDir::new().expect("cache dir");
    let config = EngineConfig {
        cache_dir: Some(cache_dir.path().to_path_buf()),
        ..EngineConfig::default()
    };

    let first = lister_with(config.clone())
        .scan(&request(temp.path(), depth(1)))
        .expect("first");
    assert!(!first.cached);

    let reopened = lister_with(config);
    let second = reopened
        .scan(&request(temp.path(), depth(1)))
        .expect("second");
    assert!(second.cached);
    assert_eq!(second.batch, first.batch);

    assert_eq!(reopened.cache().clear().expect("clear"), 1);
    let third = reopened
        .scan(&request(temp.path(), depth(1)))
        .expect("third");
    assert!(!third.cached);
}

#[test]
fn metadata_only_entries_expose_four_fields() {
    let temp = nested_tree();
    let lister = lister();

    let response = lister
        .scan_metadata_only(&request(temp.path(), depth(1)))
        .expect("metadata scan");
    let json = serde_json::to_value(&response).expect("serialize");

    assert!(json.get("directory").is_none());
    let entries = json["batch"]["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 5);
    for entry in entries {
        let keys: BTreeSet<&str> = entry
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            BTreeSet::from(["extension", "kind", "name", "sizeBytes"])
        );
    }
    assert_eq!(entries[0]["name"], "alpha");
    assert_eq!(entries[0]["kind"], "directory");
}

#[test]
fn pagination_info_matches_the_scan_totals() {
    let temp = nested_tree();
    let lister = lister();

    let info = lister
        .pagination_info(&temp.path().to_string_lossy(), &depth(2), 10)
        .expect("info");
    assert_eq!(info.plan.total_files, 23);
    assert_eq!(info.plan.total_directories, 3);
    assert_eq!(info.plan.total_items, 26);
    assert_eq!(info.plan.total_batches, 3);
    assert_eq!(info.plan.batch_offsets, vec![0, 10, 20]);

    let json = serde_json::to_value(&info).expect("serialize");
    assert_eq!(json["totalBatches"], 3);
    assert!(json["directory"].is_string());
}

#[test]
fn pagination_info_of_an_empty_directory_has_no_batches() {
    let temp = TempDir::new().expect("tempdir");
    let info = lister()
        .pagination_info(&temp.path().to_string_lossy(), &depth(3), 20)
        .expect("info");
    assert_eq!(info.plan.total_items, 0);
    assert_eq!(info.plan.total_batches, 0);
    assert!(info.plan.batch_offsets.is_empty());
}

#[test]
fn missing_and_non_directory_roots_report_their_codes() {
    let temp = nested_tree();
    let lister = lister();

    let missing = lister
        .scan(&request(&temp.path().join("nope"), depth(1)))
        .expect_err("missing dir");
    assert_eq!(missing.code(), ErrorCode::DirectoryNotFound);

    let file = lister
        .scan(&request(&temp.path().join("main.rs"), depth(1)))
        .expect_err("file root");
    assert_eq!(file.code(), ErrorCode::NotADirectory);

    let empty = lister
        .scan(&ScanRequest::new("  ", depth(1)))
        .expect_err("blank dir");
    assert_eq!(empty.code(), ErrorCode::InvalidArgument);
}

#[test]
fn invalid_memory_limit_is_rejected_before_walking() {
    let temp = nested_tree();
    let mut req = request(temp.path(), depth(1));
    req.memory_limit_mb = Some(-1.0);

    let err = lister().scan(&req).expect_err("negative limit");
    assert!(matches!(err, ScanError::InvalidArgument(_)));
}

#[test]
fn elapsed_deadline_aborts_with_partial_progress() {
    let temp = nested_tree();
    let lister = lister_with(EngineConfig {
        scan_timeout: Some(Duration::ZERO),
        checkpoint_every: 1,
        ..EngineConfig::default()
    });

    let err = lister
        .scan(&request(temp.path(), depth(2)))
        .expect_err("deadline");
    assert_eq!(err.code(), ErrorCode::DeadlineExceeded);
    assert!(err.is_partial());
    assert_eq!(err.entries_processed(), Some(1));
}
