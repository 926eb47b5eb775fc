//! Cache manager tests: offline behavior plus downloads from a local server.

mod common;

use std::fs;
use std::io::Write;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use order_dashboard::{CacheManager, DashboardError};

use common::TestServer;

fn offline_cache(dir: &std::path::Path) -> CacheManager {
    CacheManager::new(Some(dir.join("cache")), true, Duration::from_secs(30)).unwrap()
}

fn online_cache(dir: &std::path::Path) -> CacheManager {
    CacheManager::new(Some(dir.join("cache")), false, Duration::from_secs(30)).unwrap()
}

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

// ---------------------------------------------------------------------------
// Offline
// ---------------------------------------------------------------------------

#[test]
fn new_creates_cache_directory() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let cache = offline_cache(tmp_dir.path());
    assert!(cache.cache_dir.is_dir());
    assert!(cache.offline);
}

#[test]
fn local_path_strips_gz_suffix_and_query() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let cache = offline_cache(tmp_dir.path());

    assert_eq!(
        cache.local_path("https://host.invalid/data/orders.csv.gz"),
        cache.cache_dir.join("orders.csv")
    );
    assert_eq!(
        cache.local_path("https://host.invalid/data/orders.csv?token=abc#frag"),
        cache.cache_dir.join("orders.csv")
    );
}

#[test]
fn local_path_falls_back_to_default_file_name() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let cache = offline_cache(tmp_dir.path());
    assert_eq!(
        cache.local_path("https://host.invalid/"),
        cache.cache_dir.join("data_merged.csv")
    );
}

#[test]
fn offline_without_cached_copy_is_not_found() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut cache = offline_cache(tmp_dir.path());

    let err = cache
        .ensure_dataset("https://host.invalid/data_merged.csv")
        .unwrap_err();
    match err {
        DashboardError::NotFound(msg) => assert!(msg.contains("offline")),
        other => panic!("expected NotFound, got {other}"),
    }
}

#[test]
fn offline_with_cached_copy_returns_local_path() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut cache = offline_cache(tmp_dir.path());
    let cached = cache.cache_dir.join("data_merged.csv");
    fs::write(&cached, "order_id\n").unwrap();

    let path = cache
        .ensure_dataset("https://host.invalid/data_merged.csv.gz")
        .unwrap();
    assert_eq!(path, cached);
}

#[test]
fn missing_cached_copy_is_stale() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut cache = offline_cache(tmp_dir.path());
    assert!(cache.is_stale("https://host.invalid/data_merged.csv").unwrap());
}

#[test]
fn cached_copy_is_fresh_when_remote_tag_unknown() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut cache = offline_cache(tmp_dir.path());
    fs::write(cache.cache_dir.join("data_merged.csv"), "order_id\n").unwrap();

    assert_eq!(
        cache.remote_tag("https://host.invalid/data_merged.csv").unwrap(),
        None
    );
    assert!(!cache.is_stale("https://host.invalid/data_merged.csv").unwrap());
}

#[test]
fn clear_removes_cached_files() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut cache = offline_cache(tmp_dir.path());
    let cached = cache.cache_dir.join("data_merged.csv");
    fs::write(&cached, "order_id\n").unwrap();
    fs::write(cache.cache_dir.join("data_merged.csv.etag"), "\"v1\"").unwrap();

    cache.clear().unwrap();

    assert!(cache.cache_dir.is_dir());
    assert!(!cached.exists());
    assert!(fs::read_dir(&cache.cache_dir).unwrap().next().is_none());
}

// ---------------------------------------------------------------------------
// Online (local server)
// ---------------------------------------------------------------------------

#[test]
fn ensure_dataset_downloads_plain_csv_and_stores_tag() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let body = common::csv_text(common::HEADER, &common::scenario_rows());
    let server = TestServer::start("\"v1\"", body.clone());
    let mut cache = online_cache(tmp_dir.path());

    let path = cache.ensure_dataset(&server.url("data_merged.csv")).unwrap();

    assert_eq!(path, cache.cache_dir.join("data_merged.csv"));
    assert_eq!(fs::read_to_string(&path).unwrap(), body);
    assert_eq!(
        fs::read_to_string(cache.cache_dir.join("data_merged.csv.etag")).unwrap(),
        "\"v1\""
    );
    assert_eq!(server.get_requests(), 1);
}

#[test]
fn ensure_dataset_decompresses_gz_downloads() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let body = common::csv_text(common::HEADER, &common::sample_rows());
    let server = TestServer::start("\"gz1\"", gzip(&body));
    let mut cache = online_cache(tmp_dir.path());

    let path = cache.ensure_dataset(&server.url("files/orders.csv.gz")).unwrap();

    assert_eq!(path, cache.cache_dir.join("orders.csv"));
    assert_eq!(fs::read_to_string(&path).unwrap(), body);
    assert!(cache.cache_dir.join("orders.csv.etag").exists());
}

#[test]
fn unchanged_tag_reuses_cached_copy() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let server = TestServer::start("\"v1\"", "order_id\n");
    let mut cache = online_cache(tmp_dir.path());
    let url = server.url("data_merged.csv");

    cache.ensure_dataset(&url).unwrap();
    cache.ensure_dataset(&url).unwrap();

    assert_eq!(server.get_requests(), 1);
    assert_eq!(server.head_requests(), 1);
    assert!(!cache.is_stale(&url).unwrap());
}

#[test]
fn is_stale_asks_server_again_after_tag_change() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let server = TestServer::start("\"v1\"", "order_id\nfirst\n");
    let mut cache = online_cache(tmp_dir.path());
    let url = server.url("data_merged.csv");

    let path = cache.ensure_dataset(&url).unwrap();
    assert!(!cache.is_stale(&url).unwrap());
    let heads_before = server.head_requests();

    server.publish("\"v2\"", "order_id\nsecond\n");
    assert!(cache.is_stale(&url).unwrap());
    assert_eq!(server.head_requests(), heads_before + 1);

    cache.ensure_dataset(&url).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "order_id\nsecond\n");
    assert_eq!(
        fs::read_to_string(cache.cache_dir.join("data_merged.csv.etag")).unwrap(),
        "\"v2\""
    );
    assert!(!cache.is_stale(&url).unwrap());
}

#[test]
fn remote_tag_reads_etag_header() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let server = TestServer::start("\"abc\"", "order_id\n");
    let mut cache = online_cache(tmp_dir.path());

    assert_eq!(
        cache.remote_tag(&server.url("data_merged.csv")).unwrap(),
        Some("\"abc\"".to_string())
    );
    assert_eq!(server.get_requests(), 0);
}
