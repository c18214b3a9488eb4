//! Integration test: local HTTP server with Range support, full transfers.
//!
//! Starts a minimal range-capable server, runs `run_transfer` against it and
//! asserts the downloaded file matches the served body byte for byte.

mod common;

use common::range_server::{self, RangeServerOptions};
use parfetch_core::checksum::{self, DigestAlgorithm, ExpectedDigest};
use parfetch_core::config::{FetchConfig, RetryConfig};
use parfetch_core::control::CancelToken;
use parfetch_core::downloader::TransferError;
use parfetch_core::probe::{self, ProbeError, ProbeOptions};
use parfetch_core::retry::FetchError;
use parfetch_core::storage;
use parfetch_core::transfer::{run_transfer, Mode, TransferRequest};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::Ordering;
use tempfile::tempdir;

fn pattern(len: usize) -> Vec<u8> {
    (0u8..=250).cycle().take(len).collect()
}

fn fast_config() -> FetchConfig {
    FetchConfig {
        connect_timeout_secs: 5,
        range_timeout_secs: 30,
        ..FetchConfig::default()
    }
}

fn transfer(url: &str, output: &Path, mode: Mode, cfg: &FetchConfig) -> anyhow::Result<u64> {
    let req = TransferRequest::new(url, output, mode);
    run_transfer(&req, cfg, &CancelToken::new(), None).map(|r| r.bytes_written)
}

#[test]
fn parallel_download_matches_body_for_various_worker_counts() {
    let body = pattern(64 * 1024 + 7);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();

    for workers in [1u32, 2, 8] {
        let out = dir.path().join(format!("out-{}.bin", workers));
        let written = transfer(&url, &out, Mode::Parallel { workers }, &fast_config()).unwrap();
        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&out).unwrap(), body, "workers = {}", workers);
        assert!(!storage::temp_path(&out).exists());
    }
}

#[test]
fn one_byte_ranges_when_workers_equal_size() {
    let body = pattern(48);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    let out = dir.path().join("tiny.bin");

    transfer(&url, &out, Mode::Parallel { workers: 48 }, &fast_config()).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), body);
}

#[test]
fn more_workers_than_bytes_still_completes() {
    let body = pattern(3);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    let out = dir.path().join("three.bin");

    transfer(&url, &out, Mode::Parallel { workers: 8 }, &fast_config()).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), body);
}

#[test]
fn empty_resource_produces_empty_file() {
    let srv = range_server::start_with_options(Vec::new(), RangeServerOptions::default());
    let dir = tempdir().unwrap();
    let out = dir.path().join("empty.bin");

    let written = transfer(&srv.url, &out, Mode::Parallel { workers: 4 }, &fast_config()).unwrap();
    assert_eq!(written, 0);
    assert_eq!(std::fs::metadata(&out).unwrap().len(), 0);
    assert_eq!(srv.stats.range_gets.load(Ordering::SeqCst), 0);
}

#[test]
fn parallel_and_sequential_produce_identical_files() {
    let body = pattern(200_000);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    let par = dir.path().join("par.bin");
    let seq = dir.path().join("seq.bin");

    transfer(&url, &par, Mode::Parallel { workers: 6 }, &fast_config()).unwrap();
    transfer(&url, &seq, Mode::Sequential, &fast_config()).unwrap();
    assert_eq!(std::fs::read(&par).unwrap(), std::fs::read(&seq).unwrap());
    assert_eq!(std::fs::read(&seq).unwrap(), body);
}

#[test]
fn repeated_transfer_overwrites_with_same_content() {
    let body = pattern(10_000);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    let out = dir.path().join("again.bin");
    std::fs::write(&out, b"stale contents that are longer than nothing").unwrap();

    transfer(&url, &out, Mode::Parallel { workers: 4 }, &fast_config()).unwrap();
    let first = std::fs::read(&out).unwrap();
    transfer(&url, &out, Mode::Parallel { workers: 4 }, &fast_config()).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), first);
    assert_eq!(first, body);
}

#[test]
fn truncated_range_fails_and_leaves_no_files() {
    let body = pattern(4000);
    let srv = range_server::start_with_options(
        body,
        RangeServerOptions {
            truncate_range_at: Some(2000),
            ..RangeServerOptions::default()
        },
    );
    let dir = tempdir().unwrap();
    let out = dir.path().join("broken.bin");

    let err = transfer(&srv.url, &out, Mode::Parallel { workers: 4 }, &fast_config()).unwrap_err();
    let failed = err
        .downcast_ref::<TransferError>()
        .expect("transfer error")
        .failures();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].index, 2);
    assert_eq!(failed[0].range.offset, 2000);
    assert!(!out.exists());
    assert!(!storage::temp_path(&out).exists());
}

#[test]
fn failed_transfer_keeps_previous_output() {
    let srv = range_server::start_with_options(
        pattern(4000),
        RangeServerOptions {
            fail_first_range_gets: 1,
            ..RangeServerOptions::default()
        },
    );
    let dir = tempdir().unwrap();
    let out = dir.path().join("keep.bin");
    std::fs::write(&out, b"previous").unwrap();

    let err = transfer(&srv.url, &out, Mode::Parallel { workers: 2 }, &fast_config()).unwrap_err();
    let transfer_err = err.downcast_ref::<TransferError>().expect("transfer error");
    assert!(transfer_err.failures().iter().any(|f| matches!(
        f.error,
        parfetch_core::downloader::ChunkError::Fetch(FetchError::UnexpectedStatus(503))
    )));
    assert_eq!(std::fs::read(&out).unwrap(), b"previous");
    assert!(!storage::temp_path(&out).exists());
}

#[test]
fn transient_503_is_retried_when_configured() {
    let body = pattern(40_000);
    let srv = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            fail_first_range_gets: 2,
            ..RangeServerOptions::default()
        },
    );
    let dir = tempdir().unwrap();
    let out = dir.path().join("retried.bin");
    let cfg = FetchConfig {
        retry: Some(RetryConfig {
            max_attempts: 4,
            base_delay_secs: 0.01,
            max_delay_secs: 1,
        }),
        ..fast_config()
    };

    transfer(&srv.url, &out, Mode::Parallel { workers: 4 }, &cfg).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), body);
    assert_eq!(srv.stats.range_gets.load(Ordering::SeqCst), 6);
}

#[test]
fn etag_mismatch_aborts_before_any_range_get() {
    let srv = range_server::start_with_options(pattern(1000), RangeServerOptions::default());
    let dir = tempdir().unwrap();
    let out = dir.path().join("etag.bin");
    let mut req = TransferRequest::new(&srv.url, &out, Mode::Parallel { workers: 2 });
    req.expected_etag = Some("\"something-else\"".to_string());

    let err = run_transfer(&req, &fast_config(), &CancelToken::new(), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ProbeError>(),
        Some(ProbeError::FingerprintMismatch { .. })
    ));
    assert_eq!(srv.stats.range_gets.load(Ordering::SeqCst), 0);
    assert!(!out.exists());
}

#[test]
fn digest_is_verified_after_transfer() {
    let body = pattern(12_345);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    let reference = dir.path().join("reference.bin");
    std::fs::write(&reference, &body).unwrap();
    let good = checksum::md5_path(&reference).unwrap();

    let out = dir.path().join("verified.bin");
    let mut req = TransferRequest::new(&url, &out, Mode::Parallel { workers: 3 });
    req.expected_digest = Some(ExpectedDigest::new(DigestAlgorithm::Md5, &good));
    run_transfer(&req, &fast_config(), &CancelToken::new(), None).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), body);

    let bad_out = dir.path().join("mismatch.bin");
    let mut bad = TransferRequest::new(&url, &bad_out, Mode::Parallel { workers: 3 });
    bad.expected_digest = Some(ExpectedDigest::new(
        DigestAlgorithm::Md5,
        "00000000000000000000000000000000",
    ));
    let err = run_transfer(&bad, &fast_config(), &CancelToken::new(), None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<checksum::IntegrityError>(),
        Some(checksum::IntegrityError::Mismatch { .. })
    ));
    assert!(!bad_out.exists());
}

#[test]
fn probe_reports_size_etag_and_ranges() {
    let url = range_server::start(pattern(777));
    let info = probe::probe(&url, &HashMap::new(), ProbeOptions::default()).unwrap();
    assert_eq!(info.size, 777);
    assert_eq!(info.fingerprint.as_deref(), Some("v1-test"));
    assert!(info.accept_ranges);
}

#[test]
fn probe_without_content_length_fails() {
    let srv = range_server::start_with_options(
        pattern(10),
        RangeServerOptions {
            send_content_length: false,
            ..RangeServerOptions::default()
        },
    );
    let err = probe::probe(&srv.url, &HashMap::new(), ProbeOptions::default()).unwrap_err();
    assert!(matches!(err, ProbeError::MissingContentLength));
}

#[test]
fn probe_rejected_head_is_status_error() {
    let srv = range_server::start_with_options(
        pattern(10),
        RangeServerOptions {
            head_allowed: false,
            ..RangeServerOptions::default()
        },
    );
    let err = probe::probe(&srv.url, &HashMap::new(), ProbeOptions::default()).unwrap_err();
    assert!(matches!(err, ProbeError::Status { code: 405, .. }));
}

#[test]
fn server_ignoring_range_is_rejected_not_stored() {
    let srv = range_server::start_with_options(
        pattern(5000),
        RangeServerOptions {
            support_ranges: false,
            ..RangeServerOptions::default()
        },
    );
    let dir = tempdir().unwrap();
    let out = dir.path().join("noranges.bin");

    let err = transfer(&srv.url, &out, Mode::Parallel { workers: 2 }, &fast_config()).unwrap_err();
    let transfer_err = err.downcast_ref::<TransferError>().expect("transfer error");
    assert!(transfer_err.failures().iter().all(|f| matches!(
        f.error,
        parfetch_core::downloader::ChunkError::Fetch(FetchError::UnexpectedStatus(200))
    )));
    assert!(!out.exists());

    // The same server is fine for a sequential download.
    transfer(&srv.url, &out, Mode::Sequential, &fast_config()).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), pattern(5000));
}
