use defragd::orchestrator::slow_scan::{inter_batch_sleep_secs, next_batch_size, should_skip};
use std::time::{Duration, SystemTime};

// --- should_skip ---

#[test]
fn directories_are_always_skipped() {
    let now = SystemTime::now();
    assert!(should_skip(1_000_000, false, now, now, 30, false));
}

#[test]
fn tiny_files_are_skipped() {
    let now = SystemTime::now();
    assert!(should_skip(100, true, now, now, 30, false));
}

#[test]
fn recently_defragmented_files_are_skipped() {
    let now = SystemTime::now();
    let old_mtime = now - Duration::from_secs(10_000);
    assert!(should_skip(1_000_000, true, old_mtime, now, 30, true));
}

#[test]
fn freshly_written_files_are_skipped_until_they_settle() {
    let now = SystemTime::now();
    let mtime = now - Duration::from_secs(1);
    // commit_delay 30 + 5s settle window: a 1s-old write is nowhere near settled.
    assert!(should_skip(1_000_000, true, mtime, now, 30, false));
}

#[test]
fn a_settled_large_file_is_not_skipped() {
    let now = SystemTime::now();
    let mtime = now - Duration::from_secs(3600);
    assert!(!should_skip(1_000_000, true, mtime, now, 30, false));
}

// --- next_batch_size ---

#[test]
fn batch_size_holds_steady_when_on_pace() {
    assert_eq!(next_batch_size(100, false, 1.0), 100);
}

#[test]
fn batch_size_grows_when_behind_schedule() {
    let grown = next_batch_size(100, true, 1.0);
    assert!(grown > 100);
}

#[test]
fn batch_size_never_drops_below_the_minimum() {
    assert_eq!(next_batch_size(1, false, 1.0), 50);
}

#[test]
fn batch_size_is_capped_by_speed_multiplier() {
    let capped = next_batch_size(10_000, true, 1.0);
    assert_eq!(capped, 250);
}

// --- inter_batch_sleep_secs ---

#[test]
fn faster_multiplier_shortens_the_inter_batch_sleep() {
    let normal = inter_batch_sleep_secs(1.0);
    let faster = inter_batch_sleep_secs(2.0);
    assert!(faster < normal);
}

#[test]
fn inter_batch_sleep_never_exceeds_the_ceiling() {
    let sleep = inter_batch_sleep_secs(0.001);
    assert!(sleep <= 180.0);
}
