//! Deterministic realizations of the end-to-end scenarios.

use defragd::cost_model::DriveGeometry;
use defragd::external::filefrag::batch_paths;
use defragd::extent_parser::parse_extent_listing;
use defragd::files_state::FilesState;
use defragd::types::{CompressionClass, CostAchievement, FragRecord};
use std::path::{Path, PathBuf};
use std::time::Instant;

fn geo() -> DriveGeometry {
    DriveGeometry::new(1.0)
}

/// E1: single file, 1 MiB, one extent. Cost exactly 1.0; not queued.
#[test]
fn single_sequential_file_is_cost_one_and_not_queued() {
    let text = "\
File size of /data/one.bin is 1048576 is a regular file
 ext:     logical_offset:        physical_offset: length:   expected: flags:
   0:        0..     255:     1000..     1255:    256:             last
/data/one.bin: 1 extent found
";
    let (records, errors) = parse_extent_listing(&geo(), text);
    assert_eq!(errors, 0);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].size, 1_048_576);
    assert_eq!(records[0].cost, 1.0);

    let state = FilesState::new();
    let queued = state.update_files(records, Instant::now(), None);
    assert_eq!(queued, 0);
    assert!(state.pop_most_interesting().is_none());
}

/// E2: 10 MiB file, 100 extents scattered across ~2 GiB. Cost well above
/// 2.0; queued in the uncompressed class.
#[test]
fn scattered_file_has_high_cost_and_is_queued_uncompressed() {
    let geo = geo();
    let mut total_seek_time = 0.0;
    let mut prev_end: Option<u64> = None;
    // 100 extents of equal length, spread across a 2 GiB span.
    let span_blocks = 2u64 * 1024 * 1024 * 1024 / 4096;
    let step = span_blocks / 100;
    for i in 0..100u64 {
        let start = i * step;
        if let Some(prev) = prev_end {
            total_seek_time += geo.seek_time(prev, start);
        }
        prev_end = Some(start + 25);
    }
    let cost = geo.fragmentation_cost(10 * 1024 * 1024, total_seek_time);
    assert!(cost > 2.0, "expected cost > 2.0, got {cost}");

    let record = FragRecord {
        short_path: PathBuf::from("scattered.bin"),
        size: 10 * 1024 * 1024,
        compressed: false,
        cost,
    };
    let state = FilesState::new();
    let queued = state.update_files(vec![record], Instant::now(), None);
    assert_eq!(queued, 1);
    assert_eq!(state.queue_class_len(CompressionClass::Uncompressed), 1);
}

/// E3 (partial): a write burst of 300 paths never produces a filefrag
/// invocation whose combined argv would exceed the configured max.
#[test]
fn large_batch_of_paths_is_split_under_arg_max() {
    let paths: Vec<PathBuf> = (0..300).map(|i| PathBuf::from(format!("/data/burst/file_{i:04}.bin"))).collect();
    let refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
    let arg_max = 4096usize;
    let batches = batch_paths(&refs, arg_max);

    assert!(!batches.is_empty());
    for batch in &batches {
        let len: usize = batch.iter().map(|p| p.as_os_str().len() + 1).sum();
        assert!(len <= arg_max, "batch exceeded arg_max: {len} > {arg_max}");
    }
    let total: usize = batches.iter().map(|b| b.len()).sum();
    assert_eq!(total, 300);
}

/// E4: queue filled to capacity with a 1:3 compressed:uncompressed share;
/// after trimming, each class keeps roughly its share and the total stays
/// at or under the cap.
#[test]
fn queue_trims_proportionally_to_type_tracker_share() {
    let state = FilesState::new();
    let mut records = Vec::new();
    for i in 0..600 {
        records.push(FragRecord {
            short_path: PathBuf::from(format!("c{i}.bin")),
            size: 1_000_000,
            compressed: true,
            cost: 1.5,
        });
    }
    // Three uncompressed inserts to every compressed one biases the type
    // tracker toward a 1:3 share, matching E4. 2400 total pushes the queue
    // past MAX_QUEUE_LENGTH (2000), forcing a trim.
    for i in 0..1800 {
        records.push(FragRecord {
            short_path: PathBuf::from(format!("u{i}.bin")),
            size: 1_000_000,
            compressed: false,
            cost: 1.5,
        });
    }
    state.update_files(records, Instant::now(), None);

    assert!(state.queue_len() <= 2000);
    assert!(state.queue_class_len(CompressionClass::Compressed) >= 500);
    assert!(state.queue_class_len(CompressionClass::Uncompressed) >= 1500);
}

/// E5: a successful defrag (cost 3.0 -> 1.0, 10 MiB) is recorded into the
/// achievement history and visible in its length.
#[test]
fn successful_defrag_is_historized() {
    let state = FilesState::new();
    let before = state.history_len(CompressionClass::Uncompressed);
    state.historize_cost_achievement(
        CompressionClass::Uncompressed,
        CostAchievement {
            initial_cost: 3.0,
            final_cost: 1.0,
            size_bytes: 10 * 1024 * 1024,
        },
    );
    assert_eq!(state.history_len(CompressionClass::Uncompressed), before + 1);
    // A cost of 1.0 is never worth defragmenting further.
    assert!(state.below_threshold_cost(CompressionClass::Uncompressed, 1.0, None));
}
