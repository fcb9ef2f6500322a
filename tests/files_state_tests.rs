use defragd::files_state::FilesState;
use defragd::types::{CompressionClass, CostAchievement, FragRecord};
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

fn record(path: &str, cost: f64, compressed: bool) -> FragRecord {
    FragRecord {
        short_path: PathBuf::from(path),
        size: 1_000_000,
        compressed,
        cost,
    }
}

// --- update_files / pop_most_interesting ---

#[test]
fn high_cost_records_are_queued_and_poppable() {
    let state = FilesState::new();
    let queued = state.update_files(vec![record("a.txt", 5.0, false)], Instant::now(), None);
    assert_eq!(queued, 1);
    let popped = state.pop_most_interesting();
    assert_eq!(popped.map(|r| r.short_path), Some(PathBuf::from("a.txt")));
}

#[test]
fn records_below_threshold_are_not_queued() {
    let state = FilesState::new();
    // Cost 1.0 (perfectly sequential) never clears the threshold.
    let queued = state.update_files(vec![record("a.txt", 1.0, false)], Instant::now(), None);
    assert_eq!(queued, 0);
    assert!(state.pop_most_interesting().is_none());
}

#[test]
fn re_measurement_supersedes_previously_queued_entry() {
    let state = FilesState::new();
    state.update_files(vec![record("a.txt", 5.0, false)], Instant::now(), None);
    assert_eq!(state.queue_len(), 1);
    // A fresh, low-cost measurement for the same path should drop it, not add a duplicate.
    state.update_files(vec![record("a.txt", 1.0, false)], Instant::now(), None);
    assert_eq!(state.queue_len(), 0);
}

#[test]
fn pop_alternates_between_classes_under_equal_pressure() {
    let state = FilesState::new();
    for i in 0..20 {
        state.update_files(vec![record(&format!("c{i}.txt"), 10.0, true)], Instant::now(), None);
        state.update_files(vec![record(&format!("u{i}.txt"), 10.0, false)], Instant::now(), None);
    }
    let mut compressed_popped = 0;
    let mut uncompressed_popped = 0;
    for _ in 0..40 {
        match state.pop_most_interesting() {
            Some(r) if r.compressed => compressed_popped += 1,
            Some(_) => uncompressed_popped += 1,
            None => break,
        }
    }
    assert_eq!(compressed_popped, 20);
    assert_eq!(uncompressed_popped, 20);
}

#[test]
fn empty_state_pops_none() {
    let state = FilesState::new();
    assert!(state.pop_most_interesting().is_none());
}

// --- write tracker ---

#[test]
fn write_event_is_tracked_until_drained() {
    let state = FilesState::new();
    state.file_written_to(PathBuf::from("a.txt"), SystemTime::now());
    assert_eq!(state.write_tracker_len(), 1);

    let ready = state.drain_ready_writes(SystemTime::now() + std::time::Duration::from_secs(1000), 30, 0);
    assert_eq!(ready, vec![PathBuf::from("a.txt")]);
    assert_eq!(state.write_tracker_len(), 0);
}

#[test]
fn fresh_write_is_not_ready_for_consolidation() {
    let state = FilesState::new();
    let now = SystemTime::now();
    state.file_written_to(PathBuf::from("a.txt"), now);
    let ready = state.drain_ready_writes(now, 30, 0);
    assert!(ready.is_empty());
}

// --- threshold / history ---

#[test]
fn cost_achievement_is_recorded() {
    let state = FilesState::new();
    assert_eq!(state.history_len(CompressionClass::Uncompressed), 1); // cold-start seed
    state.historize_cost_achievement(
        CompressionClass::Uncompressed,
        CostAchievement {
            initial_cost: 3.0,
            final_cost: 1.1,
            size_bytes: 500_000,
        },
    );
    assert_eq!(state.history_len(CompressionClass::Uncompressed), 2);
    assert_eq!(state.history_len(CompressionClass::Compressed), 1); // untouched
}

// --- recently-defragmented set ---

#[test]
fn marked_path_is_recently_defragmented() {
    let state = FilesState::new();
    let path = PathBuf::from("a.txt");
    assert!(!state.recently_defragmented(&path));
    state.mark_defragmented(&path);
    assert!(state.recently_defragmented(&path));
}

#[test]
fn recency_decays_after_enough_ticks() {
    let state = FilesState::new();
    let path = PathBuf::from("a.txt");
    state.mark_defragmented(&path);
    // RECENT_SET_BITS_PER_ENTRY = 4, so a fresh mark (value 15) fully decays
    // after 15 one-per-tick decrements.
    for _ in 0..15 {
        state.tick_recent_set();
    }
    assert!(!state.recently_defragmented(&path));
}

#[test]
fn tick_period_is_ignore_delay_divided_by_tick_count() {
    use defragd::files_state::tick_period_secs;
    assert_eq!(tick_period_secs(), 12 * 3600 / 15);
}
