use defragd::orchestrator::stat_loop::{PendingDefrag, has_settled};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn pending(initial_cost: f64, best: f64, queued_secs_ago: u64, improved_secs_ago: u64) -> (PendingDefrag, Instant) {
    let now = Instant::now();
    let queued_at = now - Duration::from_secs(queued_secs_ago);
    let last_improvement_at = now - Duration::from_secs(improved_secs_ago);
    (
        PendingDefrag {
            short_path: PathBuf::from("a.txt"),
            initial_cost,
            size_bytes: 1_000_000,
            queued_at,
            best_cost_so_far: best,
            last_improvement_at,
        },
        now,
    )
}

#[test]
fn a_sequential_cost_always_counts_as_settled() {
    let (p, now) = pending(3.0, 3.0, 0, 0);
    assert!(has_settled(&p, 1.0, now));
}

#[test]
fn a_fresh_still_fragmented_record_has_not_settled() {
    let (p, now) = pending(3.0, 3.0, 0, 0);
    assert!(!has_settled(&p, 2.5, now));
}

#[test]
fn a_record_tracked_past_the_max_age_settles_regardless() {
    let (p, now) = pending(3.0, 3.0, 35, 35);
    assert!(has_settled(&p, 2.5, now));
}

#[test]
fn a_record_that_improved_then_stalled_settles() {
    // Improved once (best < initial), then six seconds with no further gain.
    let (p, now) = pending(3.0, 1.8, 7, 6);
    assert!(has_settled(&p, 1.8, now));
}

#[test]
fn a_record_that_never_improved_does_not_settle_from_stalling_alone() {
    // best == initial -- no improvement recorded yet, so the stall clause
    // doesn't apply even though last_improvement_at looks stale.
    let (p, now) = pending(3.0, 3.0, 7, 6);
    assert!(!has_settled(&p, 3.0, now));
}
