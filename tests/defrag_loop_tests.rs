use defragd::orchestrator::defrag_loop::inter_defrag_sleep_secs;

#[test]
fn empty_queue_sleeps_at_the_maximum_delay() {
    assert_eq!(inter_defrag_sleep_secs(0), 10.0);
}

#[test]
fn a_full_queue_sleeps_at_the_minimum_delay() {
    let sleep = inter_defrag_sleep_secs(2000);
    assert!((sleep - 0.1).abs() < 1e-9);
}

#[test]
fn sleep_shortens_as_the_queue_fills() {
    let half = inter_defrag_sleep_secs(1000);
    let empty = inter_defrag_sleep_secs(0);
    let full = inter_defrag_sleep_secs(2000);
    assert!(full < half);
    assert!(half < empty);
}

#[test]
fn an_overfull_queue_is_clamped_to_the_minimum() {
    assert_eq!(inter_defrag_sleep_secs(5000), inter_defrag_sleep_secs(2000));
}
