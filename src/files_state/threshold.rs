//! Cost-Achievement History: a bounded-length record, per compression class,
//! of how much headroom past defrags actually bought, used to derive the "is
//! this file worth defragmenting" threshold and the class's expected
//! post-defrag cost.

use crate::types::{CompressionClass, CostAchievement};
use crate::utils::config::{
    COLD_START_SEED_COST_COMPRESSED, COLD_START_SEED_COST_UNCOMPRESSED, COLD_START_SEED_SIZE,
    COST_COMPUTE_DELAY_SECS, COST_THRESHOLD_PERCENTILE, MAX_HISTORY_LEN, MIN_EXPECTED_BENEFIT,
};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Cached per-class derived values, recomputed together at most every
/// [`COST_COMPUTE_DELAY_SECS`].
#[derive(Clone, Copy, Debug)]
struct ClassStats {
    /// `percentile_final_cost * MIN_EXPECTED_BENEFIT` -- the admission bar.
    threshold: f64,
    /// Weighted average final cost over the upper half of the history (the
    /// entries at or past the percentile crossing); fed to `defrag_time` as
    /// `average_cost(class)`.
    average_final_cost: f64,
    /// Weighted average initial cost over the same span, computed alongside
    /// the final-cost average per spec.md 4.3's "weighted averages of
    /// initial and final costs"; not currently consumed outside this module
    /// but kept for parity with the documented computation.
    #[allow(dead_code)]
    average_initial_cost: f64,
}

/// Per-class weighted-percentile cost history plus the last-computed stats.
pub struct ThresholdTracker {
    history: HashMap<CompressionClass, VecDeque<CostAchievement>>,
    cached: HashMap<CompressionClass, ClassStats>,
    last_computed: Option<Instant>,
}

impl ThresholdTracker {
    pub fn new() -> Self {
        let mut history = HashMap::new();
        // Cold-start seeds (spec.md 4.3, "Cold start"): without these a fresh
        // daemon has no history to derive a threshold from and would accept
        // (or reject) everything until the first real defrag completes. The
        // seed is the class's expected *final* cost (2.65 compressed / 1.02
        // uncompressed for a 1,000,000-byte file) -- it must land in
        // `final_cost`, which is the field the percentile walk sorts and
        // ranks on; `initial_cost` has no equivalent seed value, so it's set
        // to match (no fabricated "before" state).
        history.insert(
            CompressionClass::Uncompressed,
            VecDeque::from([CostAchievement {
                initial_cost: COLD_START_SEED_COST_UNCOMPRESSED,
                final_cost: COLD_START_SEED_COST_UNCOMPRESSED,
                size_bytes: COLD_START_SEED_SIZE,
            }]),
        );
        history.insert(
            CompressionClass::Compressed,
            VecDeque::from([CostAchievement {
                initial_cost: COLD_START_SEED_COST_COMPRESSED,
                final_cost: COLD_START_SEED_COST_COMPRESSED,
                size_bytes: COLD_START_SEED_SIZE,
            }]),
        );

        let mut cached = HashMap::new();
        for class in CompressionClass::ALL {
            cached.insert(class, Self::compute_class_stats(&history[&class], COST_THRESHOLD_PERCENTILE));
        }
        Self {
            history,
            cached,
            last_computed: None,
        }
    }

    /// Record a completed defrag's before/after cost into `class`'s history.
    pub fn record(&mut self, class: CompressionClass, achievement: CostAchievement) {
        let history = self.history.get_mut(&class).unwrap();
        history.push_back(achievement);
        while history.len() > MAX_HISTORY_LEN {
            history.pop_front();
        }
    }

    /// Recompute both classes' cached stats if the cache has gone stale
    /// (shared gate across classes, matching the single `COST_COMPUTE_DELAY`
    /// the spec describes); `now` lets callers (and tests) control time.
    pub fn refresh(&mut self, now: Instant) {
        let stale = match self.last_computed {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= Duration::from_secs(COST_COMPUTE_DELAY_SECS),
        };
        if !stale {
            return;
        }
        for class in CompressionClass::ALL {
            let stats = Self::compute_class_stats(&self.history[&class], COST_THRESHOLD_PERCENTILE);
            self.cached.insert(class, stats);
        }
        self.last_computed = Some(now);
    }

    /// `class`'s current admission threshold (last computed by [`refresh`]).
    pub fn threshold(&self, class: CompressionClass) -> f64 {
        self.cached[&class].threshold
    }

    /// `class`'s current average achieved cost, for `defrag_time`'s
    /// `average_cost(class)` parameter.
    pub fn average_cost(&self, class: CompressionClass) -> f64 {
        self.cached[&class].average_final_cost
    }

    /// True if `cost` is at or below `class`'s admission bar, scaled by
    /// `mult` (spec.md 4.3: `cost <= 1 + mult * (threshold - 1)`; `mult` = 1.0
    /// for slow-scan-origin records, < 1.0 narrows the bar toward 1 for
    /// write-origin records so they can't dominate the slow scan's share).
    pub fn below_threshold(&self, class: CompressionClass, cost: f64, mult: f64) -> bool {
        let threshold = self.threshold(class);
        cost <= 1.0 + mult * (threshold - 1.0)
    }

    /// Weighted-percentile walk over `final_cost`. Weight of entry `i`
    /// (1-based, oldest first) is `size_i * i` -- linear recency weighting
    /// combined with the file size it was measured on. Sorted ascending by
    /// `final_cost`, walked smallest to largest until `percentile`% of the
    /// total weight accumulates; the `final_cost` there, times
    /// `MIN_EXPECTED_BENEFIT`, is the threshold. Walking the rest of the
    /// sorted list from that point on gives the weighted averages of initial
    /// and final cost that feed `average_cost(class)`.
    fn compute_class_stats(history: &VecDeque<CostAchievement>, percentile: f64) -> ClassStats {
        if history.is_empty() {
            return ClassStats {
                threshold: MIN_EXPECTED_BENEFIT,
                average_final_cost: 1.0,
                average_initial_cost: 1.0,
            };
        }

        let mut weighted: Vec<(f64, &CostAchievement)> = history
            .iter()
            .enumerate()
            .map(|(idx, achievement)| (((idx + 1) as f64) * achievement.size_bytes as f64, achievement))
            .collect();
        weighted.sort_by(|a, b| a.1.final_cost.total_cmp(&b.1.final_cost));

        let total_weight: f64 = weighted.iter().map(|(w, _)| w).sum();
        if total_weight <= 0.0 {
            let mid = weighted[weighted.len() / 2].1;
            return ClassStats {
                threshold: mid.final_cost * MIN_EXPECTED_BENEFIT,
                average_final_cost: mid.final_cost,
                average_initial_cost: mid.initial_cost,
            };
        }
        let target = total_weight * (percentile / 100.0);

        let mut cumulative = 0.0;
        let mut percentile_idx = weighted.len() - 1;
        for (i, (w, _)) in weighted.iter().enumerate() {
            cumulative += w;
            if cumulative >= target {
                percentile_idx = i;
                break;
            }
        }
        let percentile_cost = weighted[percentile_idx].1.final_cost;
        let threshold = percentile_cost * MIN_EXPECTED_BENEFIT;

        let rest = &weighted[percentile_idx..];
        let rest_weight: f64 = rest.iter().map(|(w, _)| w).sum();
        let (average_final_cost, average_initial_cost) = if rest_weight > 0.0 {
            let final_sum: f64 = rest.iter().map(|(w, a)| w * a.final_cost).sum();
            let initial_sum: f64 = rest.iter().map(|(w, a)| w * a.initial_cost).sum();
            (final_sum / rest_weight, initial_sum / rest_weight)
        } else {
            (percentile_cost, weighted[percentile_idx].1.initial_cost)
        };

        ClassStats {
            threshold,
            average_final_cost,
            average_initial_cost,
        }
    }

    pub fn len(&self, class: CompressionClass) -> usize {
        self.history[&class].len()
    }

    pub fn is_empty(&self, class: CompressionClass) -> bool {
        self.history[&class].is_empty()
    }
}

impl Default for ThresholdTracker {
    fn default() -> Self {
        Self::new()
    }
}
