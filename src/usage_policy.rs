//! Usage Policy Checker (C4): a rolling-window rate limiter that keeps defrag
//! I/O from dominating disk usage. Tracks recent defrag-time spend in a small
//! set of windows, each with its own allowed fraction, and refuses to start a
//! new defrag whose *estimated* time would push any window over its limit.

use crate::utils::config::USAGE_WINDOWS;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct Spend {
    at: Instant,
    secs: f64,
}

/// Tracks a rolling history of defrag time spend and answers "is there
/// headroom to start one more defrag estimated to take `estimate_secs`".
pub struct UsagePolicy {
    spends: VecDeque<Spend>,
}

impl UsagePolicy {
    pub fn new() -> Self {
        Self { spends: VecDeque::new() }
    }

    /// Drop spend entries older than the widest configured window; nothing
    /// before that point can affect any window's `use_factor`.
    fn prune(&mut self, now: Instant) {
        let widest = USAGE_WINDOWS.iter().map(|(secs, _)| *secs).max().unwrap_or(0);
        let cutoff = Duration::from_secs(widest);
        while let Some(front) = self.spends.front() {
            if now.saturating_duration_since(front.at) > cutoff {
                self.spends.pop_front();
            } else {
                break;
            }
        }
    }

    /// Fraction of `window_secs` spent on defrag I/O within the trailing
    /// `window_secs` seconds of `now`.
    fn use_factor(&self, now: Instant, window_secs: u64) -> f64 {
        let window = Duration::from_secs(window_secs);
        let spent: f64 = self
            .spends
            .iter()
            .filter(|s| now.saturating_duration_since(s.at) <= window)
            .map(|s| s.secs)
            .sum();
        spent / window_secs as f64
    }

    /// True if starting a defrag estimated to take `estimate_secs` would not
    /// push any configured window's usage past its allowed limit.
    pub fn allows(&mut self, now: Instant, estimate_secs: f64) -> bool {
        self.prune(now);
        for &(window_secs, limit) in USAGE_WINDOWS {
            let projected = self.use_factor(now, window_secs) + estimate_secs / window_secs as f64;
            if projected > limit {
                return false;
            }
        }
        true
    }

    /// Record actual time spent on a completed defrag. Capped at twice the
    /// estimate that gated admission, so a wildly underestimated defrag can't
    /// single-handedly blow out the rolling windows for hours (spec.md 4.4,
    /// "Recording actual usage").
    pub fn record(&mut self, now: Instant, actual_secs: f64, estimate_secs: f64) {
        let capped = actual_secs.min(estimate_secs * 2.0).max(0.0);
        self.spends.push_back(Spend { at: now, secs: capped });
        self.prune(now);
    }
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self::new()
    }
}
