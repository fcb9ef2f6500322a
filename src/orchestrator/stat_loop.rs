//! Stat loop: polls freshly-defragmented files until their fragmentation
//! cost settles, then records the achieved cost into the threshold history.

use crate::cost_model::DriveGeometry;
use crate::external::filefrag;
use crate::files_state::FilesState;
use crate::types::CostAchievement;
use crate::utils::config::{STAT_LOOP_POLL_SECS, STAT_SETTLE_MAX_AGE_SECS, STAT_SETTLE_STALL_SECS};
use crossbeam_channel::Receiver;
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct PendingDefrag {
    pub short_path: PathBuf,
    pub initial_cost: f64,
    pub size_bytes: u64,
    pub queued_at: Instant,
    pub best_cost_so_far: f64,
    pub last_improvement_at: Instant,
}

/// Whether a pending record has settled: cost reached the sequential floor,
/// or it's been `STAT_SETTLE_STALL_SECS` since the last improvement (after at
/// least one), or it's simply been tracked too long.
pub fn has_settled(pending: &PendingDefrag, latest_cost: f64, now: Instant) -> bool {
    if latest_cost <= 1.0 {
        return true;
    }
    if now.duration_since(pending.queued_at).as_secs() >= STAT_SETTLE_MAX_AGE_SECS {
        return true;
    }
    let improved_at_least_once = pending.best_cost_so_far < pending.initial_cost;
    if improved_at_least_once && now.duration_since(pending.last_improvement_at).as_secs() >= STAT_SETTLE_STALL_SECS {
        return true;
    }
    false
}

pub struct StatLoop {
    root: PathBuf,
    files_state: Arc<FilesState>,
    geometry: DriveGeometry,
    filefrag_binary: String,
    rx: Receiver<PendingDefrag>,
    stop: Arc<AtomicBool>,
}

impl StatLoop {
    pub fn new(
        root: PathBuf,
        files_state: Arc<FilesState>,
        geometry: DriveGeometry,
        filefrag_binary: String,
        rx: Receiver<PendingDefrag>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            root,
            files_state,
            geometry,
            filefrag_binary,
            rx,
            stop,
        }
    }

    pub fn run(&self) {
        let mut pending: Vec<PendingDefrag> = Vec::new();
        while !self.stop.load(Ordering::Relaxed) {
            while let Ok(item) = self.rx.try_recv() {
                pending.push(item);
            }
            if pending.is_empty() {
                std::thread::sleep(Duration::from_secs(STAT_LOOP_POLL_SECS));
                continue;
            }

            let mut still_pending = Vec::with_capacity(pending.len());
            for mut item in pending.drain(..) {
                let abs_path = self.root.join(&item.short_path);
                let Ok(output) = filefrag::run_batch(&self.filefrag_binary, &[abs_path.as_path()]) else {
                    // Vanished or unreadable: drop it, nothing to settle.
                    continue;
                };
                let (mut records, _errors) = crate::extent_parser::parse_extent_listing(&self.geometry, &output);
                let Some(fresh) = records.pop() else { continue };

                let now = Instant::now();
                if fresh.cost < item.best_cost_so_far {
                    item.best_cost_so_far = fresh.cost;
                    item.last_improvement_at = now;
                }

                if has_settled(&item, fresh.cost, now) {
                    debug!("stat loop: {} settled at cost {:.3}", abs_path.display(), fresh.cost);
                    self.files_state.historize_cost_achievement(
                        fresh.class(),
                        CostAchievement {
                            initial_cost: item.initial_cost,
                            final_cost: fresh.cost,
                            size_bytes: item.size_bytes,
                        },
                    );
                } else {
                    still_pending.push(item);
                }
            }
            pending = still_pending;

            if !pending.is_empty() {
                std::thread::sleep(Duration::from_secs(STAT_LOOP_POLL_SECS));
            }
        }
        if !pending.is_empty() {
            warn!("stat loop: stopping with {} records never settled", pending.len());
        }
    }
}
