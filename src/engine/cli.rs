//! CLI entry point glue: builds `AppConfig` from parsed flags, initializes
//! logging, and starts the Supervisor.

use crate::config::AppConfig;
use crate::engine::arg_parser::Cli;
use crate::supervisor::Supervisor;
use crate::utils::config::DEFAULT_STORE_DIR;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

impl From<Cli> for AppConfig {
    fn from(cli: Cli) -> Self {
        AppConfig {
            speed_multiplier: cli.speed_multiplier,
            drive_count: cli.drive_count,
            full_scan_time_secs: cli.full_scan_time,
            target_extent_size: cli.target_extent_size,
            slow_start: cli.slow_start,
            store_dir: cli.store_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
            verbose: cli.verbose,
            debug: cli.debug,
        }
    }
}

/// Run the daemon: blocks until the process is killed (spec.md 6 CLI
/// surface: "otherwise the process runs until killed").
pub fn run(cli: Cli) -> Result<()> {
    crate::utils::setup_logging(cli.debug || cli.verbose);
    let config = Arc::new(AppConfig::from(cli));
    log::info!(
        "defragd starting: speed_multiplier={} drive_count={} store_dir={}",
        config.speed_multiplier,
        config.drive_count,
        config.store_dir.display()
    );
    let supervisor = Arc::new(Supervisor::new(config));
    supervisor.run()
}
