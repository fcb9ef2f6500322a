//! defragd CLI: parse flags and run the daemon until killed.

use anyhow::Result;
use clap::Parser;
use defragd::engine::arg_parser::Cli;
use defragd::engine::cli::run;

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
