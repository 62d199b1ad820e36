use crate::util::print_population;
use anyhow::{Context, Result};
use clap::Args;
use gol_studio::load_pattern;

#[derive(Args, Debug)]
pub(super) struct StatsArgs {
    /// Path to the file containing the pattern in .cells format
    pattern: String,
}

pub(super) fn run_stats(args: StatsArgs) -> Result<()> {
    let timer = std::time::Instant::now();
    let grid =
        load_pattern(&args.pattern).with_context(|| format!("Failed to load {}", args.pattern))?;
    println!("Size: {}x{}", grid.rows(), grid.cols());
    println!("Hash: 0x{:016x}", grid.liveness_hash());
    print_population(&grid);
    println!(
        "Computed stats in {:.3} secs",
        timer.elapsed().as_secs_f64()
    );
    Ok(())
}
