mod presets;
mod run;
mod stats;
mod util;

use clap::{Parser, Subcommand};
use presets::{run_presets, PresetsArgs};
use run::{run_simulation, RunArgs};
use stats::{run_stats, StatsArgs};

#[derive(Parser, Debug)]
#[command(version, about)]
struct CLIParser {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Load a pattern into a grid and let it evolve, step by step or in real time
    Run(RunArgs),
    /// List the presets found in a directory
    Presets(PresetsArgs),
    /// Print pattern's size, population and hash
    Stats(StatsArgs),
}

fn main() -> anyhow::Result<()> {
    util::init_tracing();
    let args = CLIParser::parse();

    match args.action {
        Action::Run(args) => run_simulation(args),
        Action::Presets(args) => run_presets(args),
        Action::Stats(args) => run_stats(args),
    }
}
