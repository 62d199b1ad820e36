use anyhow::{Context, Result};
use clap::Args;
use gol_studio::{list_presets, SimConfig};

#[derive(Args, Debug)]
pub(super) struct PresetsArgs {
    /// Directory containing .cells pattern files
    #[arg(short, long, default_value = SimConfig::DEFAULT_PRESETS_DIR)]
    dir: String,
}

pub(super) fn run_presets(args: PresetsArgs) -> Result<()> {
    let mut names =
        list_presets(&args.dir).with_context(|| format!("Failed to list {}", args.dir))?;
    names.sort();
    if names.is_empty() {
        println!("No presets in {}", args.dir);
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
