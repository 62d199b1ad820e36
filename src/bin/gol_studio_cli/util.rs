use chrono::Local;
use gol_studio::Grid;
use num_format::{CustomFormat, Grouping, ToFormattedString};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; the filter is taken from `RUST_LOG` and defaults to `info`.
pub(super) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub(super) fn print_population(grid: &Grid) {
    let fmt = CustomFormat::builder()
        .grouping(Grouping::Standard)
        .separator("_")
        .build()
        .unwrap();
    println!(
        "Population: {} of {} cells, oldest cell: {} generations",
        grid.population().to_formatted_string(&fmt),
        (grid.rows() * grid.cols()).to_formatted_string(&fmt),
        grid.max_age()
    );
}

pub(super) fn local_time() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}
