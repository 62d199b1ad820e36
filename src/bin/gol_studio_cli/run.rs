use crate::util::{local_time, print_population};
use ahash::AHashMap as HashMap;
use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use gol_studio::{Grid, LifeEngine, SIMDEngine, ScalarEngine, SimConfig, Simulator};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

#[derive(Args, Debug)]
pub(super) struct RunArgs {
    /// Path to the file containing the pattern in .cells format
    pattern: Option<String>,

    /// Name of a preset to load instead of a pattern file
    #[arg(short, long, conflicts_with = "pattern")]
    preset: Option<String>,

    /// Directory containing the presets
    #[arg(long, default_value = SimConfig::DEFAULT_PRESETS_DIR)]
    presets_dir: String,

    /// Height of the grid
    #[arg(short, long, default_value_t = SimConfig::DEFAULT_ROWS)]
    rows: usize,

    /// Width of the grid
    #[arg(short, long, default_value_t = SimConfig::DEFAULT_COLS)]
    cols: usize,

    /// Advance by exactly this many generations, as fast as possible
    #[arg(short, long, conflicts_with = "seconds")]
    generations: Option<u64>,

    /// Run in real time for this many seconds, default is 5
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Generations per second when running in real time
    #[arg(short, long, default_value_t = SimConfig::DEFAULT_FPS)]
    fps: u32,

    /// The engine to use for the simulation, default is simd
    #[arg(short, long, value_enum, default_value_t = Engine::Simd)]
    engine: Engine,

    /// Path to the file where the resulting pattern will be saved
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Cell-by-cell reference implementation
    Scalar,
    /// Bit-parallel implementation
    Simd,
}

/// Wraps an engine and counts the steps it makes.
struct CountingEngine<E> {
    inner: E,
    steps: AtomicU64,
}

impl<E: LifeEngine> LifeEngine for CountingEngine<E> {
    fn new() -> Self {
        Self {
            inner: E::new(),
            steps: AtomicU64::new(0),
        }
    }

    fn step(&self, grid: &Grid) -> Grid {
        self.steps.fetch_add(1, Ordering::Relaxed);
        self.inner.step(grid)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Finds the first generation whose liveness was already seen.
struct PeriodDetector {
    seen: HashMap<u64, u64>,
    found: Option<(u64, u64)>,
}

impl PeriodDetector {
    fn new(grid: &Grid) -> Self {
        let mut seen = HashMap::new();
        seen.insert(grid.liveness_hash(), 0);
        Self { seen, found: None }
    }

    fn record(&mut self, generation: u64, grid: &Grid) {
        if self.found.is_some() {
            return;
        }
        if let Some(first) = self.seen.insert(grid.liveness_hash(), generation) {
            self.found = Some((first, generation - first));
        }
    }
}

pub(super) fn run_simulation(args: RunArgs) -> Result<()> {
    let config = SimConfig::default()
        .with_size(args.rows, args.cols)
        .with_fps(args.fps)
        .with_presets_dir(&args.presets_dir);

    let timer = std::time::Instant::now();
    let (engine, steps_done) = match args.engine {
        Engine::Scalar => counting::<ScalarEngine>(),
        Engine::Simd => counting::<SIMDEngine>(),
    };
    let sim = Simulator::with_engine(config, engine).context("Invalid grid size")?;
    match (&args.pattern, &args.preset) {
        (Some(path), None) => sim
            .load_pattern(path)
            .with_context(|| format!("Failed to load {path}"))?,
        (None, Some(name)) => sim
            .select_preset(name)
            .with_context(|| format!("Failed to load preset {name}"))?,
        _ => bail!("Either a pattern file or --preset must be given"),
    }
    println!(
        "[{}] Loaded pattern in {:.3} secs",
        local_time(),
        timer.elapsed().as_secs_f64()
    );
    print_population(&sim.model().grid());

    let timer = std::time::Instant::now();
    if let Some(generations) = args.generations {
        let mut detector = PeriodDetector::new(&sim.model().grid());
        for generation in 1..=generations {
            sim.single_step();
            detector.record(generation, &sim.model().grid());
        }
        match detector.found {
            Some((first, period)) => println!(
                "Pattern repeats from generation {first} with period {period}"
            ),
            None => println!("No repetition within {generations} generations"),
        }
    } else {
        let seconds = args.seconds.unwrap_or(5.0);
        if !(seconds.is_finite() && seconds >= 0.0) {
            bail!("Invalid duration: {seconds}");
        }
        sim.start()?;
        std::thread::sleep(Duration::from_secs_f64(seconds));
        sim.stop();
    }
    let elapsed = timer.elapsed().as_secs_f64();
    println!(
        "[{}] Made {} steps in {:.3} secs ({:.1} steps/sec)",
        local_time(),
        steps_done(),
        elapsed,
        steps_done() as f64 / elapsed.max(f64::EPSILON)
    );

    let result = sim.model().grid();
    print_population(&result);
    if let Some(output) = &args.output {
        sim.save_pattern(output)
            .with_context(|| format!("Failed to save {output}"))?;
        println!("Saved pattern to {output}");
    }
    Ok(())
}

fn counting<E: LifeEngine + 'static>() -> (Arc<dyn LifeEngine>, Box<dyn Fn() -> u64>) {
    let engine = Arc::new(CountingEngine::<E>::new());
    let probe = engine.clone();
    let steps_done: Box<dyn Fn() -> u64> = Box::new(move || probe.steps.load(Ordering::Relaxed));
    let engine: Arc<dyn LifeEngine> = engine;
    (engine, steps_done)
}
