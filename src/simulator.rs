use crate::{
    config::{frame_interval, SimConfig},
    pattern, DefaultEngine, Grid, LifeEngine, LifeError, LifeModel, Result, Scheduler,
    SchedulerHandle, SchedulerState, SimState, CUSTOM_PRESET,
};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Control surface used by a front end: editing, pattern files, presets and
/// play/pause. Dropping it stops the background stepping.
///
/// Every change goes through the shared [`LifeModel`], so observers registered
/// on [`Simulator::model`] see all of them, including the steps made by the
/// background [`Scheduler`] while running.
pub struct Simulator {
    model: Arc<LifeModel>,
    engine: Arc<dyn LifeEngine>,
    scheduler: Mutex<Scheduler>,
    control: SchedulerHandle,
    presets_dir: PathBuf,
}

impl Simulator {
    /// Creates a simulator with a dead grid, using [`DefaultEngine`].
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::with_engine(config, Arc::new(DefaultEngine::new()))
    }

    pub fn with_engine(config: SimConfig, engine: Arc<dyn LifeEngine>) -> Result<Self> {
        config.validate()?;
        let scheduler = Scheduler::new();
        Ok(Self {
            model: Arc::new(LifeModel::new(&config)?),
            engine,
            control: scheduler.handle(),
            scheduler: Mutex::new(scheduler),
            presets_dir: config.presets_dir,
        })
    }

    pub fn model(&self) -> &Arc<LifeModel> {
        &self.model
    }

    pub fn snapshot(&self) -> SimState {
        self.model.snapshot()
    }

    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Flips the cell at `(row, col)` between dead and newborn.
    pub fn toggle_cell(&self, row: usize, col: usize) -> Result<()> {
        self.model.update_grid(|grid| grid.toggled(row, col))
    }

    /// Resets the grid to the active preset, or to a dead grid when the
    /// active preset is [`CUSTOM_PRESET`].
    pub fn clear(&self) -> Result<()> {
        self.select_preset(&self.model.active_preset_name())
    }

    /// Loads a pattern file into the middle of a dead grid and marks the grid
    /// as custom. On failure nothing changes.
    pub fn load_pattern(&self, path: impl AsRef<Path>) -> Result<()> {
        self.load_centered(path.as_ref(), CUSTOM_PRESET)
    }

    fn load_centered(&self, path: &Path, preset: &str) -> Result<()> {
        let pattern = pattern::load_pattern(path)?;
        self.model
            .update_grid_with_preset(preset, |grid| {
                pattern.place_centered(grid.rows(), grid.cols())
            })
            .inspect_err(|err| tracing::debug!(%err, "pattern rejected"))
    }

    /// Saves the liveness of the current grid.
    pub fn save_pattern(&self, path: impl AsRef<Path>) -> Result<()> {
        pattern::save_pattern(path, &self.model.grid())
    }

    /// Names of the presets available in the configured directory, sorted.
    pub fn presets(&self) -> Result<Vec<String>> {
        let mut names = pattern::list_presets(&self.presets_dir)?;
        names.sort();
        Ok(names)
    }

    /// Loads the preset called `name`, or clears the grid for [`CUSTOM_PRESET`].
    /// On failure neither the grid nor the active preset changes.
    pub fn select_preset(&self, name: &str) -> Result<()> {
        if name == CUSTOM_PRESET {
            self.model
                .update_grid_with_preset(name, |grid| Grid::new(grid.rows(), grid.cols()))
        } else {
            self.load_centered(&pattern::preset_path(&self.presets_dir, name), name)
        }
    }

    /// Sets the target generations per second, also for a running simulation.
    pub fn set_speed(&self, fps: u32) {
        self.model.set_fps(fps);
        self.control.set_interval(frame_interval(self.model.fps()));
    }

    pub fn set_show_age(&self, show_age: bool) {
        self.model.set_show_age(show_age);
    }

    /// Replaces the grid with a dead grid of another size.
    pub fn resize(&self, rows: usize, cols: usize) -> Result<()> {
        let grid = Grid::new(rows, cols)?;
        self.model
            .update_grid_with_preset(CUSTOM_PRESET, move |_| Ok(grid))
    }

    /// Advances the grid by one generation.
    pub fn single_step(&self) {
        step_model(&self.model, self.engine.as_ref());
    }

    /// Starts stepping in the background at the current speed.
    /// Does nothing if already running, or if an observer stopped the run
    /// again as soon as it was marked running.
    ///
    /// No lock is held while observers are notified, so they may call any
    /// method here, including [`Simulator::stop`].
    ///
    /// # Errors
    ///
    /// Returns [`LifeError::SchedulerBusy`] when called from an observer while
    /// a previous loop is still winding down.
    pub fn start(&self) -> Result<()> {
        if self.control.is_running() {
            return Ok(());
        }
        self.model.set_running(true);
        let started = {
            let mut scheduler = self.scheduler();
            if scheduler.is_running() || !self.model.running() {
                return Ok(());
            }
            if scheduler.state() != SchedulerState::Idle && self.model.is_notifying() {
                // the old loop may be waiting for this very notification
                Err(LifeError::SchedulerBusy)
            } else {
                let (model, engine) = (self.model.clone(), self.engine.clone());
                scheduler.start(
                    move || step_model(&model, engine.as_ref()),
                    frame_interval(self.model.fps()),
                )
            }
        };
        if started.is_err() {
            self.model.set_running(false);
        }
        started
    }

    /// Stops background stepping; no step starts after this returns.
    ///
    /// From inside an observer the loop is only asked to stop: a step that
    /// already began may still finish, after its notification can be delivered.
    pub fn stop(&self) {
        if self.model.is_notifying() {
            self.control.request_stop();
        } else {
            self.scheduler().stop();
        }
        if self.model.running() {
            self.model.set_running(false);
        }
    }

    /// Starts when stopped, stops when running.
    pub fn start_stop(&self) -> Result<()> {
        if self.model.running() {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }
}

fn step_model(model: &LifeModel, engine: &dyn LifeEngine) {
    // stepping keeps the size, so it cannot fail
    if let Err(err) = model.update_grid(|grid| Ok(engine.step(grid))) {
        tracing::warn!(%err, "step skipped");
    }
}
