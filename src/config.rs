use crate::{LifeError, Result};
use std::{path::PathBuf, time::Duration};

/// Settings a [`Simulator`](crate::Simulator) starts with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Height of the grid in cells.
    pub rows: usize,
    /// Width of the grid in cells.
    pub cols: usize,
    /// Target number of generations per second while running.
    pub fps: u32,
    /// Directory scanned for preset pattern files.
    pub presets_dir: PathBuf,
}

impl SimConfig {
    pub const DEFAULT_ROWS: usize = 150;
    pub const DEFAULT_COLS: usize = 300;
    pub const DEFAULT_FPS: u32 = 30;
    pub const DEFAULT_PRESETS_DIR: &'static str = "patterns";

    pub fn with_size(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Zero is raised to one generation per second.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    pub fn with_presets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.presets_dir = dir.into();
        self
    }

    /// Checks that the configured grid can be created.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(LifeError::InvalidDimension {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: Self::DEFAULT_ROWS,
            cols: Self::DEFAULT_COLS,
            fps: Self::DEFAULT_FPS,
            presets_dir: PathBuf::from(Self::DEFAULT_PRESETS_DIR),
        }
    }
}

/// Time between two generations at `fps` generations per second.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}
