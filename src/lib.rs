#![warn(clippy::all)]

mod config;
mod error;
mod grid;
mod model;
pub mod pattern;
mod scalar;
mod scheduler;
mod simd;
mod simulator;
mod traits;

pub use config::{frame_interval, SimConfig};
pub use error::{LifeError, Result};
pub use grid::{Age, Grid, MAX_AGE};
pub use model::{LifeModel, SimState};
pub use pattern::{list_presets, load_pattern, save_pattern};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState, FLOOR_SLEEP};
pub use simulator::Simulator;
pub use traits::LifeEngine;

pub use scalar::ScalarEngine;
pub use simd::SIMDEngine;

pub type DefaultEngine = SIMDEngine;

pub const VERSION: &str = "0.1.0";

/// Preset name meaning that the grid was edited by hand or cleared rather
/// than loaded from a preset. No real preset can have this name.
pub const CUSTOM_PRESET: &str = "Custom";
