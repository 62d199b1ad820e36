use std::{io, path::PathBuf};
use thiserror::Error;

/// All kinds of errors in this crate.
///
/// `InvalidDimension` and `OutOfBounds` mean the caller passed nonsense and are
/// not expected at runtime. The pattern errors are ordinary outcomes of user
/// actions; every operation that returns one leaves the current grid untouched.
#[derive(Error, Debug)]
pub enum LifeError {
    /// A grid was requested with a zero side.
    #[error("invalid grid dimensions {rows}x{cols}")]
    InvalidDimension { rows: usize, cols: usize },

    /// A cell index lies outside of the grid.
    #[error("cell ({row}, {col}) is outside of the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// The pattern file does not exist.
    #[error("pattern file {0:?} not found")]
    PatternNotFound(PathBuf),

    /// The pattern does not fit into the active grid.
    #[error(
        "pattern of {}x{} does not fit into the {}x{} grid",
        pattern.0, pattern.1, grid.0, grid.1
    )]
    PatternTooLarge {
        pattern: (usize, usize),
        grid: (usize, usize),
    },

    /// The pattern file exists but could not be read, or a preset directory
    /// could not be listed.
    #[error("failed to read {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing a pattern file failed.
    #[error("failed to write pattern to {path:?}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `start` was called on a scheduler that is not idle.
    #[error("the scheduler is already running")]
    SchedulerBusy,
}

pub type Result<T> = std::result::Result<T, LifeError>;
