//! Plain text (`.cells`) pattern files.
//!
//! A pattern file is a block of lines where `O` marks an alive cell and any
//! other character (normally `.`) a dead one. Lines starting with `!` are
//! comments. Lines may have different lengths: the pattern is as wide as its
//! longest line and shorter lines are padded with dead cells.
//!
//! Only liveness is stored, so ages are lost when a grid is saved.
use crate::{Age, Grid, LifeError, Result, CUSTOM_PRESET};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Extension of pattern files, without the dot.
pub const PATTERN_EXTENSION: &str = "cells";

const ALIVE: char = 'O';
const DEAD: char = '.';
const COMMENT: char = '!';

/// Builds a grid from the contents of a pattern file.
///
/// Alive cells get age 1. A file without any pattern lines gives a `0x0` grid.
/// Lines may end with `\n`, `\r\n` or a lone `\r`.
pub fn parse_cells(text: &str) -> Grid {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines = text
        .lines()
        .filter(|line| !line.starts_with(COMMENT))
        .collect::<Vec<_>>();
    let rows = lines.len();
    let cols = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);

    let mut cells = vec![0 as Age; rows * cols];
    for (y, line) in lines.iter().enumerate() {
        for (x, c) in line.chars().enumerate() {
            if c == ALIVE {
                cells[y * cols + x] = 1;
            }
        }
    }
    Grid::from_cells(rows, cols, cells)
}

/// Renders the liveness of `grid` as pattern file contents, one
/// newline-terminated line per row.
pub fn to_cells(grid: &Grid) -> String {
    let mut text = String::with_capacity(grid.rows() * (grid.cols() + 1));
    for row in grid.row_slices() {
        text.extend(row.iter().map(|&age| if age == 0 { DEAD } else { ALIVE }));
        text.push('\n');
    }
    text
}

/// Reads a pattern file.
///
/// # Errors
///
/// - [`LifeError::PatternNotFound`] if there is no file at `path`
/// - [`LifeError::ReadError`] if the file exists but cannot be read
pub fn load_pattern(path: impl AsRef<Path>) -> Result<Grid> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LifeError::PatternNotFound(path.to_path_buf()));
    }
    let data = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LifeError::PatternNotFound(path.to_path_buf()),
        _ => LifeError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let grid = parse_cells(&String::from_utf8_lossy(&data));
    tracing::debug!(
        path = %path.display(),
        rows = grid.rows(),
        cols = grid.cols(),
        "pattern loaded"
    );
    Ok(grid)
}

/// Writes the liveness of `grid` to a pattern file, replacing any existing file.
///
/// The data goes to a temporary file next to `path` first, which is then
/// renamed over `path`, so a failed save never leaves a truncated pattern.
///
/// # Errors
///
/// Returns [`LifeError::WriteError`] on any I/O failure.
pub fn save_pattern(path: impl AsRef<Path>, grid: &Grid) -> Result<()> {
    let path = path.as_ref();
    let write_error = |source| LifeError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| write_error(io::Error::from(io::ErrorKind::InvalidInput)))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = fs::write(&tmp_path, to_cells(grid)).and_then(|_| fs::rename(&tmp_path, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_error(source));
    }
    tracing::debug!(path = %path.display(), population = grid.population(), "pattern saved");
    Ok(())
}

/// Lists the names (file names without the extension) of the pattern files
/// lying directly in `dir`, in the order the filesystem reports them.
///
/// A file named after [`CUSTOM_PRESET`] is skipped, since that name is
/// reserved for grids that do not come from a preset.
///
/// # Errors
///
/// Returns [`LifeError::ReadError`] if `dir` cannot be listed.
pub fn list_presets(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let read_error = |source| LifeError::ReadError {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = vec![];
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if !path.is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(PATTERN_EXTENSION)
        {
            continue;
        }
        match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(name) if name != CUSTOM_PRESET => names.push(name.to_string()),
            _ => (),
        }
    }
    Ok(names)
}

/// Path of the preset called `name` inside `dir`.
pub fn preset_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{name}.{PATTERN_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LifeEngine, ScalarEngine};
    const SEED: u64 = 42;

    const GLIDER: &str = "!Name: Glider\n!\n.O.\n..O\nOOO\n";

    #[test]
    fn test_parse_glider() {
        let grid = parse_cells(GLIDER);
        assert_eq!(grid.size(), (3, 3));
        assert_eq!(grid.population(), 5);
        for (y, x) in [(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)] {
            assert_eq!(grid.get(y, x).unwrap(), 1);
        }
    }

    #[test]
    fn test_parse_pads_short_lines() {
        let grid = parse_cells("O\n...O\r\n\n.O");
        assert_eq!(grid.size(), (4, 4));
        assert_eq!(grid.get(0, 0).unwrap(), 1);
        assert_eq!(grid.get(1, 3).unwrap(), 1);
        assert_eq!(grid.get(3, 1).unwrap(), 1);
        assert_eq!(grid.population(), 3);
    }

    #[test]
    fn test_parse_carriage_returns() {
        for text in ["O.\r\n.O\r", "O.\r.O", "!classic\rO.\r.O\r", "O.\n.O\r\n"] {
            let grid = parse_cells(text);
            assert_eq!(grid.size(), (2, 2), "{text:?}");
            assert_eq!(grid.get(0, 0).unwrap(), 1);
            assert_eq!(grid.get(1, 1).unwrap(), 1);
            assert_eq!(grid.population(), 2);
        }
    }

    #[test]
    fn test_parse_comments_do_not_take_rows() {
        let grid = parse_cells("O.\n!a comment in the middle\n.O\n");
        assert_eq!(grid.size(), (2, 2));
        assert_eq!(grid.get(1, 1).unwrap(), 1);
    }

    #[test]
    fn test_parse_degenerate() {
        assert_eq!(parse_cells("").size(), (0, 0));
        assert_eq!(parse_cells("!only\n!comments\n").size(), (0, 0));
    }

    #[test]
    fn test_to_cells_drops_ages() {
        let mut grid = Grid::new(2, 3).unwrap();
        grid.set(0, 0, 1).unwrap();
        grid.set(1, 2, 250).unwrap();
        assert_eq!(to_cells(&grid), "O..\n..O\n");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("random.cells");
        let engine = ScalarEngine::new();
        for (rows, cols) in [(1, 1), (5, 17), (32, 9)] {
            // a few steps so that ages differ
            let grid = engine.advance(&Grid::random(rows, cols, 0.4, Some(SEED)).unwrap(), 3);
            save_pattern(&path, &grid).unwrap();
            let loaded = load_pattern(&path).unwrap();
            // trailing dead columns and rows are kept because every line is written in full
            assert!(loaded.same_liveness(&grid));
        }
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.cells");
        assert!(matches!(
            load_pattern(&path),
            Err(LifeError::PatternNotFound(p)) if p == path
        ));
        assert!(matches!(
            load_pattern(dir.path()),
            Err(LifeError::PatternNotFound(_))
        ));
    }

    #[test]
    fn test_save_into_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("x.cells");
        let grid = Grid::new(2, 2).unwrap();
        assert!(matches!(
            save_pattern(&path, &grid),
            Err(LifeError::WriteError { .. })
        ));
    }

    #[test]
    fn test_list_presets() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["glider.cells", "pulsar.cells", "notes.txt", "Custom.cells"] {
            fs::write(dir.path().join(name), ".O.\n").unwrap();
        }
        fs::create_dir(dir.path().join("nested.cells")).unwrap();

        let mut names = list_presets(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["glider", "pulsar"]);
        assert_eq!(
            preset_path(dir.path(), "glider"),
            dir.path().join("glider.cells")
        );
    }

    #[test]
    fn test_list_presets_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            list_presets(dir.path().join("nope")),
            Err(LifeError::ReadError { .. })
        ));
    }
}
