use crate::{LifeError, Result};
use rand::{Rng, SeedableRng};
use std::hash::{Hash, Hasher};

/// Age of a cell: 0 is dead, 1..=255 is alive for that many generations.
pub type Age = u8;

/// Age that a cell never grows beyond.
pub const MAX_AGE: Age = Age::MAX;

/// Rectangular field of cell ages with a dead boundary.
///
/// Cells are stored row-major, so `cells.len() == rows * cols` always holds.
/// A grid is never edited in place by the simulation: steps, loads, clears and
/// toggles all produce a new grid, leaving the previous generation intact.
///
/// The only way to obtain a grid with a zero side is to load an empty pattern
/// file (or to use [`Grid::default`]); [`Grid::new`] rejects such sizes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Age>,
}

impl Grid {
    /// Creates a grid of dead cells.
    ///
    /// # Errors
    ///
    /// Returns [`LifeError::InvalidDimension`] if `rows` or `cols` is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(LifeError::InvalidDimension { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        })
    }

    /// `cells` must hold exactly `rows * cols` ages in row-major order.
    pub(crate) fn from_cells(rows: usize, cols: usize, cells: Vec<Age>) -> Self {
        debug_assert_eq!(cells.len(), rows * cols);
        Self { rows, cols, cells }
    }

    /// Creates a grid where every cell is alive (with age 1) with probability `density`.
    ///
    /// # Arguments
    ///
    /// * `density` - Probability of a cell being alive, clamped to `[0, 1]`.
    ///   NaN counts as 0.
    /// * `seed` - Optional seed for the random number generator.
    ///   If None, seeds from the OS.
    ///
    /// # Errors
    ///
    /// Returns [`LifeError::InvalidDimension`] if `rows` or `cols` is zero.
    pub fn random(rows: usize, cols: usize, density: f64, seed: Option<u64>) -> Result<Self> {
        let mut grid = Self::new(rows, cols)?;
        let mut rng = if let Some(x) = seed {
            rand_chacha::ChaCha8Rng::seed_from_u64(x)
        } else {
            rand_chacha::ChaCha8Rng::from_os_rng()
        };
        let density = if density.is_nan() {
            0.0
        } else {
            density.clamp(0.0, 1.0)
        };
        for cell in grid.cells.iter_mut() {
            *cell = rng.random_bool(density) as Age;
        }
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns true if the grid has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(LifeError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    /// Returns the age of the cell at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<Age> {
        Ok(self.cells[self.offset(row, col)?])
    }

    /// Overwrites the age of the cell at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, age: Age) -> Result<()> {
        let idx = self.offset(row, col)?;
        self.cells[idx] = age;
        Ok(())
    }

    pub fn is_alive(&self, row: usize, col: usize) -> Result<bool> {
        Ok(self.get(row, col)? != 0)
    }

    /// Returns a copy of the grid with the cell at `(row, col)` flipped:
    /// a dead cell becomes a newborn, an alive cell of any age dies.
    pub fn toggled(&self, row: usize, col: usize) -> Result<Self> {
        let idx = self.offset(row, col)?;
        let mut next = self.clone();
        next.cells[idx] = if next.cells[idx] == 0 { 1 } else { 0 };
        Ok(next)
    }

    /// All ages in row-major order.
    pub fn cells(&self) -> &[Age] {
        &self.cells
    }

    /// Iterates over the rows of the grid as slices of ages.
    pub fn row_slices(&self) -> impl Iterator<Item = &[Age]> + '_ {
        (0..self.rows).map(move |r| &self.cells[r * self.cols..(r + 1) * self.cols])
    }

    /// Number of alive cells.
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&x| x != 0).count()
    }

    /// Age of the oldest cell, 0 for a dead grid.
    pub fn max_age(&self) -> Age {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Computes a 64-bit hash of the liveness pattern, ignoring ages.
    /// Intended for fast probabilistic comparison of generations.
    pub fn liveness_hash(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        self.size().hash(&mut hasher);
        for chunk in self.cells.chunks(64) {
            let mut word = 0u64;
            for (i, &age) in chunk.iter().enumerate() {
                word |= ((age != 0) as u64) << i;
            }
            word.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Returns true if both grids have the same size and the same alive cells.
    pub fn same_liveness(&self, other: &Grid) -> bool {
        self.size() == other.size()
            && self
                .cells
                .iter()
                .zip(other.cells.iter())
                .all(|(&a, &b)| (a != 0) == (b != 0))
    }

    /// Copies `self` into the middle of a dead `rows x cols` grid.
    ///
    /// The top-left corner of `self` lands at
    /// `((rows - self.rows) / 2, (cols - self.cols) / 2)`.
    ///
    /// # Errors
    ///
    /// - [`LifeError::InvalidDimension`] if `rows` or `cols` is zero
    /// - [`LifeError::PatternTooLarge`] if `self` is larger than the target
    ///   in either dimension
    pub fn place_centered(&self, rows: usize, cols: usize) -> Result<Self> {
        let mut dst = Self::new(rows, cols)?;
        if self.rows > rows || self.cols > cols {
            return Err(LifeError::PatternTooLarge {
                pattern: self.size(),
                grid: (rows, cols),
            });
        }
        let (dy, dx) = ((rows - self.rows) / 2, (cols - self.cols) / 2);
        for (y, src_row) in self.row_slices().enumerate() {
            let start = (y + dy) * cols + dx;
            dst.cells[start..start + self.cols].copy_from_slice(src_row);
        }
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const SEED: u64 = 42;

    #[test]
    fn test_new_rejects_zero_sides() {
        for (rows, cols) in [(0, 0), (0, 5), (5, 0)] {
            assert!(matches!(
                Grid::new(rows, cols),
                Err(LifeError::InvalidDimension { .. })
            ));
        }
        let grid = Grid::new(3, 4).unwrap();
        assert_eq!(grid.size(), (3, 4));
        assert_eq!(grid.cells().len(), 12);
        assert_eq!(grid.population(), 0);
    }

    #[test]
    fn test_get_set_bounds() {
        let mut grid = Grid::new(2, 3).unwrap();
        grid.set(1, 2, 7).unwrap();
        assert_eq!(grid.get(1, 2).unwrap(), 7);
        assert!(grid.is_alive(1, 2).unwrap());
        assert!(!grid.is_alive(0, 0).unwrap());
        assert!(matches!(grid.get(2, 0), Err(LifeError::OutOfBounds { .. })));
        assert!(matches!(grid.set(0, 3, 1), Err(LifeError::OutOfBounds { .. })));
    }

    #[test]
    fn test_clone_is_detached() {
        let grid = Grid::new(2, 2).unwrap();
        let mut copy = grid.clone();
        copy.set(0, 0, 1).unwrap();
        assert_eq!(grid.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_toggled() {
        let mut grid = Grid::new(2, 2).unwrap();
        grid.set(0, 1, 200).unwrap();
        let next = grid.toggled(0, 1).unwrap().toggled(1, 0).unwrap();
        assert_eq!(next.get(0, 1).unwrap(), 0);
        assert_eq!(next.get(1, 0).unwrap(), 1);
        assert_eq!(grid.get(0, 1).unwrap(), 200);
        assert!(grid.toggled(2, 2).is_err());
    }

    #[test]
    fn test_place_centered() {
        let mut dot = Grid::new(1, 1).unwrap();
        dot.set(0, 0, 1).unwrap();
        let placed = dot.place_centered(5, 5).unwrap();
        assert_eq!(placed.population(), 1);
        assert_eq!(placed.get(2, 2).unwrap(), 1);

        let mut bar = Grid::new(1, 3).unwrap();
        for c in 0..3 {
            bar.set(0, c, 1).unwrap();
        }
        let placed = bar.place_centered(4, 6).unwrap();
        for c in 1..4 {
            assert_eq!(placed.get(1, c).unwrap(), 1);
        }
        assert_eq!(placed.population(), 3);
    }

    #[test]
    fn test_place_centered_too_large() {
        let grid = Grid::new(3, 7).unwrap();
        assert!(matches!(
            grid.place_centered(5, 5),
            Err(LifeError::PatternTooLarge {
                pattern: (3, 7),
                grid: (5, 5)
            })
        ));
        assert!(matches!(
            Grid::new(6, 1).unwrap().place_centered(5, 5),
            Err(LifeError::PatternTooLarge { .. })
        ));
    }

    #[test]
    fn test_place_centered_empty_pattern() {
        let placed = Grid::default().place_centered(3, 3).unwrap();
        assert_eq!(placed, Grid::new(3, 3).unwrap());
    }

    #[test]
    fn test_random_is_reproducible() {
        let a = Grid::random(20, 30, 0.5, Some(SEED)).unwrap();
        let b = Grid::random(20, 30, 0.5, Some(SEED)).unwrap();
        assert_eq!(a, b);
        assert!(a.population() > 0 && a.population() < 600);
        assert!(a.cells().iter().all(|&x| x <= 1));
        assert_eq!(Grid::random(4, 4, 0.0, Some(SEED)).unwrap().population(), 0);
        assert_eq!(Grid::random(4, 4, 1.0, Some(SEED)).unwrap().population(), 16);
    }

    #[test]
    fn test_random_density_out_of_range() {
        assert_eq!(Grid::random(4, 4, f64::NAN, Some(SEED)).unwrap().population(), 0);
        assert_eq!(Grid::random(4, 4, -3.0, Some(SEED)).unwrap().population(), 0);
        assert_eq!(Grid::random(4, 4, 7.5, Some(SEED)).unwrap().population(), 16);
        assert_eq!(Grid::random(4, 4, f64::INFINITY, None).unwrap().population(), 16);
    }

    #[test]
    fn test_liveness_hash_ignores_age() {
        let mut a = Grid::new(3, 3).unwrap();
        a.set(1, 1, 1).unwrap();
        let mut b = Grid::new(3, 3).unwrap();
        b.set(1, 1, 99).unwrap();
        assert_eq!(a.liveness_hash(), b.liveness_hash());
        assert!(a.same_liveness(&b));
        b.set(0, 0, 1).unwrap();
        assert_ne!(a.liveness_hash(), b.liveness_hash());
        assert!(!a.same_liveness(&b));
    }
}
