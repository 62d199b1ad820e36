use crate::Grid;

/// Stepping engine for Game of Life with cell ages.
pub trait LifeEngine: Send + Sync {
    /// Creates a new engine instance.
    fn new() -> Self
    where
        Self: Sized;

    /// Computes the next generation of `grid` under the B3/S23 rule.
    ///
    /// Cells outside of the grid are treated as dead; there is no wraparound.
    ///
    /// # Returns
    ///
    /// A new grid of the same size where:
    /// * a dead cell with exactly 3 alive neighbors is born with age 1
    /// * an alive cell with 2 or 3 alive neighbors survives and its age grows
    ///   by one, saturating at [`MAX_AGE`](crate::MAX_AGE)
    /// * every other cell is dead (age 0)
    ///
    /// The input grid is never modified.
    fn step(&self, grid: &Grid) -> Grid;

    /// Applies [`LifeEngine::step`] `generations` times.
    fn advance(&self, grid: &Grid, generations: u64) -> Grid {
        let mut curr = grid.clone();
        for _ in 0..generations {
            curr = self.step(&curr);
        }
        curr
    }

    /// Short human-readable name, used in benchmarks and logs.
    fn name(&self) -> &'static str;
}

/// Age of a cell in the next generation given its current age and whether it
/// is alive in the next generation.
#[inline]
pub(crate) fn next_age(age: u8, alive_next: bool) -> u8 {
    if alive_next {
        age.saturating_add(1)
    } else {
        0
    }
}
