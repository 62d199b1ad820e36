use crate::{traits::next_age, Grid, LifeEngine};

/// Straightforward cell-by-cell engine.
///
/// Counts the neighbors of every cell separately, so it is slow on large grids,
/// but it is small enough to serve as the reference the other engines are
/// checked against.
pub struct ScalarEngine;

impl ScalarEngine {
    const NEIGHBORS: [(isize, isize); 8] = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ];

    fn alive_neighbors(alive: &[bool], rows: usize, cols: usize, y: usize, x: usize) -> u32 {
        let mut count = 0;
        for (dy, dx) in Self::NEIGHBORS {
            let (ny, nx) = (y.wrapping_add_signed(dy), x.wrapping_add_signed(dx));
            // out of bounds (including wrapped-around negatives) counts as dead
            if ny < rows && nx < cols && alive[ny * cols + nx] {
                count += 1;
            }
        }
        count
    }
}

impl LifeEngine for ScalarEngine {
    fn new() -> Self {
        Self
    }

    fn step(&self, grid: &Grid) -> Grid {
        let (rows, cols) = grid.size();
        let alive = grid.cells().iter().map(|&x| x != 0).collect::<Vec<_>>();

        let mut cells = Vec::with_capacity(alive.len());
        for y in 0..rows {
            for x in 0..cols {
                let idx = y * cols + x;
                let n = Self::alive_neighbors(&alive, rows, cols, y, x);
                let born = !alive[idx] && n == 3;
                let survived = alive[idx] && (n == 2 || n == 3);
                cells.push(next_age(grid.cells()[idx], born || survived));
            }
        }
        Grid::from_cells(rows, cols, cells)
    }

    fn name(&self) -> &'static str {
        "scalar"
    }
}
