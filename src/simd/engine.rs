use crate::{traits::next_age, Grid, LifeEngine};

/// A fast engine that uses bitwise operations to compute liveness of 64 cells
/// at once. Its performance is pattern-oblivious.
///
/// Liveness is packed into `u64` words (bit `j` of word `k` in a row is column
/// `64 * k + j`), evolved with a full-adder network, and then the ages are
/// recomputed from the packed result in a single pass.
///
/// # Example
///
/// ```rust
/// use gol_studio::{Grid, LifeEngine, SIMDEngine};
///
/// let grid = Grid::random(128, 200, 0.3, Some(7)).unwrap();
/// let engine = SIMDEngine::new();
///
/// // Run for 100 generations
/// let result = engine.advance(&grid, 100);
/// assert_eq!(result.size(), grid.size());
/// ```
pub struct SIMDEngine;

impl SIMDEngine {
    const CELLS_IN_CHUNK: usize = 64;

    /// Returns the western neighbors, the cells themselves and the eastern
    /// neighbors of word `x`, with dead cells shifted in at the grid edges.
    #[inline(always)]
    fn shifted(row: &[u64], x: usize) -> (u64, u64, u64) {
        let shift = Self::CELLS_IN_CHUNK - 1;
        let b = row[x];
        let west = if x > 0 { row[x - 1] >> shift } else { 0 };
        let east = row.get(x + 1).map_or(0, |&next| next << shift);
        ((b << 1) | west, b, (b >> 1) | east)
    }

    fn update_row(row_prev: &[u64], row_curr: &[u64], row_next: &[u64], dst: &mut [u64]) {
        for x in 0..dst.len() {
            let (a, b, c) = Self::shifted(row_prev, x);
            let (h, i, d) = Self::shifted(row_curr, x);
            let (g, f, e) = Self::shifted(row_next, x);
            let (ab0, ab1, cd0, cd1) = (a ^ b, a & b, c ^ d, c & d);
            let (ef0, ef1, gh0, gh1) = (e ^ f, e & f, g ^ h, g & h);
            let (ad0, ad1, ad2) = (ab0 ^ cd0, ab1 ^ cd1 ^ (ab0 & cd0), ab1 & cd1);
            let (eh0, eh1, eh2) = (ef0 ^ gh0, ef1 ^ gh1 ^ (ef0 & gh0), ef1 & gh1);
            let (ah0, xx, yy) = (ad0 ^ eh0, ad0 & eh0, ad1 ^ eh1);
            let (ah1, ah23) = (xx ^ yy, ad2 | eh2 | (ad1 & eh1) | (xx & yy));
            let z = !ah23 & ah1;
            let (i2, i3) = (!ah0 & z, ah0 & z);
            dst[x] = (i & i2) | i3;
        }
    }

    fn pack(grid: &Grid, w: usize) -> Vec<u64> {
        let mut data = vec![0u64; grid.rows() * w];
        for (y, row) in grid.row_slices().enumerate() {
            for (x, &age) in row.iter().enumerate() {
                data[y * w + x / Self::CELLS_IN_CHUNK] |=
                    ((age != 0) as u64) << (x % Self::CELLS_IN_CHUNK);
            }
        }
        data
    }

    /// Computes the packed liveness of the next generation.
    fn next_liveness(data: &[u64], rows: usize, cols: usize, w: usize) -> Vec<u64> {
        let blank = vec![0u64; w];
        let mut next = vec![0u64; data.len()];
        let tail_mask = match cols % Self::CELLS_IN_CHUNK {
            0 => u64::MAX,
            rem => (1u64 << rem) - 1,
        };

        for y in 0..rows {
            let row_prev = if y > 0 {
                &data[(y - 1) * w..y * w]
            } else {
                &blank[..]
            };
            let row_curr = &data[y * w..(y + 1) * w];
            let row_next = if y + 1 < rows {
                &data[(y + 1) * w..(y + 2) * w]
            } else {
                &blank[..]
            };
            let dst = &mut next[y * w..(y + 1) * w];
            Self::update_row(row_prev, row_curr, row_next, dst);
            // births just past the eastern edge are not part of the grid
            dst[w - 1] &= tail_mask;
        }
        next
    }
}

impl LifeEngine for SIMDEngine {
    fn new() -> Self {
        Self
    }

    fn step(&self, grid: &Grid) -> Grid {
        let (rows, cols) = grid.size();
        if grid.is_empty() {
            return grid.clone();
        }
        let w = cols.div_ceil(Self::CELLS_IN_CHUNK);
        let next = Self::next_liveness(&Self::pack(grid, w), rows, cols, w);

        let mut cells = Vec::with_capacity(rows * cols);
        for (y, row) in grid.row_slices().enumerate() {
            for (x, &age) in row.iter().enumerate() {
                let word = next[y * w + x / Self::CELLS_IN_CHUNK];
                cells.push(next_age(age, (word >> (x % Self::CELLS_IN_CHUNK)) & 1 != 0));
            }
        }
        Grid::from_cells(rows, cols, cells)
    }

    fn name(&self) -> &'static str {
        "simd"
    }
}
