use std::collections::HashSet;

use crate::grid::{neighbours, CellKey, SpatialGrid};

const MAX_PASSES: usize = 10;
const MIN_OCCUPIED_NEIGHBOURS: usize = 6;
const MIN_STEEP_NEIGHBOURS: usize = 3;

/// Cells among `candidates` whose ground is steep against three or more neighbours.
///
/// Only cells with at least six occupied neighbours are judged.
pub fn detect_problematic<'a, I>(grid: &SpatialGrid, candidates: I) -> HashSet<CellKey>
where
    I: IntoIterator<Item = &'a CellKey>,
{
    let steep = grid.params().steep_slope();
    candidates
        .into_iter()
        .filter(|key| {
            let Some(cell) = grid.cell(key) else {
                return false;
            };
            let around: Vec<f64> = neighbours(**key)
                .filter_map(|n| grid.cell(&n).map(|c| c.ground))
                .collect();
            around.len() >= MIN_OCCUPIED_NEIGHBOURS
                && around
                    .iter()
                    .filter(|g| (cell.ground - **g).abs() > steep)
                    .count()
                    >= MIN_STEEP_NEIGHBOURS
        })
        .copied()
        .collect()
}

/// Pulls outlying ground cells to just above their lowest sound neighbour.
///
/// Returns the number of passes run. Smoothing stops once no problematic cell is
/// left, once fewer than a tenth of the initial ones remain, or after ten passes.
pub fn smooth(grid: &mut SpatialGrid) -> usize {
    let keys: Vec<CellKey> = grid.cells().map(|(k, _)| *k).collect();
    let mut problematic = detect_problematic(grid, &keys);
    let initial = problematic.len();
    let steep = grid.params().steep_slope();

    let mut passes = 0;
    while !problematic.is_empty() && passes < MAX_PASSES {
        let mut sorted: Vec<CellKey> = problematic.iter().copied().collect();
        sorted.sort_unstable();
        for key in &sorted {
            let lowest = neighbours(*key)
                .filter(|n| !problematic.contains(n))
                .filter_map(|n| grid.cell(&n).map(|c| c.ground))
                .reduce(f64::min);
            if let Some(lowest) = lowest {
                grid.set_ground(key, lowest + steep);
            }
        }
        passes += 1;
        problematic = detect_problematic(grid, &sorted);
        if problematic.len() * 10 < initial {
            break;
        }
    }
    log::debug!(
        "smoothed ground in {} passes, {} of {} problematic cells left",
        passes,
        problematic.len(),
        initial
    );
    passes
}
