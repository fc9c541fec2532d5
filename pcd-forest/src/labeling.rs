//! Segmentation of canopy cells into trees.
//!
//! Cells thicker than `slicedepth` are grouped into coarse cells `joinedcells` times
//! larger, and 8-connected coarse cells form one tree. Labelling is a flood fill
//! with an explicit stack, so crown size never limits recursion depth.

use std::collections::{BTreeMap, HashMap};

use crate::grid::{neighbours, CellKey, SpatialGrid};

/// Mapping from fine cell to tree id for one grid snapshot.
///
/// Ids are dense in `0..tree_count()`. Cells outside every tree have no id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeLabels {
    point_count: u64,
    labels: HashMap<CellKey, usize>,
    tree_count: usize,
}

impl TreeLabels {
    pub fn get(&self, key: &CellKey) -> Option<usize> {
        self.labels.get(key).copied()
    }

    pub fn tree_count(&self) -> usize {
        self.tree_count
    }

    /// Number of labelled fine cells.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Point count of the grid these labels were computed from.
    pub fn point_count(&self) -> u64 {
        self.point_count
    }

    /// The cells of every tree, indexed by tree id, each sorted by key.
    pub fn trees(&self) -> Vec<Vec<CellKey>> {
        let mut trees = vec![Vec::new(); self.tree_count];
        for (&key, &id) in &self.labels {
            trees[id].push(key);
        }
        for cells in &mut trees {
            cells.sort_unstable();
        }
        trees
    }
}

fn coarse_key(key: CellKey, joinedcells: i64) -> CellKey {
    (key.0.div_euclid(joinedcells), key.1.div_euclid(joinedcells))
}

/// Labels the trees of `grid`. Prefer [`SpatialGrid::tree_labels`], which caches
/// the result.
pub fn compute(grid: &SpatialGrid) -> TreeLabels {
    let params = grid.params();
    let joinedcells = i64::from(params.joinedcells.max(1));

    let mut members: BTreeMap<CellKey, Vec<CellKey>> = BTreeMap::new();
    for (&key, cell) in grid.cells() {
        if cell.thickness() > params.slicedepth {
            members
                .entry(coarse_key(key, joinedcells))
                .or_default()
                .push(key);
        }
    }

    let mut coarse_labels: HashMap<CellKey, usize> = HashMap::with_capacity(members.len());
    let mut stack = Vec::new();
    let mut tree_count = 0;
    for &seed in members.keys() {
        if coarse_labels.contains_key(&seed) {
            continue;
        }
        coarse_labels.insert(seed, tree_count);
        stack.push(seed);
        while let Some(key) = stack.pop() {
            for n in neighbours(key) {
                if members.contains_key(&n) && !coarse_labels.contains_key(&n) {
                    coarse_labels.insert(n, tree_count);
                    stack.push(n);
                }
            }
        }
        tree_count += 1;
    }

    let mut labels = HashMap::new();
    for (coarse, cells) in &members {
        let id = coarse_labels[coarse];
        labels.extend(cells.iter().map(|&key| (key, id)));
    }
    log::debug!(
        "labelled {} cells in {} coarse cells as {} trees",
        labels.len(),
        members.len(),
        tree_count
    );

    TreeLabels {
        point_count: grid.len(),
        labels,
        tree_count,
    }
}
