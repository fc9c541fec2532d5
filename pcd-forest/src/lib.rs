pub mod grid;
pub mod labeling;
pub mod params;
pub mod smoothing;
pub mod trees;

#[cfg(test)]
mod testing;

pub use grid::{Cell, CellKey, SpatialGrid};
pub use labeling::TreeLabels;
pub use params::{ForestParams, ParamsError};
pub use smoothing::{detect_problematic, smooth};
pub use trees::{all_trees, tree_data, TreeError, TreeRecord};
