use std::{cell::OnceCell, collections::HashMap};

use pcd_core::{GeoReference, Point};

use crate::{labeling, params::ForestParams, TreeLabels};

/// Integer cell coordinates, `(⌊x / cellsize⌋, ⌊y / cellsize⌋)`.
pub type CellKey = (i64, i64);

const NEIGHBOUR_OFFSETS: [(i64, i64); 8] = [
    (1, 1),
    (1, 0),
    (1, -1),
    (0, 1),
    (0, -1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// The eight keys around `key`, whether occupied or not.
pub fn neighbours(key: CellKey) -> impl Iterator<Item = CellKey> {
    NEIGHBOUR_OFFSETS
        .iter()
        .map(move |(dx, dy)| (key.0 + dx, key.1 + dy))
}

/// Statistics of one occupied cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub density: u64,
    /// Lowest observed z, possibly raised by smoothing.
    pub ground: f64,
    /// Highest observed z.
    pub canopy: f64,
    /// Per-channel totals over the non-ground points of the color pass.
    pub channel_sums: Vec<f64>,
    /// Number of points summed into `channel_sums`.
    pub filtered_density: u64,
}

impl Cell {
    fn seed(z: f64) -> Self {
        Self {
            density: 1,
            ground: z,
            canopy: z,
            channel_sums: Vec::new(),
            filtered_density: 0,
        }
    }

    pub fn thickness(&self) -> f64 {
        self.canopy - self.ground
    }
}

/// Sparse grid of per-cell statistics over the XY plane.
///
/// Memory grows with the number of occupied cells, not with the number of points.
/// Tree labels are derived lazily and dropped whenever the grid changes.
#[derive(Debug)]
pub struct SpatialGrid {
    params: ForestParams,
    origin: GeoReference,
    channel_names: Vec<String>,
    cells: HashMap<CellKey, Cell>,
    point_count: u64,
    labels: OnceCell<TreeLabels>,
}

impl SpatialGrid {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            origin: GeoReference::default(),
            channel_names: Vec::new(),
            cells: HashMap::new(),
            point_count: 0,
            labels: OnceCell::new(),
        }
    }

    /// Georeference the point coordinates are relative to.
    pub fn with_origin(mut self, origin: GeoReference) -> Self {
        self.origin = origin;
        self
    }

    /// Names of the leading point channels summed by
    /// [`ingest_color`](Self::ingest_color). Channels past these are ignored.
    pub fn with_channels(mut self, names: Vec<String>) -> Self {
        self.channel_names = names;
        self
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn origin(&self) -> &GeoReference {
        &self.origin
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn key(&self, x: f64, y: f64) -> CellKey {
        (
            (x / self.params.cellsize).floor() as i64,
            (y / self.params.cellsize).floor() as i64,
        )
    }

    fn key_of(&self, point: &Point) -> CellKey {
        self.key(point.x, point.y)
    }

    pub fn cell(&self, key: &CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&CellKey, &Cell)> {
        self.cells.iter()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total number of points ingested by the spatial pass.
    pub fn len(&self) -> u64 {
        self.point_count
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    fn invalidate(&mut self) {
        self.labels.take();
    }

    /// Adds a point to the density, ground and canopy of its cell.
    pub fn ingest_spatial(&mut self, point: &Point) {
        let key = self.key_of(point);
        self.cells
            .entry(key)
            .and_modify(|cell| {
                cell.density += 1;
                cell.ground = cell.ground.min(point.z);
                cell.canopy = cell.canopy.max(point.z);
            })
            .or_insert_with(|| Cell::seed(point.z));
        self.point_count += 1;
        self.invalidate();
    }

    /// Adds the named channels of a non-ground point to its cell's sums.
    ///
    /// Must run after the ground layer is final. Points outside every occupied cell
    /// are ignored.
    pub fn ingest_color(&mut self, point: &Point) {
        if self.is_ground(point) {
            return;
        }
        let key = self.key_of(point);
        let channels = point.channels.len().min(self.channel_names.len());
        let Some(cell) = self.cells.get_mut(&key) else {
            return;
        };
        if cell.channel_sums.len() < channels {
            cell.channel_sums.resize(channels, 0.0);
        }
        for (sum, value) in cell.channel_sums.iter_mut().zip(&point.channels[..channels]) {
            *sum += value;
        }
        cell.filtered_density += 1;
    }

    /// Whether `point` lies within `grounddepth` above its cell's ground.
    pub fn is_ground(&self, point: &Point) -> bool {
        self.cells
            .get(&self.key_of(point))
            .is_some_and(|cell| point.z - cell.ground < self.params.grounddepth)
    }

    /// Whether `point` is exactly at its cell's ground height.
    pub fn is_lowest(&self, point: &Point) -> bool {
        self.cells
            .get(&self.key_of(point))
            .is_some_and(|cell| point.z == cell.ground)
    }

    /// Replaces the ground of an occupied cell, keeping `ground <= canopy`.
    pub(crate) fn set_ground(&mut self, key: &CellKey, ground: f64) {
        if let Some(cell) = self.cells.get_mut(key) {
            cell.ground = ground;
            cell.canopy = cell.canopy.max(ground);
        }
        self.invalidate();
    }

    /// Tree labels of the current grid, computed on first use.
    pub fn tree_labels(&self) -> &TreeLabels {
        let labels = self.labels.get_or_init(|| labeling::compute(self));
        debug_assert_eq!(labels.point_count(), self.point_count);
        labels
    }

    /// Tree the cell of `point` belongs to, if any.
    pub fn tree_id(&self, point: &Point) -> Option<usize> {
        self.tree_labels().get(&self.key_of(point))
    }
}
