use coordinate_transformer::{UtmCoordinate, UtmError};
use serde::Serialize;
use thiserror::Error;

use crate::grid::{CellKey, SpatialGrid};

#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("none of the tree's cells is occupied")]
    NoCells,
    #[error(transparent)]
    Location(#[from] UtmError),
}

/// Reportable attributes of one tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeRecord {
    pub id: usize,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    pub utm_easting: f64,
    pub utm_northing: f64,
    pub utm_zone: u8,
    pub southern: bool,
    /// Tallest canopy above ground over the tree's cells.
    pub height: f64,
    /// Footprint in square meters.
    pub area: f64,
    pub base_altitude: f64,
    /// Points in the tree's cells, ground included.
    pub point_count: u64,
    /// Non-ground points that contributed to the channel means.
    pub canopy_point_count: u64,
    /// Mean of every channel, `None` where no cell has non-ground points.
    pub channel_means: Vec<Option<f64>>,
    pub cell_count: usize,
}

/// Aggregates the cells of one tree. Keys that are not occupied cells of `grid`
/// are left out.
pub fn tree_data(
    grid: &SpatialGrid,
    id: usize,
    keys: &[CellKey],
) -> Result<TreeRecord, TreeError> {
    let params = grid.params();
    let origin = grid.origin();

    let mut cell_count = 0;
    let mut sum_cx = 0.0;
    let mut sum_cy = 0.0;
    let mut height = f64::NEG_INFINITY;
    let mut ground_sum = 0.0;
    let mut point_count = 0;
    let mut canopy_point_count = 0;
    let channels = grid.channel_names().len();
    let mut channel_totals = vec![0.0; channels];
    let mut channel_cells = vec![0usize; channels];

    for cell_key in keys {
        let Some(cell) = grid.cell(cell_key) else {
            continue;
        };
        cell_count += 1;
        sum_cx += cell_key.0 as f64;
        sum_cy += cell_key.1 as f64;
        height = height.max(cell.thickness());
        ground_sum += cell.ground;
        point_count += cell.density;
        canopy_point_count += cell.filtered_density;
        if cell.filtered_density > 0 {
            let filtered = cell.filtered_density as f64;
            for (i, sum) in cell.channel_sums.iter().take(channels).enumerate() {
                channel_totals[i] += sum / filtered;
                channel_cells[i] += 1;
            }
        }
    }

    if cell_count == 0 {
        return Err(TreeError::NoCells);
    }
    let n = cell_count as f64;

    let utm_easting = origin.easting + params.cellsize * sum_cx / n;
    let utm_northing = origin.northing + params.cellsize * sum_cy / n;
    let (latitude, longitude) =
        UtmCoordinate::new(utm_easting, utm_northing, params.utm_zone, params.southern)?
            .to_latlon_degrees();

    let channel_means = channel_totals
        .iter()
        .zip(&channel_cells)
        .map(|(total, &cells)| (cells > 0).then(|| total / cells as f64))
        .collect();

    Ok(TreeRecord {
        id,
        latitude,
        longitude,
        utm_easting,
        utm_northing,
        utm_zone: params.utm_zone,
        southern: params.southern,
        height,
        area: n * params.cellsize * params.cellsize,
        base_altitude: origin.altitude + ground_sum / n,
        point_count,
        canopy_point_count,
        channel_means,
        cell_count,
    })
}

/// Records of every tree taller than `1.5 × slicedepth`, ordered by id.
///
/// A tree that cannot be aggregated, such as one located outside the UTM zone's
/// range, is logged and left out.
pub fn all_trees(grid: &SpatialGrid) -> Vec<TreeRecord> {
    let min_height = grid.params().min_tree_height();
    let mut records = Vec::new();
    for (id, keys) in grid.tree_labels().trees().iter().enumerate() {
        match tree_data(grid, id, keys) {
            Ok(record) if record.height > min_height => records.push(record),
            Ok(_) => {}
            Err(e) => log::warn!("skipping tree {}: {}", id, e),
        }
    }
    log::info!(
        "{} of {} labelled trees are taller than {} m",
        records.len(),
        grid.tree_labels().tree_count(),
        min_height
    );
    records
}

#[cfg(test)]
mod tests {
    use pcd_core::{GeoReference, Point};

    use super::*;
    use crate::{smooth, testing::*, ForestParams};

    #[test]
    fn one_tree_on_flat_ground() {
        let grid = analyse(scenario_a());
        let trees = all_trees(&grid);
        assert_eq!(trees.len(), 1);
        let tree = &trees[0];
        assert!((tree.height - 2.0).abs() <= 0.05, "height {}", tree.height);
        assert!(tree.point_count >= 300, "{} points", tree.point_count);
        assert!(tree.point_count <= 700, "{} points", tree.point_count);
        assert!(tree.canopy_point_count <= 300);
        assert!(tree.canopy_point_count > 0);
        assert!((tree.utm_easting - 2.5).abs() < 0.2);
        assert!((tree.utm_northing - 2.5).abs() < 0.2);
    }

    #[test]
    fn separate_trees_are_separate_records() {
        let grid = analyse(scenario_b());
        let trees = all_trees(&grid);
        assert_eq!(trees.len(), 2);
        let mut eastings: Vec<f64> = trees.iter().map(|t| t.utm_easting).collect();
        eastings.sort_by(f64::total_cmp);
        assert!((eastings[0] - 2.5).abs() < 0.2);
        assert!((eastings[1] - 12.5).abs() < 0.2);
    }

    #[test]
    fn touching_crowns_merge() {
        let single = all_trees(&analyse(scenario_a()));
        let merged = all_trees(&analyse(scenario_c()));
        assert_eq!(merged.len(), 1);
        let ratio = merged[0].area / single[0].area;
        assert!((1.7..=2.3).contains(&ratio), "area ratio {}", ratio);
    }

    #[test]
    fn area_is_cell_count_times_cell_area() {
        for points in [scenario_a(), scenario_b(), scenario_c()] {
            let grid = analyse(points);
            let cellsize = grid.params().cellsize;
            for tree in all_trees(&grid) {
                assert_eq!(tree.area, tree.cell_count as f64 * cellsize * cellsize);
            }
        }
    }

    #[test]
    fn labels_are_memoized_and_pure() {
        let grid = analyse(scenario_b());
        let first = grid.tree_labels() as *const _;
        let again = grid.tree_labels() as *const _;
        assert_eq!(first, again);
        assert_eq!(&crate::labeling::compute(&grid), grid.tree_labels());
        assert_eq!(all_trees(&grid), all_trees(&grid));
    }

    #[test]
    fn canopy_color_means_exclude_ground() {
        let grid = analyse(scenario_a());
        let tree = &all_trees(&grid)[0];
        let expected: Vec<Option<f64>> = CANOPY_RGB.iter().map(|c| Some(*c)).collect();
        assert_eq!(tree.channel_means, expected);
    }

    #[test]
    fn cells_without_canopy_points_have_no_mean() {
        let params = ForestParams {
            cellsize: 1.0,
            joinedcells: 1,
            ..ForestParams::default()
        };
        let mut grid = SpatialGrid::new(params)
            .with_channels(vec!["red".into()])
            .with_origin(GeoReference::new(500_000.0, 6_000_000.0, 100.0));
        let points = [
            Point::new(0.5, 0.5, 0.0, vec![9.0]),
            Point::new(0.5, 0.5, 4.0, vec![9.0]),
        ];
        for p in &points {
            grid.ingest_spatial(p);
        }
        let tree = tree_data(&grid, 0, &[(0, 0)]).unwrap();
        assert_eq!(tree.channel_means, vec![None]);
        assert_eq!(tree.canopy_point_count, 0);
        assert_eq!(tree.base_altitude, 100.0);
        assert_eq!((tree.utm_easting, tree.utm_northing), (500_000.0, 6_000_000.0));
        assert!((tree.longitude - 147.0).abs() < 1e-9);
        assert!(tree.latitude < -35.0 && tree.latitude > -37.0);

        for p in &points {
            grid.ingest_color(p);
        }
        let tree = tree_data(&grid, 0, &[(0, 0)]).unwrap();
        assert_eq!(tree.channel_means, vec![Some(9.0)]);
        assert_eq!(tree.point_count, 2);
    }

    #[test]
    fn trees_outside_the_zone_are_skipped() {
        let mut points = scenario_a();
        points.extend(rectangle(2000, (-10.0, 0.0), 5.0, 5.0, 0.0));
        points.extend(disc(300, (-7.5, 2.5), 1.0, 2.0));
        let grid = analyse(points);
        assert_eq!(grid.tree_labels().tree_count(), 2);

        let trees = all_trees(&grid);
        assert_eq!(trees.len(), 1);
        assert!((trees[0].utm_easting - 2.5).abs() < 0.2);
    }

    #[test]
    fn unoccupied_keys_are_left_out() {
        let mut grid = SpatialGrid::new(ForestParams {
            cellsize: 1.0,
            joinedcells: 1,
            ..ForestParams::default()
        })
        .with_origin(GeoReference::new(500_000.0, 6_000_000.0, 0.0));
        grid.ingest_spatial(&Point::xyz(0.5, 0.5, 1.0));
        grid.ingest_spatial(&Point::xyz(0.5, 0.5, 3.0));

        let tree = tree_data(&grid, 0, &[(0, 0), (40, 40)]).unwrap();
        assert_eq!(tree.cell_count, 1);
        assert_eq!(tree.area, 1.0);
        assert_eq!(tree.base_altitude, 1.0);
        assert_eq!((tree.utm_easting, tree.utm_northing), (500_000.0, 6_000_000.0));
        assert_eq!(tree_data(&grid, 0, &[(40, 40)]), Err(TreeError::NoCells));
    }

    #[test]
    fn short_trees_are_filtered() {
        let mut grid = SpatialGrid::new(ForestParams {
            cellsize: 1.0,
            joinedcells: 1,
            ..ForestParams::default()
        });
        for (x, z) in [(0.5, 0.0), (0.5, 0.85), (5.5, 0.0), (5.5, 0.95)] {
            grid.ingest_spatial(&Point::xyz(x, 0.5, z));
        }
        smooth(&mut grid);
        let trees = all_trees(&grid);
        assert_eq!(grid.tree_labels().tree_count(), 2);
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].height, 0.95);
    }
}
