use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use pcd_core::{Encoding, Point, COLOR_CHANNELS};
use pcd_exporter::PlyWriter;
use pcd_forest::{all_trees, smooth, ForestParams, SpatialGrid, TreeRecord};
use pcd_parser::{ParseError, PlyPointReader};

use crate::{error::AppError, report::write_report};

/// Per-tree clouds are small, so their writers spill early.
const TREE_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub savetrees: Option<PathBuf>,
    pub params: ForestParams,
    pub encoding: Encoding,
}

/// Where the reduced cloud of `input` goes.
///
/// An input that already is a sparse cloud is analysed in place. The suffix of the
/// first part of a multi-part cloud is dropped from the name.
pub fn sparse_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.ends_with("_sparse") {
        return input.to_path_buf();
    }
    let stem = stem.replace("_point_cloud_part_1", "").replace("_part_1", "");
    out_dir.join(format!("{}_sparse.ply", stem))
}

/// `<stem>_analysis.csv` beside the sparse cloud.
pub fn report_path(sparse: &Path) -> PathBuf {
    let stem = sparse
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_suffix("_sparse").unwrap_or(&stem);
    sparse.with_file_name(format!("{}_analysis.csv", stem))
}

fn for_each_point<F>(reader: PlyPointReader, mut f: F) -> Result<u64, AppError>
where
    F: FnMut(Point) -> Result<(), AppError>,
{
    let mut count = 0;
    for point in reader.points() {
        f(point?)?;
        count += 1;
    }
    Ok(count)
}

/// Runs the spatial pass over `path` and smooths the result.
fn spatial_grid(path: &Path, params: &ForestParams) -> Result<SpatialGrid, AppError> {
    log::info!("start reading {}...", path.display());
    let start = Instant::now();
    let reader = PlyPointReader::open(path)?;
    let mut grid = SpatialGrid::new(*params)
        .with_origin(reader.georef())
        .with_channels(COLOR_CHANNELS.map(String::from).to_vec());
    for_each_point(reader, |p| {
        grid.ingest_spatial(&p);
        Ok(())
    })?;
    log::info!(
        "read {} points into {} cells in {:?}",
        grid.len(),
        grid.cell_count(),
        start.elapsed()
    );

    let start = Instant::now();
    let passes = smooth(&mut grid);
    log::info!("smoothed ground in {} passes ({:?})", passes, start.elapsed());
    Ok(grid)
}

/// Streams `input` again, keeping canopy points and the lowest point of each cell.
fn write_sparse(
    input: &Path,
    sparse: &Path,
    grid: &SpatialGrid,
    options: &RunOptions,
) -> Result<u64, AppError> {
    log::info!("start writing {}...", sparse.display());
    let start = Instant::now();
    let reader = PlyPointReader::open(input)?;
    let georef = reader
        .georef()
        .with_zone(options.params.utm_zone, options.params.southern);
    let mut writer = PlyWriter::create(sparse, reader.schema().clone(), options.encoding, georef);
    let read = for_each_point(reader, |p| {
        if !grid.is_ground(&p) || grid.is_lowest(&p) {
            writer.append(&p)?;
        }
        Ok(())
    })?;
    let kept = writer.len() as u64;
    writer.finish()?;
    log::info!(
        "kept {} of {} points in {:?}",
        kept,
        read,
        start.elapsed()
    );
    Ok(kept)
}

fn ingest_colors(path: &Path, grid: &mut SpatialGrid) -> Result<(), AppError> {
    log::info!("start reading colors from {}...", path.display());
    let start = Instant::now();
    for_each_point(PlyPointReader::open(path)?, |p| {
        grid.ingest_color(&p);
        Ok(())
    })?;
    log::info!("finish reading colors in {:?}", start.elapsed());
    Ok(())
}

/// Writes the non-ground points of every reported tree to `dir/tree_<id>.ply`.
fn save_trees(
    sparse: &Path,
    dir: &Path,
    grid: &SpatialGrid,
    trees: &[TreeRecord],
    encoding: Encoding,
) -> Result<(), AppError> {
    if dir.exists() && !dir.is_dir() {
        return Err(AppError::NotADirectory(dir.to_path_buf()));
    }
    fs::create_dir_all(dir)?;
    log::info!("start saving {} trees to {}...", trees.len(), dir.display());
    let start = Instant::now();

    let reader = PlyPointReader::open(sparse)?;
    let schema = reader.schema().clone();
    let georef = *grid.origin();
    let mut writers: HashMap<usize, PlyWriter> = trees
        .iter()
        .map(|tree| {
            let path = dir.join(format!("tree_{}.ply", tree.id));
            let writer =
                PlyWriter::with_buffer_size(path, schema.clone(), encoding, georef, TREE_BUFFER_SIZE);
            (tree.id, writer)
        })
        .collect();

    for_each_point(reader, |p| {
        if grid.is_ground(&p) {
            return Ok(());
        }
        let Some(id) = grid.tree_id(&p) else {
            return Ok(());
        };
        if let Some(writer) = writers.get_mut(&id) {
            writer.append(&p)?;
        }
        Ok(())
    })?;

    for (_, writer) in writers.drain() {
        writer.finish()?;
    }
    log::info!("finish saving trees in {:?}", start.elapsed());
    Ok(())
}

/// Reduces, analyses and reports one point cloud. Returns the reported trees.
pub fn run(options: &RunOptions) -> Result<Vec<TreeRecord>, AppError> {
    let params = &options.params;
    params.validate()?;
    if !options.input.is_file() {
        return Err(ParseError::FileNotFound(options.input.clone()).into());
    }
    if !options.out_dir.is_dir() {
        return Err(AppError::NotADirectory(options.out_dir.clone()));
    }

    let sparse = sparse_path(&options.input, &options.out_dir);
    let mut grid = if sparse.is_file() {
        log::info!("using existing sparse cloud {}", sparse.display());
        spatial_grid(&sparse, params)?
    } else {
        let grid = spatial_grid(&options.input, params)?;
        write_sparse(&options.input, &sparse, &grid, options)?;
        grid
    };
    ingest_colors(&sparse, &mut grid)?;

    log::info!("start analysis...");
    let start = Instant::now();
    let trees = all_trees(&grid);
    let report = report_path(&sparse);
    write_report(&report, &trees, grid.channel_names())?;
    log::info!(
        "wrote {} trees to {} in {:?}",
        trees.len(),
        report.display(),
        start.elapsed()
    );

    if let Some(dir) = &options.savetrees {
        save_trees(&sparse, dir, &grid, &trees, options.encoding)?;
    }
    Ok(trees)
}

#[cfg(test)]
mod tests {
    use pcd_core::{GeoReference, Property, ScalarKind, Schema};
    use pcd_exporter::write_ply;
    use pcd_parser::PointReader;

    use super::*;

    const CANOPY_RGB: [f64; 3] = [30.0, 140.0, 50.0];

    /// One point per 0.1 m cell over 5 m × 5 m of flat ground, plus a canopy
    /// point 2 m up in every cell within 1 m of the center.
    fn forest() -> (Vec<Point>, usize) {
        let mut points = Vec::new();
        let mut canopy = 0;
        for i in 0..50 {
            for j in 0..50 {
                let (x, y) = (i as f64 * 0.1 + 0.05, j as f64 * 0.1 + 0.05);
                points.push(Point::new(x, y, 0.0, vec![200.0, 190.0, 180.0]));
                if (x - 2.5).powi(2) + (y - 2.5).powi(2) <= 1.0 {
                    points.push(Point::new(x, y, 2.0, CANOPY_RGB.to_vec()));
                    canopy += 1;
                }
            }
        }
        (points, canopy)
    }

    fn count_points(path: &Path) -> usize {
        let mut reader = PlyPointReader::open(path).unwrap();
        let mut n = 0;
        while reader.next_point().unwrap().is_some() {
            n += 1;
        }
        n
    }

    #[test]
    fn names_follow_the_input() {
        let out = Path::new("out");
        assert_eq!(
            sparse_path(Path::new("in/site_point_cloud_part_1.ply"), out),
            Path::new("out/site_sparse.ply")
        );
        assert_eq!(
            sparse_path(Path::new("in/plot.ply"), out),
            Path::new("out/plot_sparse.ply")
        );
        assert_eq!(
            sparse_path(Path::new("in/plot_sparse.ply"), out),
            Path::new("in/plot_sparse.ply")
        );
        assert_eq!(
            report_path(Path::new("out/plot_sparse.ply")),
            Path::new("out/plot_analysis.csv")
        );
    }

    #[test]
    fn end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("site_point_cloud_part_1.ply");
        let (points, canopy) = forest();
        let total = points.len();
        write_ply(
            points,
            &input,
            Schema::xyz_rgb(),
            Encoding::BinaryLittleEndian,
            GeoReference::new(693000.0, 6090000.0, 600.0),
        )
        .unwrap();

        let trees_dir = dir.path().join("trees");
        let options = RunOptions {
            input: input.clone(),
            out_dir: dir.path().to_path_buf(),
            savetrees: Some(trees_dir.clone()),
            params: ForestParams::default(),
            encoding: Encoding::BinaryLittleEndian,
        };
        let trees = run(&options).unwrap();

        assert_eq!(trees.len(), 1);
        let tree = &trees[0];
        assert!((tree.height - 2.0).abs() < 1e-6);
        assert_eq!(tree.canopy_point_count as usize, canopy);
        assert_eq!(tree.point_count as usize, 2 * canopy);
        assert!((tree.utm_easting - 693002.45).abs() < 0.1);
        assert!((tree.base_altitude - 600.0).abs() < 1e-6);
        assert_eq!(
            tree.channel_means,
            CANOPY_RGB.iter().map(|c| Some(*c)).collect::<Vec<_>>()
        );

        let sparse = dir.path().join("site_sparse.ply");
        assert_eq!(count_points(&sparse), total);
        let sparse_georef = PlyPointReader::open(&sparse).unwrap().georef();
        assert_eq!(
            sparse_georef,
            GeoReference::new(693000.0, 6090000.0, 600.0).with_zone(55, true)
        );

        let report = fs::read_to_string(dir.path().join("site_analysis.csv")).unwrap();
        assert_eq!(report.lines().count(), 2);
        assert!(report.lines().next().unwrap().ends_with(",red,green,blue"));

        assert_eq!(count_points(&trees_dir.join("tree_0.ply")), canopy);

        // A second run reuses the sparse cloud and reports the same tree.
        let again = run(&options).unwrap();
        assert_eq!(again, trees);
    }

    #[test]
    fn diffuse_color_is_reported_as_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("meshlab.ply");
        let schema = Schema::new(vec![
            Property::new("x", ScalarKind::Float),
            Property::new("y", ScalarKind::Float),
            Property::new("z", ScalarKind::Float),
            Property::new("alpha", ScalarKind::UChar),
            Property::new("diffuse_red", ScalarKind::UChar),
            Property::new("diffuse_green", ScalarKind::UChar),
            Property::new("diffuse_blue", ScalarKind::UChar),
        ])
        .unwrap();
        let (points, _) = forest();
        let points = points.into_iter().map(|mut p| {
            p.channels.push(255.0);
            p
        });
        write_ply(
            points,
            &input,
            schema,
            Encoding::BinaryLittleEndian,
            GeoReference::new(693000.0, 6090000.0, 600.0),
        )
        .unwrap();

        let options = RunOptions {
            input,
            out_dir: dir.path().to_path_buf(),
            savetrees: None,
            params: ForestParams::default(),
            encoding: Encoding::Ascii,
        };
        let trees = run(&options).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(
            trees[0].channel_means,
            CANOPY_RGB.iter().map(|c| Some(*c)).collect::<Vec<_>>()
        );

        let report = fs::read_to_string(dir.path().join("meshlab_analysis.csv")).unwrap();
        let header = report.lines().next().unwrap();
        assert!(header.ends_with(",canopy_point_count,red,green,blue"));
        let sparse = PlyPointReader::open(&dir.path().join("meshlab_sparse.ply")).unwrap();
        assert_eq!(
            sparse.schema().channel_names(),
            vec!["diffuse_red", "diffuse_green", "diffuse_blue", "alpha"]
        );
    }

    #[test]
    fn rejects_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.ply");
        fs::write(&input, "ply\n").unwrap();
        let options = RunOptions {
            input,
            out_dir: dir.path().join("missing"),
            savetrees: None,
            params: ForestParams::default(),
            encoding: Encoding::Ascii,
        };
        assert!(matches!(run(&options), Err(AppError::NotADirectory(_))));

        let missing = RunOptions {
            input: dir.path().join("absent.ply"),
            ..options
        };
        assert!(matches!(
            run(&missing),
            Err(AppError::Parse(ParseError::FileNotFound(_)))
        ));
    }
}
