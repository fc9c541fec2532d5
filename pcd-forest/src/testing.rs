//! Deterministic synthetic forests for tests.

use std::f64::consts::PI;

use pcd_core::Point;

use crate::{smooth, ForestParams, SpatialGrid};

const PLASTIC: f64 = 1.324_717_957_244_746;
const G1: f64 = 1.0 / PLASTIC;
const G2: f64 = 1.0 / (PLASTIC * PLASTIC);

pub const GROUND_RGB: [f64; 3] = [120.0, 100.0, 80.0];
pub const CANOPY_RGB: [f64; 3] = [20.0, 160.0, 40.0];

fn frac(v: f64) -> f64 {
    v - v.floor()
}

/// `n` evenly spread points over a `width × height` rectangle at height `z`.
pub fn rectangle(n: usize, origin: (f64, f64), width: f64, height: f64, z: f64) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let i = i as f64;
            Point::new(
                origin.0 + width * frac(0.5 + i * G1),
                origin.1 + height * frac(0.5 + i * G2),
                z,
                GROUND_RGB.to_vec(),
            )
        })
        .collect()
}

/// `n` evenly spread points over a disc at height `z`.
pub fn disc(n: usize, center: (f64, f64), radius: f64, z: f64) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let i = i as f64;
            let r = radius * frac(0.5 + i * G1).sqrt();
            let t = 2.0 * PI * frac(0.5 + i * G2);
            Point::new(
                center.0 + r * t.cos(),
                center.1 + r * t.sin(),
                z,
                CANOPY_RGB.to_vec(),
            )
        })
        .collect()
}

/// One 1 m crown 2 m above a 5 m square of flat ground.
pub fn scenario_a() -> Vec<Point> {
    let mut points = rectangle(2000, (0.0, 0.0), 5.0, 5.0, 0.0);
    points.extend(disc(300, (2.5, 2.5), 1.0, 2.0));
    points
}

/// Two crowns 10 m apart.
pub fn scenario_b() -> Vec<Point> {
    let mut points = rectangle(6000, (0.0, 0.0), 15.0, 5.0, 0.0);
    points.extend(disc(300, (2.5, 2.5), 1.0, 2.0));
    points.extend(disc(300, (12.5, 2.5), 1.0, 2.0));
    points
}

/// Two crowns whose edges are 0.1 m apart.
pub fn scenario_c() -> Vec<Point> {
    let mut points = rectangle(2000, (0.0, 0.0), 5.0, 5.0, 0.0);
    points.extend(disc(300, (1.45, 2.5), 1.0, 2.0));
    points.extend(disc(300, (3.55, 2.5), 1.0, 2.0));
    points
}

/// Spatial pass, smoothing and color pass with the default parameters.
pub fn analyse(points: Vec<Point>) -> SpatialGrid {
    let mut grid = SpatialGrid::new(ForestParams::default()).with_channels(vec![
        "red".to_string(),
        "green".to_string(),
        "blue".to_string(),
    ]);
    for p in &points {
        grid.ingest_spatial(p);
    }
    smooth(&mut grid);
    for p in &points {
        grid.ingest_color(p);
    }
    grid
}
