/// A single vertex of a point cloud.
///
/// Positions are in the local planar frame of the file (meters), i.e. relative to
/// the file's [`GeoReference`](super::georef::GeoReference). Every other property
/// is stored in `channels`, in the order of the schema's non-positional properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub channels: Vec<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64, channels: Vec<f64>) -> Self {
        Self { x, y, z, channels }
    }

    /// A point with no channels.
    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self::new(x, y, z, Vec::new())
    }

    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    pub fn channel(&self, index: usize) -> Option<f64> {
        self.channels.get(index).copied()
    }
}
