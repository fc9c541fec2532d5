pub mod pointcloud;

pub use pointcloud::encoding::Encoding;
pub use pointcloud::georef::GeoReference;
pub use pointcloud::point::Point;
pub use pointcloud::schema::{Property, ScalarKind, Schema, SchemaError, Slot, COLOR_CHANNELS};
