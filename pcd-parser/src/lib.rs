pub mod error;
pub mod reader;

pub use error::ParseError;
pub use reader::ply::{discover_parts, read, PlyFileReader, PlyHeader, PlyPointReader};
pub use reader::{PointIterator, PointReader};
