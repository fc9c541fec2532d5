pub mod encoding;
pub mod georef;
pub mod point;
pub mod schema;
