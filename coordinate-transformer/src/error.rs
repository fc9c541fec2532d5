use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UtmError {
    #[error("UTM zone {0} is outside 1..=60")]
    InvalidZone(u8),
    #[error("UTM coordinate ({easting}, {northing}) is outside [0, 10000000)")]
    OutOfRange { easting: f64, northing: f64 },
}
