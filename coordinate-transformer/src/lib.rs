mod error;
mod utm;

pub use error::UtmError;
pub use utm::{
    arc_length_of_meridian, central_meridian, footpoint_latitude, latlon_to_utm,
    map_latlon_to_xy, map_xy_to_latlon, utm_to_latlon, UtmCoordinate, FALSE_EASTING,
    FALSE_NORTHING_SOUTH, SEMI_MAJOR_AXIS, SEMI_MINOR_AXIS, UTM_MAX_VALUE, UTM_SCALE_FACTOR,
};
