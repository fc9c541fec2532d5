//! Transverse Mercator projection on the WGS84 ellipsoid, and the UTM grid built on it.
//!
//! Series expansions follow the Gauss-Krüger form: the meridional arc and the
//! footpoint latitude are expanded in the third flattening `n`, and the projection
//! itself in powers of the longitude offset (forward) or of the unscaled easting
//! (inverse), both up to the 8th order. All angles are in radians.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::error::UtmError;

pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
pub const SEMI_MINOR_AXIS: f64 = 6_356_752.314;
pub const UTM_SCALE_FACTOR: f64 = 0.9996;
pub const FALSE_EASTING: f64 = 500_000.0;
pub const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;
/// Exclusive upper bound of valid eastings and northings.
pub const UTM_MAX_VALUE: f64 = 10_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmCoordinate {
    pub easting: f64,
    pub northing: f64,
    pub zone: u8,
    pub southern: bool,
}

impl UtmCoordinate {
    pub fn new(easting: f64, northing: f64, zone: u8, southern: bool) -> Result<Self, UtmError> {
        check_zone(zone)?;
        let valid = |v: f64| (0.0..UTM_MAX_VALUE).contains(&v);
        if !valid(easting) || !valid(northing) {
            return Err(UtmError::OutOfRange { easting, northing });
        }
        Ok(Self {
            easting,
            northing,
            zone,
            southern,
        })
    }

    /// Latitude and longitude in radians.
    pub fn to_latlon(&self) -> (f64, f64) {
        unscaled_to_latlon(self.easting, self.northing, self.zone, self.southern)
    }

    /// Latitude and longitude in decimal degrees.
    pub fn to_latlon_degrees(&self) -> (f64, f64) {
        let (lat, lon) = self.to_latlon();
        (lat.to_degrees(), lon.to_degrees())
    }
}

fn check_zone(zone: u8) -> Result<(), UtmError> {
    if (1..=60).contains(&zone) {
        Ok(())
    } else {
        Err(UtmError::InvalidZone(zone))
    }
}

/// Longitude of the central meridian of a UTM zone.
pub fn central_meridian(zone: u8) -> f64 {
    (zone as f64 * 6.0 - 183.0).to_radians()
}

fn third_flattening() -> f64 {
    (SEMI_MAJOR_AXIS - SEMI_MINOR_AXIS) / (SEMI_MAJOR_AXIS + SEMI_MINOR_AXIS)
}

fn second_eccentricity_squared() -> f64 {
    (SEMI_MAJOR_AXIS.powi(2) - SEMI_MINOR_AXIS.powi(2)) / SEMI_MINOR_AXIS.powi(2)
}

fn rectifying_radius(n: f64) -> f64 {
    (SEMI_MAJOR_AXIS + SEMI_MINOR_AXIS) / 2.0 * (1.0 + n.powi(2) / 4.0 + n.powi(4) / 64.0)
}

/// Ellipsoidal distance in meters from the equator to latitude `phi`.
pub fn arc_length_of_meridian(phi: f64) -> f64 {
    let n = third_flattening();
    let beta = -3.0 * n / 2.0 + 9.0 * n.powi(3) / 16.0 - 3.0 * n.powi(5) / 32.0;
    let gamma = 15.0 * n.powi(2) / 16.0 - 15.0 * n.powi(4) / 32.0;
    let delta = -35.0 * n.powi(3) / 48.0 + 105.0 * n.powi(5) / 256.0;
    let epsilon = 315.0 * n.powi(4) / 512.0;

    rectifying_radius(n)
        * (phi
            + beta * (2.0 * phi).sin()
            + gamma * (4.0 * phi).sin()
            + delta * (6.0 * phi).sin()
            + epsilon * (8.0 * phi).sin())
}

/// Latitude whose meridional arc equals the unscaled northing `y`.
pub fn footpoint_latitude(y: f64) -> f64 {
    let n = third_flattening();
    let y_ = y / rectifying_radius(n);
    let beta = 3.0 * n / 2.0 - 27.0 * n.powi(3) / 32.0 + 269.0 * n.powi(5) / 512.0;
    let gamma = 21.0 * n.powi(2) / 16.0 - 55.0 * n.powi(4) / 32.0;
    let delta = 151.0 * n.powi(3) / 96.0 - 417.0 * n.powi(5) / 128.0;
    let epsilon = 1097.0 * n.powi(4) / 512.0;

    y_ + beta * (2.0 * y_).sin()
        + gamma * (4.0 * y_).sin()
        + delta * (6.0 * y_).sin()
        + epsilon * (8.0 * y_).sin()
}

/// Projects latitude/longitude onto the Transverse Mercator plane around `meridian`.
///
/// The result is unscaled and has no false offsets, so it is not yet a UTM coordinate.
pub fn map_latlon_to_xy(phi: f64, lambda: f64, meridian: f64) -> (f64, f64) {
    let nu2 = second_eccentricity_squared() * phi.cos().powi(2);
    let big_n = SEMI_MAJOR_AXIS.powi(2) / (SEMI_MINOR_AXIS * (1.0 + nu2).sqrt());
    let t = phi.tan();
    let t2 = t * t;
    let c = phi.cos();
    let l = lambda - meridian;

    let l3 = 1.0 - t2 + nu2;
    let l4 = 5.0 - t2 + 9.0 * nu2 + 4.0 * nu2 * nu2;
    let l5 = 5.0 - 18.0 * t2 + t2 * t2 + 14.0 * nu2 - 58.0 * t2 * nu2;
    let l6 = 61.0 - 58.0 * t2 + t2 * t2 + 270.0 * nu2 - 330.0 * t2 * nu2;
    let l7 = 61.0 - 479.0 * t2 + 179.0 * t2 * t2 - t2.powi(3);
    let l8 = 1385.0 - 3111.0 * t2 + 543.0 * t2 * t2 - t2.powi(3);

    let x = big_n * c * l
        + big_n / 6.0 * c.powi(3) * l3 * l.powi(3)
        + big_n / 120.0 * c.powi(5) * l5 * l.powi(5)
        + big_n / 5040.0 * c.powi(7) * l7 * l.powi(7);

    let y = arc_length_of_meridian(phi)
        + t / 2.0 * big_n * c.powi(2) * l.powi(2)
        + t / 24.0 * big_n * c.powi(4) * l4 * l.powi(4)
        + t / 720.0 * big_n * c.powi(6) * l6 * l.powi(6)
        + t / 40320.0 * big_n * c.powi(8) * l8 * l.powi(8);

    (x, y)
}

/// Inverse of [`map_latlon_to_xy`]: unscaled plane coordinates to (latitude, longitude).
pub fn map_xy_to_latlon(x: f64, y: f64, meridian: f64) -> (f64, f64) {
    let phif = footpoint_latitude(y);
    let cf = phif.cos();
    let nuf2 = second_eccentricity_squared() * cf * cf;
    let nf = SEMI_MAJOR_AXIS.powi(2) / (SEMI_MINOR_AXIS * (1.0 + nuf2).sqrt());
    let tf = phif.tan();
    let tf2 = tf * tf;
    let tf4 = tf2 * tf2;

    let frac1 = 1.0 / (nf * cf);
    let frac2 = tf / (2.0 * nf.powi(2));
    let frac3 = 1.0 / (6.0 * nf.powi(3) * cf);
    let frac4 = tf / (24.0 * nf.powi(4));
    let frac5 = 1.0 / (120.0 * nf.powi(5) * cf);
    let frac6 = tf / (720.0 * nf.powi(6));
    let frac7 = 1.0 / (5040.0 * nf.powi(7) * cf);
    let frac8 = tf / (40320.0 * nf.powi(8));

    let poly2 = -1.0 - nuf2;
    let poly3 = -1.0 - 2.0 * tf2 - nuf2;
    let poly4 = 5.0 + 3.0 * tf2 + 6.0 * nuf2
        - 6.0 * tf2 * nuf2
        - 3.0 * nuf2 * nuf2
        - 9.0 * tf2 * nuf2 * nuf2;
    let poly5 = 5.0 + 28.0 * tf2 + 24.0 * tf4 + 6.0 * nuf2 + 8.0 * tf2 * nuf2;
    let poly6 = -61.0 - 90.0 * tf2 - 45.0 * tf4 - 107.0 * nuf2 + 162.0 * tf2 * nuf2;
    let poly7 = -61.0 - 662.0 * tf2 - 1320.0 * tf4 - 720.0 * tf4 * tf2;
    let poly8 = 1385.0 + 3633.0 * tf2 + 4095.0 * tf4 + 1575.0 * tf4 * tf2;

    let lat = phif
        + frac2 * poly2 * x.powi(2)
        + frac4 * poly4 * x.powi(4)
        + frac6 * poly6 * x.powi(6)
        + frac8 * poly8 * x.powi(8);
    let lon = meridian
        + frac1 * x
        + frac3 * poly3 * x.powi(3)
        + frac5 * poly5 * x.powi(5)
        + frac7 * poly7 * x.powi(7);

    (wrap(lat, FRAC_PI_2), wrap(lon, PI))
}

/// Folds an angle that overflowed `[-half_range, half_range]` back into it.
fn wrap(angle: f64, half_range: f64) -> f64 {
    if (-half_range..=half_range).contains(&angle) {
        angle
    } else {
        (angle + half_range).rem_euclid(2.0 * half_range) - half_range
    }
}

/// Latitude/longitude (radians) to a UTM coordinate in the given zone.
///
/// The hemisphere follows the sign of the projected northing.
pub fn latlon_to_utm(lat: f64, lon: f64, zone: u8) -> Result<UtmCoordinate, UtmError> {
    check_zone(zone)?;
    let (x, y) = map_latlon_to_xy(lat, lon, central_meridian(zone));
    let easting = x * UTM_SCALE_FACTOR + FALSE_EASTING;
    let mut northing = y * UTM_SCALE_FACTOR;
    let southern = northing < 0.0;
    if southern {
        northing += FALSE_NORTHING_SOUTH;
    }
    UtmCoordinate::new(easting, northing, zone, southern)
}

/// UTM coordinate to latitude/longitude in radians.
pub fn utm_to_latlon(
    easting: f64,
    northing: f64,
    zone: u8,
    southern: bool,
) -> Result<(f64, f64), UtmError> {
    Ok(UtmCoordinate::new(easting, northing, zone, southern)?.to_latlon())
}

fn unscaled_to_latlon(easting: f64, northing: f64, zone: u8, southern: bool) -> (f64, f64) {
    let x = (easting - FALSE_EASTING) / UTM_SCALE_FACTOR;
    let mut y = northing;
    if southern {
        y -= FALSE_NORTHING_SOUTH;
    }
    y /= UTM_SCALE_FACTOR;
    map_xy_to_latlon(x, y, central_meridian(zone))
}
