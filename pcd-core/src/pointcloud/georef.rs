/// UTM origin of a file's local coordinate frame.
///
/// Point clouds keep a large XY offset out of their vertices because 32-bit floats
/// cannot hold full UTM coordinates at centimeter precision. Absolute position is
/// `offset + vertex`. Zone and hemisphere are optional because most exporters only
/// record the offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoReference {
    pub easting: f64,
    pub northing: f64,
    pub altitude: f64,
    pub zone: Option<u8>,
    pub southern: Option<bool>,
}

impl GeoReference {
    pub fn new(easting: f64, northing: f64, altitude: f64) -> Self {
        Self {
            easting,
            northing,
            altitude,
            zone: None,
            southern: None,
        }
    }

    pub fn with_zone(mut self, zone: u8, southern: bool) -> Self {
        self.zone = Some(zone);
        self.southern = Some(southern);
        self
    }

    /// Offset to add to vertices expressed relative to `self` so that they become
    /// relative to `base`.
    pub fn delta_from(&self, base: &GeoReference) -> (f64, f64, f64) {
        (
            self.easting - base.easting,
            self.northing - base.northing,
            self.altitude - base.altitude,
        )
    }

    pub fn has_offset(&self) -> bool {
        self.easting != 0.0 || self.northing != 0.0 || self.altitude != 0.0
    }
}
