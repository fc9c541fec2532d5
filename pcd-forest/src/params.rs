use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("grounddepth must not be negative, got {0}")]
    NegativeGroundDepth(f64),
    #[error("joinedcells must be at least 1")]
    NoJoinedCells,
    #[error("UTM zone must be in 1..=60, got {0}")]
    InvalidZone(u8),
}

/// Tunables of the forest analysis, fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Edge length of a grid cell in meters.
    pub cellsize: f64,
    /// Points less than this far above their cell's ground are ground.
    pub grounddepth: f64,
    /// Minimum canopy thickness for a cell to belong to a tree.
    pub slicedepth: f64,
    /// Cells per side of the coarse grid used to join tree crowns.
    pub joinedcells: u32,
    pub utm_zone: u8,
    pub southern: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            cellsize: 0.1,
            grounddepth: 0.2,
            slicedepth: 0.6,
            joinedcells: 3,
            utm_zone: 55,
            southern: true,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, value) in [("cellsize", self.cellsize), ("slicedepth", self.slicedepth)] {
            if !(value > 0.0) {
                return Err(ParamsError::NotPositive { name, value });
            }
        }
        if !(self.grounddepth >= 0.0) {
            return Err(ParamsError::NegativeGroundDepth(self.grounddepth));
        }
        if self.joinedcells == 0 {
            return Err(ParamsError::NoJoinedCells);
        }
        if !(1..=60).contains(&self.utm_zone) {
            return Err(ParamsError::InvalidZone(self.utm_zone));
        }
        Ok(())
    }

    /// Ground differences beyond this between neighbouring cells count as steep.
    pub fn steep_slope(&self) -> f64 {
        2.0 * self.cellsize
    }

    /// Trees no taller than this are not reported.
    pub fn min_tree_height(&self) -> f64 {
        1.5 * self.slicedepth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ForestParams::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_degenerate_values() {
        let base = ForestParams::default();
        let cases = [
            (
                ForestParams { cellsize: 0.0, ..base },
                ParamsError::NotPositive { name: "cellsize", value: 0.0 },
            ),
            (
                ForestParams { slicedepth: -1.0, ..base },
                ParamsError::NotPositive { name: "slicedepth", value: -1.0 },
            ),
            (
                ForestParams { grounddepth: -0.1, ..base },
                ParamsError::NegativeGroundDepth(-0.1),
            ),
            (ForestParams { joinedcells: 0, ..base }, ParamsError::NoJoinedCells),
            (ForestParams { utm_zone: 61, ..base }, ParamsError::InvalidZone(61)),
        ];
        for (params, expected) in cases {
            assert_eq!(params.validate(), Err(expected));
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let params: ForestParams =
            serde_json::from_str(r#"{ "cellsize": 0.25, "southern": false }"#).unwrap();
        assert_eq!(params.cellsize, 0.25);
        assert!(!params.southern);
        assert_eq!(params.joinedcells, 3);
        assert_eq!(params.utm_zone, 55);
    }
}
