use std::{
    fs,
    path::{Path, PathBuf},
};

use pcd_core::GeoReference;

use crate::error::ParseError;

/// `<stem>_ply_offset.xyz` next to `path`.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}_ply_offset.xyz", stem))
}

/// Resolves the georeference of a PLY file.
///
/// Header comments are applied first, then a sidecar offset file, when present,
/// overrides easting, northing and altitude. Zone and hemisphere only ever come from
/// comments.
pub fn discover(path: &Path, comments: &[String]) -> Result<GeoReference, ParseError> {
    let mut georef = GeoReference::default();
    for comment in comments {
        apply_comment(&mut georef, comment);
    }

    let sidecar = sidecar_path(path);
    if sidecar.is_file() {
        let text = fs::read_to_string(&sidecar)?;
        let values: Vec<f64> = text
            .lines()
            .next()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<_, _>>()
            .map_err(|_| ParseError::InvalidOffsetFile(sidecar.clone()))?;
        let [easting, northing, altitude] = values[..] else {
            return Err(ParseError::InvalidOffsetFile(sidecar));
        };
        log::debug!(
            "offset {} {} {} from {}",
            easting,
            northing,
            altitude,
            sidecar.display()
        );
        georef.easting = easting;
        georef.northing = northing;
        georef.altitude = altitude;
    }
    Ok(georef)
}

fn parse_flag(token: &str) -> Option<bool> {
    match token {
        "1" | "True" | "true" => Some(true),
        "0" | "False" | "false" => Some(false),
        _ => None,
    }
}

/// Applies one header comment to `georef`. Comments that do not describe a
/// georeference are ignored.
pub fn apply_comment(georef: &mut GeoReference, comment: &str) {
    let tokens: Vec<&str> = comment.split_whitespace().collect();
    let Some((&key, args)) = tokens.split_first() else {
        return;
    };
    let number = |i: usize| args.get(i).and_then(|t| t.parse::<f64>().ok());

    let applied = match key {
        "UTM" => {
            // `UTM x y zone south <e> <n> <zone> <south>`, the labels being optional.
            let values = &args[args.len().saturating_sub(4)..];
            match values {
                [e, n, zone, south] => match (
                    e.parse::<f64>(),
                    n.parse::<f64>(),
                    zone.parse::<u8>(),
                    parse_flag(south),
                ) {
                    (Ok(e), Ok(n), Ok(zone), Some(south)) => {
                        georef.easting = e;
                        georef.northing = n;
                        georef.zone = Some(zone);
                        georef.southern = Some(south);
                        true
                    }
                    _ => false,
                },
                _ => false,
            }
        }
        "utm_offset" => match (number(0), number(1)) {
            (Some(e), Some(n)) => {
                georef.easting = e;
                georef.northing = n;
                true
            }
            _ => false,
        },
        "utm_easting" => number(0).map(|e| georef.easting = e).is_some(),
        "utm_northing" => number(0).map(|n| georef.northing = n).is_some(),
        "utm_altitude" => number(0).map(|z| georef.altitude = z).is_some(),
        "utm_zone" => args
            .first()
            .and_then(|t| t.parse::<u8>().ok())
            .map(|z| georef.zone = Some(z))
            .is_some(),
        "utm_northern" => args
            .first()
            .and_then(|t| parse_flag(t))
            .map(|north| georef.southern = Some(!north))
            .is_some(),
        _ => return,
    };
    if !applied {
        log::warn!("ignoring malformed georeference comment '{}'", comment);
    }
}
