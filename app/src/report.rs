use std::path::Path;

use pcd_forest::TreeRecord;

use crate::error::AppError;

const FIXED_COLUMNS: [&str; 10] = [
    "latitude",
    "longitude",
    "UTM_easting",
    "UTM_northing",
    "UTM_zone",
    "height",
    "area",
    "base_altitude",
    "point_count",
    "canopy_point_count",
];

fn row(tree: &TreeRecord) -> Vec<String> {
    let mut row = vec![
        format!("{:.7}", tree.latitude),
        format!("{:.7}", tree.longitude),
        format!("{:.1}", tree.utm_easting),
        format!("{:.1}", tree.utm_northing),
        tree.utm_zone.to_string(),
        format!("{:.2}", tree.height),
        format!("{:.2}", tree.area),
        format!("{:.2}", tree.base_altitude),
        tree.point_count.to_string(),
        tree.canopy_point_count.to_string(),
    ];
    row.extend(
        tree.channel_means
            .iter()
            .map(|mean| mean.map(|m| format!("{:.1}", m)).unwrap_or_default()),
    );
    row
}

/// Writes one CSV row per tree, followed by a column per channel mean.
pub fn write_report(path: &Path, trees: &[TreeRecord], channels: &[String]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header: Vec<&str> = FIXED_COLUMNS.to_vec();
    header.extend(channels.iter().map(String::as_str));
    writer.write_record(&header)?;
    for tree in trees {
        writer.write_record(row(tree))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> TreeRecord {
        TreeRecord {
            id: 0,
            latitude: -35.123456789,
            longitude: 149.987654321,
            utm_easting: 693002.44,
            utm_northing: 6090002.46,
            utm_zone: 55,
            southern: true,
            height: 2.0,
            area: 2.18,
            base_altitude: 612.3456,
            point_count: 484,
            canopy_point_count: 299,
            channel_means: vec![Some(20.0), None],
            cell_count: 218,
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site_analysis.csv");
        write_report(&path, &[tree()], &["red".to_string(), "green".to_string()]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "latitude,longitude,UTM_easting,UTM_northing,UTM_zone,height,area,\
             base_altitude,point_count,canopy_point_count,red,green"
        );
        assert_eq!(
            lines[1],
            "-35.1234568,149.9876543,693002.4,6090002.5,55,2.00,2.18,612.35,484,299,20.0,"
        );
        assert_eq!(lines.len(), 2);
    }
}
