use std::{
    fs::{self, File},
    io::{self, BufWriter, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use pcd_core::{Encoding, GeoReference, Point, Schema};
use tempfile::SpooledTempFile;

use crate::record::RecordEncoder;

/// Encoded bytes kept in memory before the writer spills to a temporary file.
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

fn header(schema: &Schema, encoding: Encoding, georef: &GeoReference, count: usize) -> String {
    let mut text = format!("ply\nformat {} 1.0\n", encoding.ply_name());
    match (georef.zone, georef.southern) {
        (Some(zone), Some(southern)) => text.push_str(&format!(
            "comment UTM x y zone south {} {} {} {}\n",
            georef.easting, georef.northing, zone, southern as u8
        )),
        _ if georef.easting != 0.0 || georef.northing != 0.0 => text.push_str(&format!(
            "comment utm_offset {} {}\n",
            georef.easting, georef.northing
        )),
        _ => {}
    }
    if georef.altitude != 0.0 {
        text.push_str(&format!("comment utm_altitude {}\n", georef.altitude));
    }
    text.push_str(&format!("element vertex {}\n", count));
    for property in schema.properties() {
        text.push_str(&format!("property {} {}\n", property.kind, property.name));
    }
    text.push_str("end_header\n");
    text
}

/// Writes a PLY file whose vertex count is only known once the last point is in.
///
/// Encoded records go to a buffer that spills to disk past a size threshold. The
/// destination file is only created on [`finish`](Self::finish), or on drop if the
/// writer was never finished, and exactly once either way.
pub struct PlyWriter {
    path: PathBuf,
    schema: Schema,
    encoding: Encoding,
    georef: GeoReference,
    encoder: RecordEncoder,
    buffer: Option<SpooledTempFile>,
    count: usize,
}

impl PlyWriter {
    pub fn create(
        path: impl Into<PathBuf>,
        schema: Schema,
        encoding: Encoding,
        georef: GeoReference,
    ) -> Self {
        Self::with_buffer_size(path, schema, encoding, georef, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(
        path: impl Into<PathBuf>,
        schema: Schema,
        encoding: Encoding,
        georef: GeoReference,
        buffer_size: usize,
    ) -> Self {
        Self {
            path: path.into(),
            encoder: RecordEncoder::new(&schema, encoding),
            schema,
            encoding,
            georef,
            buffer: Some(SpooledTempFile::new(buffer_size)),
            count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn append(&mut self, point: &Point) -> io::Result<()> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "writer is already finalized",
            ));
        };
        buffer.write_all(self.encoder.encode(point))?;
        self.count += 1;
        Ok(())
    }

    /// Writes the header and the buffered records to the destination file.
    pub fn finish(mut self) -> io::Result<()> {
        self.finalize()
    }

    fn finalize(&mut self) -> io::Result<()> {
        let Some(mut buffer) = self.buffer.take() else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut out = BufWriter::new(File::create(&self.path)?);
        out.write_all(header(&self.schema, self.encoding, &self.georef, self.count).as_bytes())?;
        buffer.seek(SeekFrom::Start(0))?;
        io::copy(&mut buffer, &mut out)?;
        out.flush()?;
        log::debug!("wrote {} points to {}", self.count, self.path.display());
        Ok(())
    }
}

impl Drop for PlyWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            log::error!("failed to write {}: {}", self.path.display(), e);
        }
    }
}

/// Writes `points` to `path` in one go and returns how many were written.
pub fn write_ply<I>(
    points: I,
    path: &Path,
    schema: Schema,
    encoding: Encoding,
    georef: GeoReference,
) -> io::Result<usize>
where
    I: IntoIterator<Item = Point>,
{
    let mut writer = PlyWriter::create(path, schema, encoding, georef);
    for point in points {
        writer.append(&point)?;
    }
    let count = writer.len();
    writer.finish()?;
    Ok(count)
}
