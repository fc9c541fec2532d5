mod georef;
mod header;
mod record;

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

use pcd_core::{Encoding, GeoReference, Point, Schema};

pub use georef::{apply_comment, discover as discover_georef, sidecar_path};
pub use header::PlyHeader;
use record::RecordDecoder;

use super::{PointIterator, PointReader};
use crate::error::ParseError;

const PART_ONE_SUFFIX: &str = "_point_cloud_part_1.ply";

fn check_input(path: &Path) -> Result<(), ParseError> {
    if !path.is_file() {
        return Err(ParseError::FileNotFound(path.to_path_buf()));
    }
    let is_ply = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ply"));
    if !is_ply {
        return Err(ParseError::UnsupportedFormat(format!(
            "{} is not a .ply file",
            path.display()
        )));
    }
    Ok(())
}

/// Lists the files making up the cloud at `path`.
///
/// A file named `<stem>_point_cloud_part_1.ply` is followed by every contiguous
/// `<stem>_point_cloud_part_<k>.ply` sibling. Any other path is a single part.
pub fn discover_parts(path: &Path) -> Vec<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(stem) = name.strip_suffix(PART_ONE_SUFFIX) else {
        return vec![path.to_path_buf()];
    };

    let mut parts = vec![path.to_path_buf()];
    for k in 2.. {
        let part = path.with_file_name(format!("{}_point_cloud_part_{}.ply", stem, k));
        if !part.is_file() {
            break;
        }
        parts.push(part);
    }
    parts
}

/// Streams the vertices of one PLY file.
pub struct PlyFileReader {
    path: PathBuf,
    header: PlyHeader,
    georef: GeoReference,
    decoder: RecordDecoder,
    source: BufReader<File>,
    index: usize,
    record: Vec<u8>,
    line: String,
}

impl PlyFileReader {
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        check_input(path)?;
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut source = BufReader::new(file);
        let header = PlyHeader::parse(&mut source)?;
        let Some(color) = header.schema.color() else {
            return Err(ParseError::UnsupportedFormat(format!(
                "{} has no red/green/blue or diffuse_red/diffuse_green/diffuse_blue properties",
                path.display()
            )));
        };
        log::debug!(
            "color channels of {}: {}",
            path.display(),
            color.map(|p| p.name.as_str()).join(", ")
        );

        if let Some(needed) = header.vertex_data_size() {
            let available = file_len.saturating_sub(header.length as u64);
            if available < needed {
                return Err(ParseError::MalformedHeader(format!(
                    "{} vertices of {} bytes need {} bytes but {} follow the header",
                    header.vertex_count,
                    header.schema.record_size(),
                    needed,
                    available
                )));
            }
        }

        let georef = georef::discover(path, &header.comments)?;
        let decoder = RecordDecoder::new(&header.schema, header.encoding);
        log::debug!(
            "opened {} ({} vertices, {})",
            path.display(),
            header.vertex_count,
            header.encoding.ply_name()
        );

        Ok(Self {
            path: path.to_path_buf(),
            record: vec![0; decoder.record_size()],
            header,
            georef,
            decoder,
            source,
            index: 0,
            line: String::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &PlyHeader {
        &self.header
    }

    pub fn georef(&self) -> GeoReference {
        self.georef
    }

    fn truncated(&self) -> ParseError {
        ParseError::InvalidRecord {
            index: self.index,
            reason: format!("{} ends before the declared vertex count", self.path.display()),
        }
    }

    fn read_ascii(&mut self) -> Result<Point, ParseError> {
        loop {
            self.line.clear();
            if self.source.read_line(&mut self.line)? == 0 {
                return Err(self.truncated());
            }
            if !self.line.trim().is_empty() {
                break;
            }
        }
        self.decoder
            .decode_ascii(&self.line)
            .map_err(|reason| ParseError::InvalidRecord {
                index: self.index,
                reason,
            })
    }

    fn read_binary(&mut self) -> Result<Point, ParseError> {
        match self.source.read_exact(&mut self.record) {
            Ok(()) => Ok(self.decoder.decode_binary(&self.record)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(self.truncated()),
            Err(e) => Err(e.into()),
        }
    }
}

impl PointReader for PlyFileReader {
    fn next_point(&mut self) -> Result<Option<Point>, ParseError> {
        if self.index >= self.header.vertex_count {
            return Ok(None);
        }
        let point = match self.header.encoding {
            Encoding::Ascii => self.read_ascii()?,
            _ => self.read_binary()?,
        };
        self.index += 1;
        Ok(Some(point))
    }
}

/// Streams a possibly multi-part PLY cloud as one sequence of points.
///
/// Points of later parts are moved into the frame of the first part by the
/// difference between their georeference offsets, so the stream is consistent
/// in XY and Z without knowing the absolute position.
pub struct PlyPointReader {
    pub files: Vec<PathBuf>,
    pub current_file_index: usize,
    pub current_reader: Option<PlyFileReader>,
    current_delta: (f64, f64, f64),
    schema: Schema,
    georef: GeoReference,
}

impl PlyPointReader {
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        check_input(path)?;
        let files = discover_parts(path);
        if files.len() > 1 {
            log::info!("reading {} parts starting at {}", files.len(), path.display());
        }
        let first = PlyFileReader::open(&files[0])?;
        Ok(Self {
            schema: first.header().schema.clone(),
            georef: first.georef(),
            files,
            current_file_index: 1,
            current_reader: Some(first),
            current_delta: (0.0, 0.0, 0.0),
        })
    }

    /// The vertex schema shared by every part.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Georeference of the first part, which all points are relative to.
    pub fn georef(&self) -> GeoReference {
        self.georef
    }

    pub fn points(self) -> PointIterator<Self> {
        PointIterator::new(self)
    }

    fn open_next_file(&mut self) -> Result<(), ParseError> {
        if self.current_file_index < self.files.len() {
            let file = &self.files[self.current_file_index];
            let reader = PlyFileReader::open(file)?;
            if reader.header().schema != self.schema {
                return Err(ParseError::UnsupportedFormat(format!(
                    "{} declares a different vertex schema than the first part",
                    file.display()
                )));
            }
            self.current_delta = reader.georef().delta_from(&self.georef);
            log::debug!(
                "part {} shifted by {:?}",
                file.display(),
                self.current_delta
            );
            self.current_reader = Some(reader);
            self.current_file_index += 1;
        } else {
            self.current_reader = None;
        }
        Ok(())
    }
}

impl PointReader for PlyPointReader {
    fn next_point(&mut self) -> Result<Option<Point>, ParseError> {
        loop {
            let Some(reader) = self.current_reader.as_mut() else {
                self.open_next_file()?;
                if self.current_reader.is_none() {
                    return Ok(None);
                }
                continue;
            };

            match reader.next_point()? {
                Some(mut p) => {
                    let (dx, dy, dz) = self.current_delta;
                    p.translate(dx, dy, dz);
                    return Ok(Some(p));
                }
                None => {
                    self.current_reader = None;
                    if self.current_file_index >= self.files.len() {
                        return Ok(None);
                    }
                }
            }
        }
    }
}

/// Opens `path` (and its sibling parts) as a lazy point sequence.
pub fn read(path: &Path) -> Result<PointIterator<PlyPointReader>, ParseError> {
    Ok(PlyPointReader::open(path)?.points())
}
