use std::io::BufRead;

use pcd_core::{Encoding, Property, ScalarKind, Schema};

use crate::error::ParseError;

const MAX_HEADER_BYTES: usize = 1 << 20;

/// Everything declared between `ply` and `end_header`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyHeader {
    pub encoding: Encoding,
    pub vertex_count: usize,
    pub schema: Schema,
    pub comments: Vec<String>,
    /// Byte length of the header including the `end_header` line.
    pub length: usize,
}

impl PlyHeader {
    /// Reads the header from `source`, leaving it positioned at the first vertex record.
    pub fn parse<R: BufRead>(source: &mut R) -> Result<Self, ParseError> {
        let mut length = 0;
        let mut buf = Vec::new();

        let mut next_line = |source: &mut R| -> Result<Option<String>, ParseError> {
            buf.clear();
            let n = source.read_until(b'\n', &mut buf)?;
            if n == 0 {
                return Ok(None);
            }
            length += n;
            if length > MAX_HEADER_BYTES {
                return Err(ParseError::MalformedHeader(
                    "no end_header found".to_string(),
                ));
            }
            let line = std::str::from_utf8(&buf)
                .map_err(|_| ParseError::MalformedHeader("header is not ASCII".to_string()))?;
            Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
        };

        match next_line(source)? {
            Some(magic) if magic.trim() == "ply" => {}
            _ => {
                return Err(ParseError::UnsupportedFormat(
                    "not a PLY file (missing 'ply' magic)".to_string(),
                ))
            }
        }

        let mut encoding = None;
        let mut vertex_count = None;
        let mut in_vertex = false;
        let mut properties = Vec::new();
        let mut comments = Vec::new();

        loop {
            let Some(line) = next_line(source)? else {
                return Err(ParseError::MalformedHeader(
                    "no end_header found".to_string(),
                ));
            };
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                None => continue,
                Some("end_header") => break,
                Some("comment") => {
                    let text = line.trim_start()["comment".len()..].trim();
                    comments.push(text.to_string());
                }
                Some("obj_info") => continue,
                Some("format") => {
                    let name = tokens.next().unwrap_or_default();
                    encoding = Some(Encoding::from_ply_name(name).ok_or_else(|| {
                        ParseError::UnsupportedFormat(format!("unknown encoding '{}'", name))
                    })?);
                }
                Some("element") => {
                    let (Some(name), Some(count)) = (tokens.next(), tokens.next()) else {
                        return Err(ParseError::MalformedHeader(format!(
                            "incomplete element line '{}'",
                            line
                        )));
                    };
                    if vertex_count.is_none() {
                        if name != "vertex" {
                            return Err(ParseError::UnsupportedFormat(format!(
                                "first element must be 'vertex', found '{}'",
                                name
                            )));
                        }
                        let count = count.parse::<usize>().map_err(|_| {
                            ParseError::MalformedHeader(format!("invalid vertex count '{}'", count))
                        })?;
                        vertex_count = Some(count);
                        in_vertex = true;
                    } else {
                        in_vertex = false;
                    }
                }
                Some("property") => {
                    if !in_vertex {
                        if vertex_count.is_none() {
                            return Err(ParseError::MalformedHeader(
                                "property declared before any element".to_string(),
                            ));
                        }
                        continue;
                    }
                    let (Some(kind), Some(name)) = (tokens.next(), tokens.next()) else {
                        return Err(ParseError::MalformedHeader(format!(
                            "incomplete property line '{}'",
                            line
                        )));
                    };
                    if kind == "list" {
                        return Err(ParseError::UnsupportedFormat(
                            "list properties on vertices are not supported".to_string(),
                        ));
                    }
                    let kind = ScalarKind::from_ply_name(kind).ok_or_else(|| {
                        ParseError::UnsupportedFormat(format!("unknown property type '{}'", kind))
                    })?;
                    properties.push(Property::new(name, kind));
                }
                Some(other) => {
                    return Err(ParseError::MalformedHeader(format!(
                        "unexpected header keyword '{}'",
                        other
                    )))
                }
            }
        }

        let encoding = encoding
            .ok_or_else(|| ParseError::MalformedHeader("missing format line".to_string()))?;
        let vertex_count = vertex_count
            .ok_or_else(|| ParseError::MalformedHeader("missing vertex element".to_string()))?;
        let schema =
            Schema::new(properties).map_err(|e| ParseError::UnsupportedFormat(e.to_string()))?;

        Ok(Self {
            encoding,
            vertex_count,
            schema,
            comments,
            length,
        })
    }

    /// Bytes the vertex element occupies in a binary file.
    pub fn vertex_data_size(&self) -> Option<u64> {
        self.encoding
            .is_binary()
            .then(|| self.vertex_count as u64 * self.schema.record_size() as u64)
    }
}
