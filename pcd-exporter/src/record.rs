use std::fmt::Write as _;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use pcd_core::{Encoding, Point, ScalarKind, Schema, Slot};

fn value_of(point: &Point, slot: Slot) -> f64 {
    match slot {
        Slot::X => point.x,
        Slot::Y => point.y,
        Slot::Z => point.z,
        Slot::Channel(i) => point.channel(i).unwrap_or(0.0),
    }
}

fn write_scalar<B: ByteOrder>(kind: ScalarKind, value: f64, bytes: &mut [u8]) {
    let v = kind.quantize(value);
    match kind {
        ScalarKind::Char => bytes[0] = v as i8 as u8,
        ScalarKind::UChar => bytes[0] = v as u8,
        ScalarKind::Short => B::write_i16(bytes, v as i16),
        ScalarKind::UShort => B::write_u16(bytes, v as u16),
        ScalarKind::Int => B::write_i32(bytes, v as i32),
        ScalarKind::UInt => B::write_u32(bytes, v as u32),
        ScalarKind::Float => B::write_f32(bytes, v as f32),
        ScalarKind::Double => B::write_f64(bytes, v),
    }
}

/// Serializes points into vertex records of a fixed schema.
pub(crate) struct RecordEncoder {
    fields: Vec<(ScalarKind, Slot)>,
    encoding: Encoding,
    record: Vec<u8>,
    line: String,
}

impl RecordEncoder {
    pub fn new(schema: &Schema, encoding: Encoding) -> Self {
        let fields = schema
            .properties()
            .iter()
            .zip(schema.slots())
            .map(|(p, &slot)| (p.kind, slot))
            .collect();
        Self {
            fields,
            encoding,
            record: vec![0; schema.record_size()],
            line: String::new(),
        }
    }

    /// Encodes `point`, returning the bytes of one record.
    pub fn encode(&mut self, point: &Point) -> &[u8] {
        match self.encoding {
            Encoding::Ascii => self.encode_ascii(point),
            Encoding::BinaryLittleEndian => self.encode_binary::<LittleEndian>(point),
            Encoding::BinaryBigEndian => self.encode_binary::<BigEndian>(point),
        }
    }

    fn encode_binary<B: ByteOrder>(&mut self, point: &Point) -> &[u8] {
        let mut offset = 0;
        for &(kind, slot) in &self.fields {
            write_scalar::<B>(kind, value_of(point, slot), &mut self.record[offset..]);
            offset += kind.size();
        }
        &self.record
    }

    fn encode_ascii(&mut self, point: &Point) -> &[u8] {
        self.line.clear();
        for (i, &(kind, slot)) in self.fields.iter().enumerate() {
            if i > 0 {
                self.line.push(' ');
            }
            let v = kind.quantize(value_of(point, slot));
            let _ = match kind {
                ScalarKind::Float => write!(self.line, "{}", v as f32),
                ScalarKind::Double => write!(self.line, "{}", v),
                _ => write!(self.line, "{}", v as i64),
            };
        }
        self.line.push('\n');
        self.line.as_bytes()
    }
}
