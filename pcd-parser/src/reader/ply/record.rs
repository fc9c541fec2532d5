use byteorder::{BigEndian, ByteOrder, LittleEndian};
use pcd_core::{Encoding, Point, ScalarKind, Schema, Slot};

struct Field {
    kind: ScalarKind,
    offset: usize,
    slot: Slot,
}

/// Turns raw vertex records into [`Point`]s according to a [`Schema`].
pub struct RecordDecoder {
    fields: Vec<Field>,
    channel_count: usize,
    record_size: usize,
    encoding: Encoding,
}

fn read_scalar<B: ByteOrder>(kind: ScalarKind, bytes: &[u8]) -> f64 {
    match kind {
        ScalarKind::Char => bytes[0] as i8 as f64,
        ScalarKind::UChar => bytes[0] as f64,
        ScalarKind::Short => B::read_i16(bytes) as f64,
        ScalarKind::UShort => B::read_u16(bytes) as f64,
        ScalarKind::Int => B::read_i32(bytes) as f64,
        ScalarKind::UInt => B::read_u32(bytes) as f64,
        ScalarKind::Float => B::read_f32(bytes) as f64,
        ScalarKind::Double => B::read_f64(bytes),
    }
}

fn assign(point: &mut Point, slot: Slot, value: f64) {
    match slot {
        Slot::X => point.x = value,
        Slot::Y => point.y = value,
        Slot::Z => point.z = value,
        Slot::Channel(i) => point.channels[i] = value,
    }
}

impl RecordDecoder {
    pub fn new(schema: &Schema, encoding: Encoding) -> Self {
        let mut offset = 0;
        let fields = schema
            .properties()
            .iter()
            .zip(schema.slots())
            .map(|(property, &slot)| {
                let field = Field {
                    kind: property.kind,
                    offset,
                    slot,
                };
                offset += property.kind.size();
                field
            })
            .collect();
        Self {
            fields,
            channel_count: schema.channel_count(),
            record_size: schema.record_size(),
            encoding,
        }
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    fn empty_point(&self) -> Point {
        Point::new(0.0, 0.0, 0.0, vec![0.0; self.channel_count])
    }

    /// Decodes one fixed-width binary record. `bytes` must hold `record_size` bytes.
    pub fn decode_binary(&self, bytes: &[u8]) -> Point {
        match self.encoding {
            Encoding::BinaryBigEndian => self.decode_with::<BigEndian>(bytes),
            _ => self.decode_with::<LittleEndian>(bytes),
        }
    }

    fn decode_with<B: ByteOrder>(&self, bytes: &[u8]) -> Point {
        let mut point = self.empty_point();
        for field in &self.fields {
            let value = read_scalar::<B>(field.kind, &bytes[field.offset..]);
            assign(&mut point, field.slot, value);
        }
        point
    }

    /// Decodes one whitespace separated ascii record, casting each value to its
    /// declared type. Tokens beyond the declared properties are ignored.
    pub fn decode_ascii(&self, line: &str) -> Result<Point, String> {
        let mut point = self.empty_point();
        let mut tokens = line.split_whitespace();
        for field in &self.fields {
            let token = tokens.next().ok_or_else(|| {
                format!(
                    "expected {} values, found fewer",
                    self.fields.len()
                )
            })?;
            let value = match field.kind {
                ScalarKind::Float => token.parse::<f32>().map(f64::from),
                kind => token.parse::<f64>().map(|v| kind.quantize(v)),
            }
            .map_err(|_| format!("'{}' is not a number", token))?;
            assign(&mut point, field.slot, value);
        }
        Ok(point)
    }
}
