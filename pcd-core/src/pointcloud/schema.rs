use std::fmt;

use thiserror::Error;

/// Primitive numeric types a vertex property can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarKind {
    /// Parses a PLY type name, accepting both the classic and the sized spellings.
    pub fn from_ply_name(name: &str) -> Option<Self> {
        let kind = match name {
            "char" | "int8" => Self::Char,
            "uchar" | "uint8" => Self::UChar,
            "short" | "int16" => Self::Short,
            "ushort" | "uint16" => Self::UShort,
            "int" | "int32" => Self::Int,
            "uint" | "uint32" => Self::UInt,
            "float" | "float32" => Self::Float,
            "double" | "float64" => Self::Double,
            _ => return None,
        };
        Some(kind)
    }

    pub fn ply_name(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::UChar => "uchar",
            Self::Short => "short",
            Self::UShort => "ushort",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Encoded width in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Float | Self::Double)
    }

    /// Converts `value` to the nearest value representable by this kind.
    ///
    /// Integers are rounded and saturate at the type bounds, floats are narrowed.
    pub fn quantize(self, value: f64) -> f64 {
        match self {
            Self::Char => value.round() as i8 as f64,
            Self::UChar => value.round() as u8 as f64,
            Self::Short => value.round() as i16 as f64,
            Self::UShort => value.round() as u16 as f64,
            Self::Int => value.round() as i32 as f64,
            Self::UInt => value.round() as u32 as f64,
            Self::Float => value as f32 as f64,
            Self::Double => value,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ply_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub kind: ScalarKind,
}

impl Property {
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Where a declared property lands in a [`Point`](super::point::Point).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    X,
    Y,
    Z,
    Channel(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("vertices must have an '{0}' property")]
    MissingCoordinate(&'static str),
    #[error("property '{0}' is declared more than once")]
    DuplicateProperty(String),
}

const COLOR_TRIPLES: [[&str; 3]; 2] = [
    ["red", "green", "blue"],
    ["diffuse_red", "diffuse_green", "diffuse_blue"],
];

/// Canonical names of the color channels, whichever triple a file declares.
pub const COLOR_CHANNELS: [&str; 3] = ["red", "green", "blue"];

/// The ordered vertex properties of a file, resolved once at header-parse time.
///
/// `x`, `y` and `z` are mandatory. All other properties become channels. A color
/// triple, plain `red/green/blue` before `diffuse_red/diffuse_green/diffuse_blue`,
/// takes channels 0, 1 and 2; the rest follow in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    properties: Vec<Property>,
    slots: Vec<Slot>,
    /// Property indices in channel order.
    channel_order: Vec<usize>,
    has_color: bool,
}

impl Schema {
    pub fn new(properties: Vec<Property>) -> Result<Self, SchemaError> {
        for (i, property) in properties.iter().enumerate() {
            if properties[..i].iter().any(|p| p.name == property.name) {
                return Err(SchemaError::DuplicateProperty(property.name.clone()));
            }
        }
        let position = |name: &str| properties.iter().position(|p| p.name == name);

        let color = COLOR_TRIPLES
            .iter()
            .find_map(|[r, g, b]| Some([position(r)?, position(g)?, position(b)?]));
        let mut channel_order: Vec<usize> = color.map(Vec::from).unwrap_or_default();
        let mut slots = Vec::with_capacity(properties.len());
        for (i, property) in properties.iter().enumerate() {
            let slot = match property.name.as_str() {
                "x" => Slot::X,
                "y" => Slot::Y,
                "z" => Slot::Z,
                _ => match channel_order.iter().position(|&c| c == i) {
                    Some(channel) => Slot::Channel(channel),
                    None => {
                        channel_order.push(i);
                        Slot::Channel(channel_order.len() - 1)
                    }
                },
            };
            slots.push(slot);
        }
        for (axis, name) in [(Slot::X, "x"), (Slot::Y, "y"), (Slot::Z, "z")] {
            if !slots.contains(&axis) {
                return Err(SchemaError::MissingCoordinate(name));
            }
        }
        Ok(Self {
            properties,
            slots,
            channel_order,
            has_color: color.is_some(),
        })
    }

    /// `float x, y, z` and `uchar red, green, blue`.
    pub fn xyz_rgb() -> Self {
        let properties = vec![
            Property::new("x", ScalarKind::Float),
            Property::new("y", ScalarKind::Float),
            Property::new("z", ScalarKind::Float),
            Property::new("red", ScalarKind::UChar),
            Property::new("green", ScalarKind::UChar),
            Property::new("blue", ScalarKind::UChar),
        ];
        Self {
            properties,
            slots: vec![
                Slot::X,
                Slot::Y,
                Slot::Z,
                Slot::Channel(0),
                Slot::Channel(1),
                Slot::Channel(2),
            ],
            channel_order: vec![3, 4, 5],
            has_color: true,
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Properties other than `x`, `y`, `z`, in channel order.
    pub fn channels(&self) -> impl Iterator<Item = &Property> {
        self.channel_order.iter().map(|&i| &self.properties[i])
    }

    pub fn channel_count(&self) -> usize {
        self.channel_order.len()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels().map(|p| p.name.clone()).collect()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels().position(|p| p.name == name)
    }

    /// The declared color properties in red, green, blue order. They are always
    /// channels 0, 1 and 2.
    pub fn color(&self) -> Option<[&Property; 3]> {
        if !self.has_color {
            return None;
        }
        Some([0, 1, 2].map(|c| &self.properties[self.channel_order[c]]))
    }

    /// Width of one binary vertex record.
    pub fn record_size(&self) -> usize {
        self.properties.iter().map(|p| p.kind.size()).sum()
    }
}
