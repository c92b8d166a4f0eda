//! Display hooks that derive a human readable text from a decoded [`Value`]. A hook never alters
//! the value itself.

use crate::model::{NamedBits, ValueMap};
use crate::tree::{hex, Value};
use std::fmt::{Debug, Formatter};

pub type CustomFormat = fn(&Value) -> Option<String>;

#[derive(Clone)]
pub enum Format {
    /// Names distinguished integer values, displayed as `name (value)`
    Named(ValueMap),
    /// Lists the names of the set bits of a BIT STRING
    NamedBits(NamedBits),
    /// `value * factor + offset` followed by the unit
    Scaled {
        factor: f64,
        offset: f64,
        unit: String,
    },
    Hex,
    Custom(CustomFormat),
}

impl Format {
    pub fn scaled(factor: f64, offset: f64, unit: impl Into<String>) -> Self {
        Format::Scaled {
            factor,
            offset,
            unit: unit.into(),
        }
    }

    /// `None` if the hook has nothing to say about the value
    pub fn apply(&self, value: &Value) -> Option<String> {
        match (self, value) {
            (Format::Named(names), Value::Integer(integer)) => i64::try_from(*integer)
                .ok()
                .and_then(|integer| names.name_of(integer))
                .map(|name| format!("{} ({})", name, integer)),
            (Format::NamedBits(names), Value::Bits { data, .. }) => {
                let set = names
                    .extract(data)
                    .filter_map(|(name, set)| if set { Some(name) } else { None })
                    .collect::<Vec<_>>();
                Some(set.join(", "))
            }
            (
                Format::Scaled {
                    factor,
                    offset,
                    unit,
                },
                Value::Integer(integer),
            ) => Some(format!("{} {}", *integer as f64 * factor + offset, unit)),
            (Format::Hex, Value::Integer(integer)) => Some(format!("{:#x}", integer)),
            (Format::Hex, Value::Bytes(bytes)) | (Format::Hex, Value::Bits { data: bytes, .. }) => {
                Some(hex(bytes))
            }
            (Format::Custom(custom), value) => custom(value),
            _ => None,
        }
    }
}

impl Debug for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Named(names) => f.debug_tuple("Named").field(names).finish(),
            Format::NamedBits(names) => f.debug_tuple("NamedBits").field(names).finish(),
            Format::Scaled {
                factor,
                offset,
                unit,
            } => f
                .debug_struct("Scaled")
                .field("factor", factor)
                .field("offset", offset)
                .field("unit", unit)
                .finish(),
            Format::Hex => f.write_str("Hex"),
            Format::Custom(custom) => write!(f, "Custom({:#x})", *custom as usize),
        }
    }
}

impl PartialEq for Format {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Format::Named(a), Format::Named(b)) => a == b,
            (Format::NamedBits(a), Format::NamedBits(b)) => a == b,
            (
                Format::Scaled {
                    factor: fa,
                    offset: oa,
                    unit: ua,
                },
                Format::Scaled {
                    factor: fb,
                    offset: ob,
                    unit: ub,
                },
            ) => fa == fb && oa == ob && ua == ub,
            (Format::Hex, Format::Hex) => true,
            (Format::Custom(a), Format::Custom(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }
}
