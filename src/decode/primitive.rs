//! Interpretation of primitive content octets, shared by both encoding rules

use crate::err::{Error, ErrorKind, Malformed, Violation};
use crate::model::{Charset, IntegerType, NamedBits, TimeKind, ValueMap, Width};
use crate::tree::{ParseNode, Value};
use byteorder::{ByteOrder, NetworkEndian};
use std::fmt::Write;

const INT_BYTES: usize = std::mem::size_of::<i128>();

/// ITU-T X.690, 8.3: two's complement, big endian, at least one octet
pub(crate) fn integer(content: &[u8], integer: &IntegerType) -> Result<Value, Error> {
    if content.len() > INT_BYTES && integer.width == Width::Unlimited {
        return Ok(Value::Bytes(content.to_vec()));
    }
    let value = signed(content)?;
    check_width(value, integer.width)?;
    Ok(Value::Integer(value))
}

pub(crate) fn signed(content: &[u8]) -> Result<i128, Error> {
    let first = match content.first() {
        None => return Err(Error::malformed(Malformed::EmptyInteger)),
        Some(_) if content.len() > INT_BYTES => {
            return Err(ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into())
        }
        Some(first) => *first,
    };
    let mut bytes = if first & 0x80 != 0 {
        [0xFF; INT_BYTES]
    } else {
        [0x00; INT_BYTES]
    };
    bytes[INT_BYTES - content.len()..].copy_from_slice(content);
    Ok(NetworkEndian::read_i128(&bytes))
}

pub(crate) fn check_width(value: i128, width: Width) -> Result<(), Error> {
    if width.contains(value) {
        Ok(())
    } else {
        let (lower, upper) = width.bounds();
        Err(Error::value_not_in_range(value, Some(lower), Some(upper)))
    }
}

/// `name (value)` for distinguished values
pub(crate) fn value_name(values: Option<&ValueMap>, value: i128) -> Option<String> {
    let name = values?.name_of(i64::try_from(value).ok()?)?;
    Some(format!("{} ({})", name, value))
}

/// ITU-T X.690, 8.2: a single octet, any value other than zero is `true`
pub(crate) fn boolean(content: &[u8]) -> Result<bool, Error> {
    match content {
        [octet] => Ok(*octet != 0),
        other => Err(Error::malformed(Malformed::InvalidLength {
            expected: 1,
            got: other.len(),
        })),
    }
}

pub(crate) fn null(content: &[u8]) -> Result<(), Error> {
    if content.is_empty() {
        Ok(())
    } else {
        Err(Error::malformed(Malformed::InvalidLength {
            expected: 0,
            got: content.len(),
        }))
    }
}

/// ITU-T X.690, 8.19: base 128 sub-identifiers, the first one combines the first two arcs
pub(crate) fn object_identifier(content: &[u8]) -> Result<String, Error> {
    let invalid = || Error::malformed(Malformed::InvalidObjectIdentifier);
    match content.last() {
        Some(last) if last & 0x80 == 0 => {}
        _ => return Err(invalid()),
    }

    let mut text = String::with_capacity(content.len() * 3);
    let mut value = 0_u128;
    let mut starts_sub_identifier = true;
    for octet in content {
        // 8.19.2: the leading octet shall not be 0x80
        if (starts_sub_identifier && *octet == 0x80) || value > (u128::MAX >> 7) {
            return Err(invalid());
        }
        value = (value << 7) | u128::from(octet & 0x7F);
        starts_sub_identifier = octet & 0x80 == 0;
        if starts_sub_identifier {
            if text.is_empty() {
                let (first, second) = match value {
                    0..=39 => (0, value),
                    40..=79 => (1, value - 40),
                    _ => (2, value - 80),
                };
                let _ = write!(text, "{}.{}", first, second);
            } else {
                let _ = write!(text, ".{}", value);
            }
            value = 0;
        }
    }
    Ok(text)
}

/// ITU-T X.690, 8.6: the initial octet holds the number of unused bits in the last octet
pub(crate) fn bit_string(content: &[u8]) -> Result<(Vec<u8>, u64), Error> {
    let (unused, data) = content.split_first().ok_or_else(|| {
        Error::malformed(Malformed::InvalidLength {
            expected: 1,
            got: 0,
        })
    })?;
    if *unused > 7 || (data.is_empty() && *unused != 0) {
        return Err(Error::malformed(Malformed::InvalidUnusedBits(*unused)));
    }
    let mut data = data.to_vec();
    if let Some(last) = data.last_mut() {
        *last &= 0xFF_u8 << *unused;
    }
    let bit_len = data.len() as u64 * 8 - u64::from(*unused);
    Ok((data, bit_len))
}

/// One child per named bit, bits beyond the data are not set
pub(crate) fn named_bits(named: &NamedBits, data: &[u8], bit_offset: usize) -> Vec<ParseNode> {
    named
        .extract(data)
        .map(|(name, set)| {
            ParseNode::new(name, "NAMED BIT", Value::Boolean(set)).with_span(bit_offset, 0)
        })
        .collect()
}

pub(crate) fn string(charset: Charset, content: &[u8]) -> Result<String, Error> {
    charset
        .decode_octets(content)
        .map_err(|index| Error::malformed(Malformed::InvalidString { charset, index }))
}

/// Validates UTCTime (ITU-T X.680, 47) and GeneralizedTime (ITU-T X.680, 46) values and returns
/// them in a readable form
pub(crate) fn time(kind: TimeKind, text: &str) -> Result<String, Error> {
    TimeCursor::new(text)
        .parse(kind)
        .ok_or_else(|| Error::malformed(Malformed::InvalidTime(text.to_string())))
}

struct TimeCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> TimeCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.position += 1;
        Some(byte)
    }

    fn number(&mut self, digits: usize) -> Option<u32> {
        let slice = self.bytes.get(self.position..self.position + digits)?;
        if !slice.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.position += digits;
        Some(
            slice
                .iter()
                .fold(0, |value, digit| value * 10 + u32::from(digit - b'0')),
        )
    }

    fn optional_number(&mut self, digits: usize) -> Option<u32> {
        if self.peek().map(|byte| byte.is_ascii_digit()).unwrap_or(false) {
            self.number(digits)
        } else {
            None
        }
    }

    fn parse(mut self, kind: TimeKind) -> Option<String> {
        let year = match kind {
            // RFC 5280, 4.1.2.5.1
            TimeKind::UtcTime => match self.number(2)? {
                year if year >= 50 => 1900 + year,
                year => 2000 + year,
            },
            TimeKind::GeneralizedTime => self.number(4)?,
        };
        let month = self.number(2)?;
        let day = self.number(2)?;
        let hour = self.number(2)?;
        let minute = match kind {
            TimeKind::UtcTime => Some(self.number(2)?),
            TimeKind::GeneralizedTime => self.optional_number(2),
        };
        let second = minute.and_then(|_| self.optional_number(2));

        let mut fraction = String::new();
        if kind == TimeKind::GeneralizedTime
            && second.is_some()
            && matches!(self.peek(), Some(b'.') | Some(b','))
        {
            self.position += 1;
            while let Some(digit) = self.peek().filter(u8::is_ascii_digit) {
                fraction.push(char::from(digit));
                self.position += 1;
            }
            if fraction.is_empty() {
                return None;
            }
        }

        let zone = match self.next() {
            Some(b'Z') => "UTC".to_string(),
            Some(sign @ (b'+' | b'-')) => {
                let hours = self.number(2)?;
                let minutes = self.number(2)?;
                if hours > 23 || minutes > 59 {
                    return None;
                }
                format!("{}{:02}{:02}", char::from(sign), hours, minutes)
            }
            None if kind == TimeKind::GeneralizedTime => "local".to_string(),
            _ => return None,
        };

        let minute = minute.unwrap_or(0);
        let second = second.unwrap_or(0);
        if self.position != self.bytes.len()
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 60
        {
            return None;
        }

        let mut text = format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        );
        if !fraction.is_empty() {
            text.push('.');
            text.push_str(&fraction);
        }
        text.push(' ');
        text.push_str(&zone);
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_sign_extension() {
        let any = IntegerType::default();
        assert_eq!(Value::Integer(-129), integer(&[0xFF, 0x7F], &any).unwrap());
        assert_eq!(Value::Integer(128), integer(&[0x00, 0x80], &any).unwrap());
        assert_eq!(
            &ErrorKind::Malformed(Malformed::EmptyInteger),
            integer(&[], &any).unwrap_err().kind()
        );
    }

    #[test]
    fn test_integer_width() {
        let byte = IntegerType::default().width(Width::U8);
        assert_eq!(Value::Integer(255), integer(&[0x00, 0xFF], &byte).unwrap());
        assert_eq!(
            &ErrorKind::ConstraintViolation(Violation::ValueNotInRange {
                value: 256,
                lower: Some(0),
                upper: Some(255),
            }),
            integer(&[0x01, 0x00], &byte).unwrap_err().kind()
        );

        let huge = [0x01; 17];
        assert_eq!(
            &ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt),
            integer(&huge, &IntegerType::default()).unwrap_err().kind()
        );
        let unlimited = IntegerType::default().width(Width::Unlimited);
        assert_eq!(
            Value::Bytes(huge.to_vec()),
            integer(&huge, &unlimited).unwrap()
        );
    }

    #[test]
    fn test_object_identifier() {
        assert_eq!(
            "2.5.29.19",
            object_identifier(&[0x55, 0x1D, 0x13]).unwrap()
        );
        assert_eq!(
            "1.2.840.113549.1.1.11",
            object_identifier(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0B]).unwrap()
        );
        assert_eq!("2.999", object_identifier(&[0x88, 0x37]).unwrap());
    }

    #[test]
    fn test_invalid_object_identifier() {
        for content in [&[][..], &[0x2A, 0x86][..], &[0x80, 0x01][..]] {
            assert_eq!(
                &ErrorKind::Malformed(Malformed::InvalidObjectIdentifier),
                object_identifier(content).unwrap_err().kind()
            );
        }
    }

    #[test]
    fn test_bit_string_unused_bits() {
        assert_eq!(
            (vec![0b1010_0000], 3),
            bit_string(&[0x05, 0b1010_0111]).unwrap()
        );
        assert_eq!((vec![], 0), bit_string(&[0x00]).unwrap());
        assert_eq!(
            &ErrorKind::Malformed(Malformed::InvalidUnusedBits(8)),
            bit_string(&[0x08, 0x00]).unwrap_err().kind()
        );
        assert_eq!(
            &ErrorKind::Malformed(Malformed::InvalidUnusedBits(1)),
            bit_string(&[0x01]).unwrap_err().kind()
        );
    }

    #[test]
    fn test_named_bits_beyond_data() {
        let named = NamedBits::new(vec![(0, "first"), (12, "far")]);
        let nodes = named_bits(&named, &[0x80], 8);
        assert_eq!(Value::Boolean(true), nodes[0].value);
        assert_eq!("far", nodes[1].label);
        assert_eq!(Value::Boolean(false), nodes[1].value);
    }

    #[test]
    fn test_boolean_length() {
        assert!(boolean(&[0x01]).unwrap());
        assert!(boolean(&[0xFF]).unwrap());
        assert!(!boolean(&[0x00]).unwrap());
        assert!(boolean(&[0x00, 0x00]).is_err());
    }

    #[test]
    fn test_utc_time() {
        assert_eq!(
            "2019-05-01 12:00:00 UTC",
            time(TimeKind::UtcTime, "190501120000Z").unwrap()
        );
        assert_eq!(
            "1999-12-31 23:59:00 +0100",
            time(TimeKind::UtcTime, "9912312359+0100").unwrap()
        );
        for invalid in ["191301120000Z", "1905011200", "190501120000Zx", "19050112"] {
            assert!(time(TimeKind::UtcTime, invalid).is_err(), "{}", invalid);
        }
    }

    #[test]
    fn test_generalized_time() {
        assert_eq!(
            "2020-02-29 23:59:60.5 UTC",
            time(TimeKind::GeneralizedTime, "20200229235960.5Z").unwrap()
        );
        assert_eq!(
            "2020-02-29 10:00:00 local",
            time(TimeKind::GeneralizedTime, "2020022910").unwrap()
        );
        assert!(time(TimeKind::GeneralizedTime, "20200229235960.Z").is_err());
    }

    #[test]
    fn test_string_reports_index() {
        assert_eq!(
            &ErrorKind::Malformed(Malformed::InvalidString {
                charset: Charset::Numeric,
                index: 2,
            }),
            string(Charset::Numeric, b"12a").unwrap_err().kind()
        );
    }
}
