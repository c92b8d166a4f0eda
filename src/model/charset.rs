use crate::model::Tag;
use byteorder::{ByteOrder, NetworkEndian};
use strum_macros::EnumString;

#[derive(Debug, Clone, Copy, PartialOrd, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Charset {
    Utf8,
    /// ITU-T X.680 | ISO/IEC 8824-1, 43.3
    Numeric,
    /// ITU-T X.680 | ISO/IEC 8824-1, 43.3
    Printable,
    /// (Also T61String), octets are taken as ISO 8859-1
    Teletex,
    /// Encoding as in ISO/IEC 646
    Ia5,
    Graphic,
    /// ITU-T X.680 | ISO/IEC 8824-1, 43.3
    /// (Also ISO646String)
    Visible,
    General,
    /// UCS-4, ITU-T X.680 | ISO/IEC 8824-1, 41.16
    Universal,
    /// UCS-2, ITU-T X.680 | ISO/IEC 8824-1, 41.16
    Bmp,
}

/// How the characters of a string are packed by the unaligned PER
#[derive(Debug, Clone, PartialEq)]
pub enum CharacterEncoding {
    /// Not a known-multiplier character string, encoded as length prefixed octets
    Octets,
    /// Every character occupies `bits` bits and carries its character code
    Code { bits: usize },
    /// Every character occupies `bits` bits and carries its index in the sorted alphabet
    Index { bits: usize, alphabet: Vec<char> },
}

impl Charset {
    /// Sorted according to ITU-T X.680, 43.5
    /// ```rust
    /// use asn1dissect::model::Charset;
    /// assert!(Charset::NUMERIC_STRING_CHARACTERS.chars().all(|c| Charset::Numeric.is_valid(c)));
    /// assert_eq!(11, Charset::NUMERIC_STRING_CHARACTERS.chars().count());
    /// ```
    pub const NUMERIC_STRING_CHARACTERS: &'static str = " 0123456789";

    /// Sorted according to ITU-T X.680, 43.6
    /// ```rust
    /// use asn1dissect::model::Charset;
    /// assert!(Charset::PRINTABLE_STRING_CHARACTERS.chars().all(|c| Charset::Printable.is_valid(c)));
    /// assert_eq!(74, Charset::PRINTABLE_STRING_CHARACTERS.chars().count());
    /// ```
    pub const PRINTABLE_STRING_CHARACTERS: &'static str =
        " '()+,-./0123456789:=?ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

    pub fn default_tag(self) -> Tag {
        match self {
            Charset::Utf8 => Tag::DEFAULT_UTF8_STRING,
            Charset::Numeric => Tag::DEFAULT_NUMERIC_STRING,
            Charset::Printable => Tag::DEFAULT_PRINTABLE_STRING,
            Charset::Teletex => Tag::DEFAULT_TELETEX_STRING,
            Charset::Ia5 => Tag::DEFAULT_IA5_STRING,
            Charset::Graphic => Tag::DEFAULT_GRAPHIC_STRING,
            Charset::Visible => Tag::DEFAULT_VISIBLE_STRING,
            Charset::General => Tag::DEFAULT_GENERAL_STRING,
            Charset::Universal => Tag::DEFAULT_UNIVERSAL_STRING,
            Charset::Bmp => Tag::DEFAULT_BMP_STRING,
        }
    }

    pub fn find_invalid(self, str: &str) -> Option<(usize, char)> {
        str.chars()
            .enumerate()
            .find(|(_index, char)| !self.is_valid(*char))
    }

    pub const fn is_valid(self, char: char) -> bool {
        match self {
            Charset::Utf8 | Charset::Universal => true,
            Charset::Numeric => matches!(char, ' ' | '0'..='9'),
            Charset::Printable => {
                matches!(char, ' ' | '\'' ..= ')' | '+' ..= ':' | '=' | '?' | 'A'..='Z' | 'a'..='z'  )
            }
            Charset::Ia5 => matches!(char as u32, 0_u32..=127),
            Charset::Visible => matches!(char as u32, 32_u32..=126),
            Charset::Teletex | Charset::Graphic | Charset::General => {
                matches!(char as u32, 0_u32..=255)
            }
            Charset::Bmp => matches!(char as u32, 0_u32..=0xFFFF),
        }
    }

    /// Converts the content octets of a BER encoded string, validating the repertoire. On failure
    /// the index of the first offending character is returned.
    pub fn decode_octets(self, octets: &[u8]) -> Result<String, usize> {
        let string = match self {
            Charset::Utf8 => match std::str::from_utf8(octets) {
                Ok(string) => string.to_string(),
                Err(e) => {
                    return Err(String::from_utf8_lossy(&octets[..e.valid_up_to()])
                        .chars()
                        .count())
                }
            },
            Charset::Bmp => {
                if octets.len() % 2 != 0 {
                    return Err(octets.len() / 2);
                }
                let mut string = String::with_capacity(octets.len() / 2);
                for pair in octets.chunks_exact(2) {
                    match char::from_u32(u32::from(NetworkEndian::read_u16(pair))) {
                        Some(char) => string.push(char),
                        None => return Err(string.chars().count()),
                    }
                }
                string
            }
            Charset::Universal => {
                if octets.len() % 4 != 0 {
                    return Err(octets.len() / 4);
                }
                let mut string = String::with_capacity(octets.len() / 4);
                for quad in octets.chunks_exact(4) {
                    match char::from_u32(NetworkEndian::read_u32(quad)) {
                        Some(char) => string.push(char),
                        None => return Err(string.chars().count()),
                    }
                }
                string
            }
            _ => octets.iter().map(|octet| char::from(*octet)).collect(),
        };
        match self.find_invalid(&string) {
            Some((index, _)) => Err(index),
            None => Ok(string),
        }
    }

    /// ITU-T X.691 | ISO/IEC 8825-2:2015, chapter 30.5, for the unaligned variant. A permitted
    /// alphabet constraint replaces the full repertoire of a known-multiplier string.
    pub fn per_encoding(self, permitted: Option<&str>) -> CharacterEncoding {
        let mut alphabet = match (self, permitted) {
            (Charset::Utf8, _)
            | (Charset::Teletex, _)
            | (Charset::Graphic, _)
            | (Charset::General, _) => return CharacterEncoding::Octets,
            (_, Some(permitted)) => permitted.chars().collect::<Vec<_>>(),
            (Charset::Numeric, None) => Self::NUMERIC_STRING_CHARACTERS.chars().collect(),
            (Charset::Printable, None) => Self::PRINTABLE_STRING_CHARACTERS.chars().collect(),
            (Charset::Ia5, None) => return CharacterEncoding::Code { bits: 7 },
            (Charset::Visible, None) => return CharacterEncoding::Code { bits: 7 },
            (Charset::Bmp, None) => return CharacterEncoding::Code { bits: 16 },
            (Charset::Universal, None) => return CharacterEncoding::Code { bits: 32 },
        };
        alphabet.sort_unstable();
        alphabet.dedup();

        let count = alphabet.len() as u64;
        let bits = bits_for_count(count);
        let largest = alphabet.last().map(|c| *c as u64).unwrap_or_default();
        if bits >= 64 || largest < (1_u64 << bits) {
            CharacterEncoding::Code { bits }
        } else {
            CharacterEncoding::Index { bits, alphabet }
        }
    }
}

/// Smallest `b` with `2^b >= count`
fn bits_for_count(count: u64) -> usize {
    match count {
        0 | 1 => 0,
        n => (64 - (n - 1).leading_zeros()) as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_numeric_uses_index() {
        match Charset::Numeric.per_encoding(None) {
            CharacterEncoding::Index { bits, alphabet } => {
                assert_eq!(4, bits);
                assert_eq!(' ', alphabet[0]);
                assert_eq!('9', alphabet[10]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_printable_uses_code() {
        assert_eq!(
            CharacterEncoding::Code { bits: 7 },
            Charset::Printable.per_encoding(None)
        );
    }

    #[test]
    fn test_permitted_alphabet_narrows() {
        assert_eq!(
            CharacterEncoding::Index {
                bits: 2,
                alphabet: vec!['#', '*', '0', '1'],
            },
            Charset::Ia5.per_encoding(Some("01*#"))
        );
    }

    #[test]
    fn test_bmp_octets() {
        assert_eq!(
            Ok("Hé".to_string()),
            Charset::Bmp.decode_octets(&[0x00, 0x48, 0x00, 0xE9])
        );
        assert_eq!(Err(1), Charset::Bmp.decode_octets(&[0x00, 0x48, 0x00]));
    }

    #[test]
    fn test_printable_rejects() {
        assert_eq!(Err(1), Charset::Printable.decode_octets(b"a@b"));
        assert_eq!(Some((1, '@')), Charset::Printable.find_invalid("a@b"));
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(Ok(Charset::Ia5), Charset::from_str("ia5"));
    }
}
