use serde_derive::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

///ITU-T X.680 | ISO/IEC 8824-1, chapter 8
///
/// # Ordering
/// According to ITU-T X.680 | ISO/IEC 8824-1, 8.6, the canonical order is
/// a) Universal, Application, ContextSpecific and Private and
/// b) within each class, the numbers shall be ordered ascending
///
/// ```rust
/// use asn1dissect::model::Tag;
/// let mut tags = vec![
///     Tag::Universal(1),
///     Tag::Application(0),
///     Tag::Private(7),
///     Tag::ContextSpecific(107),
///     Tag::ContextSpecific(32),
///     Tag::Universal(0),
/// ];
/// tags.sort();
/// assert_eq!(tags, vec![
///     Tag::Universal(0),
///     Tag::Universal(1),
///     Tag::Application(0),
///     Tag::ContextSpecific(32),
///     Tag::ContextSpecific(107),
///     Tag::Private(7),
/// ]);
/// ```
#[derive(
    Debug, Clone, Copy, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize,
)]
pub enum Tag {
    Universal(usize),
    Application(usize),
    ContextSpecific(usize),
    Private(usize),
}

impl Tag {
    /// Marks the end of an indefinite length encoding, ITU-T X.690 8.1.5
    pub const END_OF_CONTENTS: Tag = Tag::Universal(0);
    pub const DEFAULT_BOOLEAN: Tag = Tag::Universal(1);
    pub const DEFAULT_INTEGER: Tag = Tag::Universal(2);
    pub const DEFAULT_BIT_STRING: Tag = Tag::Universal(3);
    pub const DEFAULT_OCTET_STRING: Tag = Tag::Universal(4);
    pub const DEFAULT_NULL: Tag = Tag::Universal(5);
    pub const DEFAULT_OBJECT_IDENTIFIER: Tag = Tag::Universal(6);
    pub const DEFAULT_ENUMERATED: Tag = Tag::Universal(10);
    pub const DEFAULT_UTF8_STRING: Tag = Tag::Universal(12);
    pub const DEFAULT_SEQUENCE: Tag = Tag::Universal(16);
    pub const DEFAULT_SEQUENCE_OF: Tag = Tag::Universal(16);
    pub const DEFAULT_SET: Tag = Tag::Universal(17);
    pub const DEFAULT_SET_OF: Tag = Tag::Universal(17);

    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_NUMERIC_STRING: Tag = Tag::Universal(18);
    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_PRINTABLE_STRING: Tag = Tag::Universal(19);
    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_TELETEX_STRING: Tag = Tag::Universal(20);
    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_IA5_STRING: Tag = Tag::Universal(22);
    /// ITU-T Rec. X.680, 46
    pub const DEFAULT_UTC_TIME: Tag = Tag::Universal(23);
    /// ITU-T Rec. X.680, 47
    pub const DEFAULT_GENERALIZED_TIME: Tag = Tag::Universal(24);
    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_GRAPHIC_STRING: Tag = Tag::Universal(25);
    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_VISIBLE_STRING: Tag = Tag::Universal(26);
    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_GENERAL_STRING: Tag = Tag::Universal(27);
    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_UNIVERSAL_STRING: Tag = Tag::Universal(28);
    /// ITU-T Rec. X.680, 41
    pub const DEFAULT_BMP_STRING: Tag = Tag::Universal(30);

    /// The two class bits as they appear in the identifier octet, ITU-T X.690 8.1.2.2
    pub const fn class_bits(self) -> u8 {
        match self {
            Tag::Universal(_) => 0b00,
            Tag::Application(_) => 0b01,
            Tag::ContextSpecific(_) => 0b10,
            Tag::Private(_) => 0b11,
        }
    }

    pub const fn from_class_bits(class: u8, number: usize) -> Self {
        match class & 0b11 {
            0b00 => Tag::Universal(number),
            0b01 => Tag::Application(number),
            0b10 => Tag::ContextSpecific(number),
            _ => Tag::Private(number),
        }
    }

    pub const fn value(self) -> usize {
        match self {
            Tag::Universal(value)
            | Tag::Application(value)
            | Tag::ContextSpecific(value)
            | Tag::Private(value) => value,
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Universal(number) => write!(f, "[UNIVERSAL {number}]"),
            Tag::Application(number) => write!(f, "[APPLICATION {number}]"),
            Tag::ContextSpecific(number) => write!(f, "[{number}]"),
            Tag::Private(number) => write!(f, "[PRIVATE {number}]"),
        }
    }
}

/// ITU-T X.680 | ISO/IEC 8824-1, 31.2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagMode {
    Implicit,
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tagging {
    pub tag: Tag,
    pub mode: TagMode,
}

impl Tagging {
    pub const fn implicit(tag: Tag) -> Self {
        Self {
            tag,
            mode: TagMode::Implicit,
        }
    }

    pub const fn explicit(tag: Tag) -> Self {
        Self {
            tag,
            mode: TagMode::Explicit,
        }
    }
}
