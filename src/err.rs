use crate::model::{Charset, SchemaErrorKind, Tag};
use crate::registry::Discriminator;
use backtrace::Backtrace;
use std::fmt::{Debug, Display, Formatter};

pub struct Error(pub(crate) Box<Inner>);

impl Error {
    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }

    /// Field labels from the root of the decode down to the failing node
    #[inline]
    pub fn path(&self) -> &[String] {
        &self.0.path
    }

    /// Bit offset of the start of the failing node, relative to the decoded buffer
    #[inline]
    pub fn bit_offset(&self) -> Option<usize> {
        self.0.bit_offset
    }

    #[inline]
    pub fn byte_offset(&self) -> Option<usize> {
        self.0.bit_offset.map(|bits| bits / 8)
    }

    /// Records the enclosing field. The offset is kept from the innermost call, the label is
    /// prepended so the path reads root first.
    pub(crate) fn located(mut self, bit_offset: usize, label: &str) -> Self {
        if self.0.bit_offset.is_none() {
            self.0.bit_offset = Some(bit_offset);
        }
        self.0.path.insert(0, label.to_string());
        self
    }

    /// Shifts the recorded offset by the position of a nested buffer (open types, octet string
    /// carriers) inside its parent.
    pub(crate) fn shifted(mut self, bit_base: usize) -> Self {
        if let Some(offset) = &mut self.0.bit_offset {
            *offset += bit_base;
        }
        self
    }

    #[cold]
    #[inline(never)]
    pub fn truncated(needed: usize, remaining: usize) -> Self {
        Self::from(ErrorKind::Truncated { needed, remaining })
    }

    #[cold]
    #[inline(never)]
    pub fn malformed(malformed: Malformed) -> Self {
        Self::from(ErrorKind::Malformed(malformed))
    }

    #[cold]
    #[inline(never)]
    pub fn unexpected_tag(expected: Tag, got: Tag) -> Self {
        Self::malformed(Malformed::UnexpectedTag { expected, got })
    }

    #[cold]
    #[inline(never)]
    pub fn value_not_in_range(value: i128, lower: Option<i128>, upper: Option<i128>) -> Self {
        Self::from(ErrorKind::ConstraintViolation(Violation::ValueNotInRange {
            value,
            lower,
            upper,
        }))
    }

    #[cold]
    #[inline(never)]
    pub fn size_not_in_range(size: u64, lower: Option<u64>, upper: Option<u64>) -> Self {
        Self::from(ErrorKind::ConstraintViolation(Violation::SizeNotInRange {
            size,
            lower,
            upper,
        }))
    }

    #[cold]
    #[inline(never)]
    pub fn unknown_choice_tag(tag: Tag) -> Self {
        Self::from(ErrorKind::UnknownChoice(ChoiceSelector::Tag(tag)))
    }

    #[cold]
    #[inline(never)]
    pub fn unknown_choice_index(index: u64, alternatives: u64) -> Self {
        Self::from(ErrorKind::UnknownChoice(ChoiceSelector::Index {
            index,
            alternatives,
        }))
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Error(Box::new(Inner::from(kind)))
    }
}

impl Debug for Error {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.kind)?;
        if let Some(offset) = self.0.bit_offset {
            write!(f, " at byte {} (bit {})", offset / 8, offset)?;
        }
        if !self.0.path.is_empty() {
            write!(f, " in {}", self.0.path.join("."))?;
        }
        writeln!(f)?;
        let mut backtrace = self.0.backtrace.clone();
        backtrace.resolve();
        writeln!(f, "{backtrace:?}")
    }
}

impl std::error::Error for Error {
    fn description(&self) -> &str {
        "decoding with a schema failed"
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) kind: ErrorKind,
    pub(crate) path: Vec<String>,
    pub(crate) bit_offset: Option<usize>,
    pub(crate) backtrace: Backtrace,
}

impl From<ErrorKind> for Inner {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
            bit_offset: None,
            backtrace: Backtrace::new_unresolved(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// A declared length or count reaches beyond the end of the input, in bits
    Truncated { needed: usize, remaining: usize },
    Malformed(Malformed),
    ConstraintViolation(Violation),
    UnknownChoice(ChoiceSelector),
    RecursionLimitExceeded { limit: usize },
    BudgetExhausted { limit: usize },
    /// Only surfaces from [`crate::decode::Decoder::decode_registered`]; inside a PDU an
    /// unregistered open type decodes as opaque bytes and is reported as a
    /// [`crate::tree::Notice`]
    UnregisteredOpenType(Discriminator),
    /// The schema refers to a type the table does not define, or references itself without end
    InvalidSchema(SchemaErrorKind),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Truncated { needed, remaining } => write!(
                f,
                "Input truncated, needed {needed} bits but only {remaining} remain"
            ),
            ErrorKind::Malformed(malformed) => write!(f, "Malformed encoding: {malformed}"),
            ErrorKind::ConstraintViolation(violation) => {
                write!(f, "Constraint violated: {violation}")
            }
            ErrorKind::UnknownChoice(ChoiceSelector::Tag(tag)) => {
                write!(f, "No choice alternative for tag {tag:?}")
            }
            ErrorKind::UnknownChoice(ChoiceSelector::Index {
                index,
                alternatives,
            }) => write!(
                f,
                "Choice index {index} outside of the {alternatives} known alternatives"
            ),
            ErrorKind::RecursionLimitExceeded { limit } => {
                write!(f, "Nesting exceeds the recursion limit of {limit}")
            }
            ErrorKind::BudgetExhausted { limit } => {
                write!(f, "Decoding exceeds the budget of {limit} elements")
            }
            ErrorKind::UnregisteredOpenType(discriminator) => {
                write!(f, "No type registered for {discriminator}")
            }
            ErrorKind::InvalidSchema(kind) => write!(f, "Schema rejected: {kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Malformed {
    UnexpectedTag { expected: Tag, got: Tag },
    /// An element of a SET matching none of its members
    UnexpectedElement(Tag),
    /// A high tag number form with a leading zero octet or exceeding `usize`
    InvalidTagNumber,
    /// A required field is neither present nor matched by the next element
    MissingField(String),
    DuplicateField(String),
    /// The encoding continues after the last field of a non-extensible type
    TrailingContent { bits: usize },
    /// A nested element claims more octets than its enclosing element holds
    EnvelopeOverrun { declared: usize, available: usize },
    ReservedLength,
    UnsupportedLengthSize(u8),
    IndefiniteLengthOnPrimitive,
    MissingEndOfContents,
    /// Primitive encoding where a constructed one is required, or vice versa
    UnexpectedConstruction { constructed: bool },
    InvalidLength { expected: usize, got: usize },
    EmptyInteger,
    InvalidUnusedBits(u8),
    InvalidObjectIdentifier,
    InvalidString { charset: Charset, index: usize },
    InvalidTime(String),
    InvalidFragment(u8),
}

impl Display for Malformed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Malformed::UnexpectedTag { expected, got } => {
                write!(f, "expected tag {expected:?} but got {got:?}")
            }
            Malformed::UnexpectedElement(tag) => {
                write!(f, "element with tag {tag:?} matches no member")
            }
            Malformed::InvalidTagNumber => write!(f, "invalid high tag number form"),
            Malformed::MissingField(name) => write!(f, "required field {name} is missing"),
            Malformed::DuplicateField(name) => write!(f, "field {name} occurs twice"),
            Malformed::TrailingContent { bits } => {
                write!(f, "{bits} bits of unexpected trailing content")
            }
            Malformed::EnvelopeOverrun {
                declared,
                available,
            } => write!(
                f,
                "element declares {declared} octets but its envelope holds {available}"
            ),
            Malformed::ReservedLength => write!(f, "reserved length octet 0xFF"),
            Malformed::UnsupportedLengthSize(octets) => {
                write!(f, "length encoded in {octets} octets is not supported")
            }
            Malformed::IndefiniteLengthOnPrimitive => {
                write!(f, "indefinite length on a primitive encoding")
            }
            Malformed::MissingEndOfContents => write!(f, "end-of-contents marker missing"),
            Malformed::UnexpectedConstruction { constructed: true } => {
                write!(f, "constructed encoding where a primitive one is required")
            }
            Malformed::UnexpectedConstruction { constructed: false } => {
                write!(f, "primitive encoding where a constructed one is required")
            }
            Malformed::InvalidLength { expected, got } => {
                write!(f, "expected {expected} content octets but got {got}")
            }
            Malformed::EmptyInteger => write!(f, "integer without content octets"),
            Malformed::InvalidUnusedBits(bits) => {
                write!(f, "invalid number of unused bits: {bits}")
            }
            Malformed::InvalidObjectIdentifier => write!(f, "invalid object identifier"),
            Malformed::InvalidString { charset, index } => {
                write!(f, "invalid character for {charset:?} at index {index}")
            }
            Malformed::InvalidTime(text) => write!(f, "invalid time value {text:?}"),
            Malformed::InvalidFragment(multiple) => {
                write!(f, "invalid length fragment multiplier {multiple}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    ValueNotInRange {
        value: i128,
        lower: Option<i128>,
        upper: Option<i128>,
    },
    SizeNotInRange {
        size: u64,
        lower: Option<u64>,
        upper: Option<u64>,
    },
    /// The content does not fit the widest integer this engine represents
    ValueExceedsMaxInt,
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn bound<T: Display>(value: &Option<T>, open: &str) -> String {
            value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| open.to_string())
        }
        match self {
            Violation::ValueNotInRange {
                value,
                lower,
                upper,
            } => write!(
                f,
                "value {value} is not within {}..{}",
                bound(lower, "MIN"),
                bound(upper, "MAX")
            ),
            Violation::SizeNotInRange { size, lower, upper } => write!(
                f,
                "size {size} is not within {}..{}",
                bound(lower, "MIN"),
                bound(upper, "MAX")
            ),
            Violation::ValueExceedsMaxInt => {
                write!(f, "value exceeds the maximum supported integer size")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceSelector {
    Tag(Tag),
    Index { index: u64, alternatives: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_located_keeps_innermost_offset() {
        let error = Error::truncated(8, 0)
            .located(24, "inner")
            .located(8, "outer");
        assert_eq!(Some(24), error.bit_offset());
        assert_eq!(Some(3), error.byte_offset());
        assert_eq!(&["outer".to_string(), "inner".to_string()], error.path());
    }

    #[test]
    fn test_shifted_moves_offset() {
        let error = Error::truncated(8, 0).located(8, "value").shifted(16);
        assert_eq!(Some(24), error.bit_offset());
    }

    #[test]
    fn test_display_mentions_path() {
        let error = Error::unknown_choice_index(5, 3).located(0, "pdu");
        let text = error.to_string();
        assert!(text.starts_with("Choice index 5 outside of the 3 known alternatives"));
        assert!(text.contains("in pdu"));
    }
}
