//! This module contains the traits to read and write the octet level building blocks of the basic
//! encoding family (BER, CER, DER): identifiers, lengths and the element framing.

#![allow(clippy::unusual_byte_groupings)]

mod octets;
mod write;

pub use octets::{Element, Octets};

use crate::err::Error;
use crate::model::Tag;

pub(crate) const CLASS_BITS_SHIFT: u8 = 6;
pub(crate) const CONSTRUCTED_BIT: u8 = 0b_00_1_00000;
pub(crate) const TAG_NUMBER_MASK: u8 = 0b_00_0_11111;
/// ITU-T X.690, 8.1.2.4: tag numbers of 31 and above follow in subsequent octets
pub(crate) const TAG_NUMBER_HIGH_FORM: u8 = 0b_00_0_11111;
pub(crate) const CONTINUATION_BIT: u8 = 0b1_0000000;

pub(crate) const LENGTH_SHORT_MAX_VALUE: usize = 127;
pub(crate) const LENGTH_BIT_MASK: u8 = 0b1_0000000;
pub(crate) const LENGTH_INDEFINITE: u8 = 0b1_0000000;
pub(crate) const LENGTH_RESERVED: u8 = 0b1_1111111;

/// The identifier octets of an element, ITU-T X.690 8.1.2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub tag: Tag,
    pub constructed: bool,
}

impl Identifier {
    pub const fn primitive(tag: Tag) -> Self {
        Self {
            tag,
            constructed: false,
        }
    }

    pub const fn constructed(tag: Tag) -> Self {
        Self {
            tag,
            constructed: true,
        }
    }

    /// The end-of-contents marker is encoded as an identifier of all zeros with a zero length
    #[inline]
    pub fn is_end_of_contents(&self) -> bool {
        self.tag == Tag::END_OF_CONTENTS && !self.constructed
    }
}

/// The length octets of an element, ITU-T X.690 8.1.3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(usize),
    /// Content is terminated by an end-of-contents marker, constructed encodings only
    Indefinite,
}

/// According to ITU-T X.690
pub trait BasicRead {
    /// According to ITU-T X.690, chapter 8.1.2, an identifier octet contains the class, the
    /// primitive/constructed flag and the number of the type. Numbers of 31 and above are encoded
    /// in base 128 in subsequent octets.
    fn read_identifier(&mut self) -> Result<Identifier, Error>;

    /// Reads the next identifier without consuming it, `None` at the end of the content
    fn peek_identifier(&self) -> Result<Option<Identifier>, Error>;

    /// According to ITU-T X.690, chapter 8.1.3, the length is encoded in at least one byte, in
    /// either the short (8.1.3.4), long (8.1.3.5) or indefinite (8.1.3.6) form
    fn read_length(&mut self) -> Result<Length, Error>;
}

/// According to ITU-T X.690
pub trait BasicWrite {
    /// According to ITU-T X.690, chapter 8.1.2, an identifier octet contains the class, the
    /// primitive/constructed flag and the number of the type.
    fn write_identifier(&mut self, identifier: Identifier) -> Result<(), Error>;

    /// According to ITU-T X.690, chapter 8.1.3, the length is encoded in the short form
    /// (8.1.3.4) if possible, in the minimal long form (8.1.3.5) otherwise
    fn write_length(&mut self, length: Length) -> Result<(), Error>;

    /// According to ITU-T X.690, chapter 8.3, the content octets of an integer are the minimal
    /// two's complement representation
    fn write_integer(&mut self, value: i128) -> Result<(), Error>;

    /// Writes a complete element with a definite length
    fn write_element(&mut self, identifier: Identifier, content: &[u8]) -> Result<(), Error>;
}
