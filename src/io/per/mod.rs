//! This module defines traits to decode and encode basic ASN.1 primitives of the packed
//! encoding rules. The idea is to provide all building blocks to composite the more complex types
//! on top of the traits without caring about how the bits are stored.
//!
//! Only the UNALIGNED variant is provided, see [`unaligned`].

pub mod unaligned;

use crate::err::Error;

pub const BYTE_LEN: usize = 8;

/// ITU-T X.691 | ISO/IEC 8825-2:2015, chapter 11.9.3.8, fragments carry multiples of 16K items
pub const FRAGMENT_SIZE: u64 = 16 * 1024;

/// ITU-T X.691 | ISO/IEC 8825-2:2015, chapter 11.9.4.1, lengths with an upper bound below 64K
/// are encoded as constrained whole numbers
pub const CONSTRAINED_LENGTH_LIMIT: u64 = 64 * 1024;

/// Number of bits a constrained whole number with the given range (`upper - lower`) occupies,
/// ITU-T X.691 | ISO/IEC 8825-2:2015, chapter 11.5.7.1
///
/// ```rust
/// use asn1dissect::io::per::bits_for_range;
/// assert_eq!(0, bits_for_range(0));
/// assert_eq!(1, bits_for_range(1));
/// assert_eq!(4, bits_for_range(9));
/// assert_eq!(8, bits_for_range(255));
/// assert_eq!(9, bits_for_range(256));
/// ```
pub const fn bits_for_range(range: u128) -> usize {
    (u128::BITS - range.leading_zeros()) as usize
}

/// A decoded length determinant. A fragmented determinant announces that another determinant
/// follows the items it counts, ITU-T X.691 | ISO/IEC 8825-2:2015, chapter 11.9.3.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Determinant {
    pub count: u64,
    pub fragmented: bool,
}

/// The index of a CHOICE alternative or ENUMERATED value. Root and extension additions are
/// numbered independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Root(u64),
    Extension(u64),
}

pub trait PackedRead {
    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 12, the boolean type is represented
    /// through a single bit, where 1 represents `true` and 0 represents `false`.
    fn read_boolean(&mut self) -> Result<bool, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.3, an unsigned big-endian
    /// number in the given amount of bits
    fn read_non_negative_binary_integer(&mut self, bit_len: usize) -> Result<u128, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.4, value that can be a negative,
    /// zero or positive whole number and has no lower- or upper-bound constraints
    fn read_2s_compliment_binary_integer(&mut self, bit_len: usize) -> Result<i128, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.7, a constrained whole number
    /// is a whole number with a lower- and upper-bound constrained
    fn read_constrained_whole_number(
        &mut self,
        lower_bound: i128,
        upper_bound: i128,
    ) -> Result<i128, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.18, an unconstrained integer
    /// where small numbers appear more often the large numbers.
    fn read_normally_small_non_negative_whole_number(&mut self) -> Result<u64, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.24, a semi constrained whole
    /// number is a whole number with a lower-bound constrained but no upper-bound constrained
    fn read_semi_constrained_whole_number(&mut self, lower_bound: i128) -> Result<i128, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.27, an unconstrained whole
    /// number is a whole number without any bound
    fn read_unconstrained_whole_number(&mut self) -> Result<i128, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.19, a number without constrains
    /// and is likely to be small. It is used where small lengths are more likely than large values.
    fn read_normally_small_length(&mut self) -> Result<u64, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.17, the length determinant is
    /// a number used to count bits, octets (bytes), characters or components
    fn read_length_determinant(
        &mut self,
        lower_bound: Option<u64>,
        upper_bound: Option<u64>,
    ) -> Result<Determinant, Error>;

    /// Returns the content and the number of bits in it
    fn read_bitstring(
        &mut self,
        lower_bound_size: Option<u64>,
        upper_bound_size: Option<u64>,
        extensible: bool,
    ) -> Result<(Vec<u8>, u64), Error>;

    fn read_octetstring(
        &mut self,
        lower_bound_size: Option<u64>,
        upper_bound_size: Option<u64>,
        extensible: bool,
    ) -> Result<Vec<u8>, Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.2, the octets of the complete
    /// encoding of a type that is not statically known
    fn read_open_type(&mut self) -> Result<Vec<u8>, Error> {
        self.read_octetstring(None, None, false)
    }

    fn read_choice_index(&mut self, std_variants: u64, extensible: bool)
        -> Result<Selection, Error>;

    fn read_enumeration_index(
        &mut self,
        std_variants: u64,
        extensible: bool,
    ) -> Result<Selection, Error>;
}

pub trait PackedWrite {
    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 12, the boolean type is represented
    /// through a single bit, where 1 represents `true` and 0 represents `false`.
    fn write_boolean(&mut self, boolean: bool) -> Result<(), Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.3
    fn write_non_negative_binary_integer(&mut self, bit_len: usize, value: u128)
        -> Result<(), Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.4
    fn write_2s_compliment_binary_integer(&mut self, bit_len: usize, value: i128)
        -> Result<(), Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.7, a constrained whole number
    /// is a whole number with a lower- and upper-bound constrained
    fn write_constrained_whole_number(
        &mut self,
        lower_bound: i128,
        upper_bound: i128,
        value: i128,
    ) -> Result<(), Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.18, an unconstrained integer
    /// where small numbers appear more often the large numbers.
    fn write_normally_small_non_negative_whole_number(&mut self, value: u64) -> Result<(), Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.24
    fn write_semi_constrained_whole_number(
        &mut self,
        lower_bound: i128,
        value: i128,
    ) -> Result<(), Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.27
    fn write_unconstrained_whole_number(&mut self, value: i128) -> Result<(), Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.19
    fn write_normally_small_length(&mut self, value: u64) -> Result<(), Error>;

    /// According to ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 3.7.17. Lengths that require
    /// fragmentation are rejected, use the string writers for those.
    fn write_length_determinant(
        &mut self,
        lower_bound: Option<u64>,
        upper_bound: Option<u64>,
        length: u64,
    ) -> Result<(), Error>;

    fn write_bitstring(
        &mut self,
        lower_bound_size: Option<u64>,
        upper_bound_size: Option<u64>,
        extensible: bool,
        src: &[u8],
        bit_len: u64,
    ) -> Result<(), Error>;

    fn write_octetstring(
        &mut self,
        lower_bound_size: Option<u64>,
        upper_bound_size: Option<u64>,
        extensible: bool,
        src: &[u8],
    ) -> Result<(), Error>;

    fn write_open_type(&mut self, src: &[u8]) -> Result<(), Error> {
        self.write_octetstring(None, None, false, src)
    }

    fn write_choice_index(
        &mut self,
        std_variants: u64,
        extensible: bool,
        selection: Selection,
    ) -> Result<(), Error>;

    fn write_enumeration_index(
        &mut self,
        std_variants: u64,
        extensible: bool,
        selection: Selection,
    ) -> Result<(), Error>;
}
