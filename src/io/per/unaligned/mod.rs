//! The UNALIGNED variant of the packed encoding rules: no padding is inserted anywhere, every
//! field starts at the bit the previous one ended on.

use crate::err::{Error, ErrorKind, Malformed, Violation};
use crate::io::per::{
    bits_for_range, Determinant, PackedRead, PackedWrite, Selection, BYTE_LEN,
    CONSTRAINED_LENGTH_LIMIT, FRAGMENT_SIZE,
};
use byteorder::{ByteOrder, NetworkEndian};

pub mod buffer;
pub mod slice;

pub use buffer::BitBuffer;
pub use slice::Bits;

const INT_BYTES: usize = std::mem::size_of::<u128>();
const INT_BITS: usize = INT_BYTES * BYTE_LEN;

pub trait BitRead {
    fn read_bit(&mut self) -> Result<bool, Error>;

    fn read_bits_with_offset_len(
        &mut self,
        dst: &mut [u8],
        dst_bit_offset: usize,
        dst_bit_len: usize,
    ) -> Result<(), Error>;

    /// Bits consumed so far
    fn bit_position(&self) -> usize;

    fn remaining_bits(&self) -> usize;

    #[inline]
    fn read_bits(&mut self, dst: &mut [u8]) -> Result<(), Error> {
        let len = dst.len() * BYTE_LEN;
        self.read_bits_with_offset_len(dst, 0, len)
    }

    #[inline]
    fn read_bits_with_offset(
        &mut self,
        dst: &mut [u8],
        dst_bit_offset: usize,
    ) -> Result<(), Error> {
        let len = dst.len() * BYTE_LEN - dst_bit_offset;
        self.read_bits_with_offset_len(dst, dst_bit_offset, len)
    }

    #[inline]
    fn read_bits_with_len(&mut self, dst: &mut [u8], dst_bit_len: usize) -> Result<(), Error> {
        self.read_bits_with_offset_len(dst, 0, dst_bit_len)
    }

    /// Fails before anything is allocated if fewer bits remain
    #[inline]
    fn ensure_remaining(&self, bit_len: u64) -> Result<(), Error> {
        let remaining = self.remaining_bits();
        if bit_len > remaining as u64 {
            Err(Error::truncated(
                usize::try_from(bit_len).unwrap_or(usize::MAX),
                remaining,
            ))
        } else {
            Ok(())
        }
    }
}

pub trait BitWrite {
    fn write_bit(&mut self, bit: bool) -> Result<(), Error>;

    fn write_bits_with_offset_len(
        &mut self,
        src: &[u8],
        src_bit_offset: usize,
        src_bit_len: usize,
    ) -> Result<(), Error>;

    #[inline]
    fn write_bits(&mut self, src: &[u8]) -> Result<(), Error> {
        self.write_bits_with_offset_len(src, 0, src.len() * BYTE_LEN)
    }

    #[inline]
    fn write_bits_with_offset(&mut self, src: &[u8], src_bit_offset: usize) -> Result<(), Error> {
        self.write_bits_with_offset_len(src, src_bit_offset, src.len() * BYTE_LEN - src_bit_offset)
    }

    #[inline]
    fn write_bits_with_len(&mut self, src: &[u8], bit_len: usize) -> Result<(), Error> {
        self.write_bits_with_offset_len(src, 0, bit_len)
    }
}

/// Appends `bit_len` bits to `dst` which already holds `dst_bit_len` bits
fn read_appending<T: BitRead + ?Sized>(
    reader: &mut T,
    dst: &mut Vec<u8>,
    dst_bit_len: u64,
    bit_len: u64,
) -> Result<(), Error> {
    reader.ensure_remaining(bit_len)?;
    let total = dst_bit_len + bit_len;
    dst.resize(((total + 7) / 8) as usize, 0x00);
    reader.read_bits_with_offset_len(&mut dst[..], dst_bit_len as usize, bit_len as usize)
}

/// Number of octets the minimal unsigned representation of the value occupies, at least one
fn unsigned_octets(value: u128) -> usize {
    ((bits_for_range(value) + 7) / BYTE_LEN).max(1)
}

/// Number of octets the minimal two's complement representation of the value occupies
fn signed_octets(value: i128) -> usize {
    let significant = if value < 0 {
        INT_BITS - (!value).leading_zeros() as usize
    } else {
        INT_BITS - value.leading_zeros() as usize
    };
    (significant + 1 + 7) / BYTE_LEN
}

impl<T: BitRead> PackedRead for T {
    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 12
    #[inline]
    fn read_boolean(&mut self) -> Result<bool, Error> {
        self.read_bit()
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.3
    fn read_non_negative_binary_integer(&mut self, bit_len: usize) -> Result<u128, Error> {
        if bit_len > INT_BITS {
            return Err(ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into());
        }
        let mut bytes = [0u8; INT_BYTES];
        self.read_bits_with_offset(&mut bytes, INT_BITS - bit_len)?;
        Ok(NetworkEndian::read_u128(&bytes))
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.4
    fn read_2s_compliment_binary_integer(&mut self, bit_len: usize) -> Result<i128, Error> {
        if bit_len == 0 {
            return Ok(0);
        } else if bit_len > INT_BITS {
            return Err(ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into());
        }
        let mut bytes = [0u8; INT_BYTES];
        let bits_offset = INT_BITS - bit_len;
        self.read_bits_with_offset(&mut bytes, bits_offset)?;
        let byte_offset = bits_offset / BYTE_LEN;
        let bit_offset = bits_offset % BYTE_LEN;
        // check if the most significant bit is set (2er compliment -> negative number)
        if bytes[byte_offset] & (0x80 >> bit_offset) != 0 {
            // negative number, needs to be expanded before converting
            for byte in bytes.iter_mut().take(byte_offset) {
                *byte = 0xFF;
            }
            for i in 0..bit_offset {
                bytes[byte_offset] |= 0x80 >> i;
            }
        }
        Ok(NetworkEndian::read_i128(&bytes))
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.5
    fn read_constrained_whole_number(
        &mut self,
        lower_bound: i128,
        upper_bound: i128,
    ) -> Result<i128, Error> {
        let range = upper_bound
            .checked_sub(lower_bound)
            .filter(|range| *range >= 0)
            .ok_or_else(|| {
                Error::value_not_in_range(lower_bound, Some(lower_bound), Some(upper_bound))
            })? as u128;
        if range == 0 {
            return Ok(lower_bound);
        }
        let offset = self.read_non_negative_binary_integer(bits_for_range(range))?;
        // the width can represent values beyond the upper bound
        let value = lower_bound.wrapping_add(offset as i128);
        if offset > range {
            Err(Error::value_not_in_range(
                value,
                Some(lower_bound),
                Some(upper_bound),
            ))
        } else {
            Ok(value)
        }
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.6
    fn read_normally_small_non_negative_whole_number(&mut self) -> Result<u64, Error> {
        let greater_or_equal_to_64 = self.read_boolean()?;
        if greater_or_equal_to_64 {
            // 11.6.2
            let value = self.read_semi_constrained_whole_number(0)?;
            u64::try_from(value)
                .map_err(|_| ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into())
        } else {
            // 11.6.1
            Ok(self.read_non_negative_binary_integer(6)? as u64)
        }
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.7
    fn read_semi_constrained_whole_number(&mut self, lower_bound: i128) -> Result<i128, Error> {
        let determinant = self.read_length_determinant(None, None)?;
        if determinant.fragmented || determinant.count as usize > INT_BYTES {
            return Err(ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into());
        }
        let offset = self.read_non_negative_binary_integer(determinant.count as usize * BYTE_LEN)?;
        i128::try_from(offset)
            .ok()
            .and_then(|offset| lower_bound.checked_add(offset))
            .ok_or_else(|| ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into())
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.8
    fn read_unconstrained_whole_number(&mut self) -> Result<i128, Error> {
        let determinant = self.read_length_determinant(None, None)?;
        if determinant.count == 0 {
            Err(Error::malformed(Malformed::EmptyInteger))
        } else if determinant.fragmented || determinant.count as usize > INT_BYTES {
            Err(ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into())
        } else {
            self.read_2s_compliment_binary_integer(determinant.count as usize * BYTE_LEN)
        }
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.9.3.4
    fn read_normally_small_length(&mut self) -> Result<u64, Error> {
        if self.read_bit()? {
            Ok(self.read_length_determinant(None, None)?.count)
        } else {
            Ok(self.read_non_negative_binary_integer(6)? as u64 + 1)
        }
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 11.9.4
    fn read_length_determinant(
        &mut self,
        lower_bound: Option<u64>,
        upper_bound: Option<u64>,
    ) -> Result<Determinant, Error> {
        match upper_bound {
            Some(upper) if upper < CONSTRAINED_LENGTH_LIMIT => {
                // 11.9.4.1 -> 11.9.3.3, a fixed length is not encoded at all
                let lower = lower_bound.unwrap_or(0);
                if lower > upper {
                    return Err(Error::size_not_in_range(lower, lower_bound, upper_bound));
                }
                let range = upper - lower;
                let offset = self.read_non_negative_binary_integer(bits_for_range(u128::from(range)))?
                    as u64;
                if offset > range {
                    Err(Error::size_not_in_range(
                        lower + offset,
                        lower_bound,
                        upper_bound,
                    ))
                } else {
                    Ok(Determinant {
                        count: lower + offset,
                        fragmented: false,
                    })
                }
            }
            _ => {
                // 11.9.4.2 -> 11.9.3.5, the length itself and not its distance to the lower bound
                if !self.read_bit()? {
                    // 11.9.3.6: less than or equal to 127
                    Ok(Determinant {
                        count: self.read_non_negative_binary_integer(7)? as u64,
                        fragmented: false,
                    })
                } else if !self.read_bit()? {
                    // 11.9.3.7: greater than 127 and less than 16K
                    Ok(Determinant {
                        count: self.read_non_negative_binary_integer(14)? as u64,
                        fragmented: false,
                    })
                } else {
                    // 11.9.3.8: a fragment of 1 to 4 times 16K, another determinant follows
                    let multiple = self.read_non_negative_binary_integer(6)? as u8;
                    if !(1..=4).contains(&multiple) {
                        return Err(Error::malformed(Malformed::InvalidFragment(multiple)));
                    }
                    Ok(Determinant {
                        count: FRAGMENT_SIZE * u64::from(multiple),
                        fragmented: true,
                    })
                }
            }
        }
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 16
    fn read_bitstring(
        &mut self,
        lower_bound_size: Option<u64>,
        upper_bound_size: Option<u64>,
        extensible: bool,
    ) -> Result<(Vec<u8>, u64), Error> {
        // 16.6
        let extended = extensible && self.read_bit()?;

        if !extended {
            match (lower_bound_size, upper_bound_size) {
                // 16.8
                (_, Some(0)) => return Ok((Vec::new(), 0)),
                // 16.9, 16.10
                (Some(lower), Some(upper)) if lower == upper && upper < CONSTRAINED_LENGTH_LIMIT => {
                    let mut buffer = Vec::new();
                    read_appending(self, &mut buffer, 0, upper)?;
                    return Ok((buffer, upper));
                }
                _ => {}
            }
        }

        // 16.11
        let (lower, upper) = if extended {
            (None, None)
        } else {
            (lower_bound_size, upper_bound_size)
        };
        let mut buffer = Vec::new();
        let mut bit_len = 0_u64;
        let mut determinant = self.read_length_determinant(lower, upper)?;
        loop {
            read_appending(self, &mut buffer, bit_len, determinant.count)?;
            bit_len += determinant.count;
            if !determinant.fragmented {
                break;
            }
            determinant = self.read_length_determinant(None, None)?;
        }

        ensure_size(bit_len, lower, upper)?;
        Ok((buffer, bit_len))
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 17
    fn read_octetstring(
        &mut self,
        lower_bound_size: Option<u64>,
        upper_bound_size: Option<u64>,
        extensible: bool,
    ) -> Result<Vec<u8>, Error> {
        // 17.3
        let extended = extensible && self.read_bit()?;

        if !extended {
            match (lower_bound_size, upper_bound_size) {
                // 17.5
                (_, Some(0)) => return Ok(Vec::new()),
                // 17.6, 17.7
                (Some(lower), Some(upper)) if lower == upper && upper < CONSTRAINED_LENGTH_LIMIT => {
                    let mut buffer = Vec::new();
                    read_appending(self, &mut buffer, 0, upper * BYTE_LEN as u64)?;
                    return Ok(buffer);
                }
                _ => {}
            }
        }

        // 17.8
        let (lower, upper) = if extended {
            (None, None)
        } else {
            (lower_bound_size, upper_bound_size)
        };
        let mut buffer = Vec::new();
        let mut determinant = self.read_length_determinant(lower, upper)?;
        loop {
            let bit_len = buffer.len() as u64 * BYTE_LEN as u64;
            read_appending(self, &mut buffer, bit_len, determinant.count * BYTE_LEN as u64)?;
            if !determinant.fragmented {
                break;
            }
            determinant = self.read_length_determinant(None, None)?;
        }

        ensure_size(buffer.len() as u64, lower, upper)?;
        Ok(buffer)
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 23
    fn read_choice_index(
        &mut self,
        std_variants: u64,
        extensible: bool,
    ) -> Result<Selection, Error> {
        if extensible && self.read_bit()? {
            // 23.8
            Ok(Selection::Extension(
                self.read_normally_small_non_negative_whole_number()?,
            ))
        } else {
            // 23.6, 23.7
            let range = std_variants.saturating_sub(1);
            let index = self.read_non_negative_binary_integer(bits_for_range(u128::from(range)))?
                as u64;
            if index >= std_variants {
                Err(Error::unknown_choice_index(index, std_variants))
            } else {
                Ok(Selection::Root(index))
            }
        }
    }

    /// ITU-TX.691 | ISO/IEC 8825-2:2015, chapter 14
    fn read_enumeration_index(
        &mut self,
        std_variants: u64,
        extensible: bool,
    ) -> Result<Selection, Error> {
        if extensible && self.read_bit()? {
            // 14.3
            Ok(Selection::Extension(
                self.read_normally_small_non_negative_whole_number()?,
            ))
        } else {
            // 14.2
            let range = std_variants.saturating_sub(1);
            let index = self.read_non_negative_binary_integer(bits_for_range(u128::from(range)))?
                as u64;
            if index >= std_variants {
                Err(Error::value_not_in_range(
                    i128::from(index),
                    Some(0),
                    Some(i128::from(range)),
                ))
            } else {
                Ok(Selection::Root(index))
            }
        }
    }
}

pub(crate) fn ensure_size(size: u64, lower: Option<u64>, upper: Option<u64>) -> Result<(), Error> {
    if lower.map(|lower| size < lower).unwrap_or(false)
        || upper.map(|upper| size > upper).unwrap_or(false)
    {
        Err(Error::size_not_in_range(size, lower, upper))
    } else {
        Ok(())
    }
}

impl<T: BitWrite> PackedWrite for T {
    #[inline]
    fn write_boolean(&mut self, boolean: bool) -> Result<(), Error> {
        self.write_bit(boolean)
    }

    fn write_non_negative_binary_integer(
        &mut self,
        bit_len: usize,
        value: u128,
    ) -> Result<(), Error> {
        if bit_len > INT_BITS || (bit_len < INT_BITS && value >> bit_len != 0) {
            return Err(ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into());
        }
        let mut bytes = [0u8; INT_BYTES];
        NetworkEndian::write_u128(&mut bytes, value);
        self.write_bits_with_offset(&bytes, INT_BITS - bit_len)
    }

    fn write_2s_compliment_binary_integer(
        &mut self,
        bit_len: usize,
        value: i128,
    ) -> Result<(), Error> {
        if bit_len > INT_BITS {
            return Err(ErrorKind::ConstraintViolation(Violation::ValueExceedsMaxInt).into());
        }
        let mut bytes = [0u8; INT_BYTES];
        NetworkEndian::write_i128(&mut bytes, value);
        self.write_bits_with_offset(&bytes, INT_BITS - bit_len)
    }

    fn write_constrained_whole_number(
        &mut self,
        lower_bound: i128,
        upper_bound: i128,
        value: i128,
    ) -> Result<(), Error> {
        if value < lower_bound || value > upper_bound {
            return Err(Error::value_not_in_range(
                value,
                Some(lower_bound),
                Some(upper_bound),
            ));
        }
        let range = (upper_bound - lower_bound) as u128;
        self.write_non_negative_binary_integer(
            bits_for_range(range),
            (value - lower_bound) as u128,
        )
    }

    fn write_normally_small_non_negative_whole_number(&mut self, value: u64) -> Result<(), Error> {
        if value < 64 {
            self.write_bit(false)?;
            self.write_non_negative_binary_integer(6, u128::from(value))
        } else {
            self.write_bit(true)?;
            self.write_semi_constrained_whole_number(0, i128::from(value))
        }
    }

    fn write_semi_constrained_whole_number(
        &mut self,
        lower_bound: i128,
        value: i128,
    ) -> Result<(), Error> {
        if value < lower_bound {
            return Err(Error::value_not_in_range(value, Some(lower_bound), None));
        }
        let offset = (value - lower_bound) as u128;
        let octets = unsigned_octets(offset);
        self.write_length_determinant(None, None, octets as u64)?;
        self.write_non_negative_binary_integer(octets * BYTE_LEN, offset)
    }

    fn write_unconstrained_whole_number(&mut self, value: i128) -> Result<(), Error> {
        let octets = signed_octets(value);
        self.write_length_determinant(None, None, octets as u64)?;
        self.write_2s_compliment_binary_integer(octets * BYTE_LEN, value)
    }

    fn write_normally_small_length(&mut self, value: u64) -> Result<(), Error> {
        if value == 0 {
            Err(Error::size_not_in_range(0, Some(1), None))
        } else if value <= 64 {
            self.write_bit(false)?;
            self.write_non_negative_binary_integer(6, u128::from(value - 1))
        } else {
            self.write_bit(true)?;
            self.write_length_determinant(None, None, value)
        }
    }

    fn write_length_determinant(
        &mut self,
        lower_bound: Option<u64>,
        upper_bound: Option<u64>,
        length: u64,
    ) -> Result<(), Error> {
        match upper_bound {
            Some(upper) if upper < CONSTRAINED_LENGTH_LIMIT => {
                let lower = lower_bound.unwrap_or(0);
                if length < lower || length > upper {
                    return Err(Error::size_not_in_range(length, lower_bound, upper_bound));
                }
                self.write_non_negative_binary_integer(
                    bits_for_range(u128::from(upper - lower)),
                    u128::from(length - lower),
                )
            }
            _ if length <= 127 => {
                self.write_bit(false)?;
                self.write_non_negative_binary_integer(7, u128::from(length))
            }
            _ if length < FRAGMENT_SIZE => {
                self.write_bit(true)?;
                self.write_bit(false)?;
                self.write_non_negative_binary_integer(14, u128::from(length))
            }
            _ => Err(Error::size_not_in_range(
                length,
                None,
                Some(FRAGMENT_SIZE - 1),
            )),
        }
    }

    fn write_bitstring(
        &mut self,
        lower_bound_size: Option<u64>,
        upper_bound_size: Option<u64>,
        extensible: bool,
        src: &[u8],
        bit_len: u64,
    ) -> Result<(), Error> {
        let within = lower_bound_size.map(|lower| bit_len >= lower).unwrap_or(true)
            && upper_bound_size.map(|upper| bit_len <= upper).unwrap_or(true);
        if extensible {
            self.write_bit(!within)?;
        } else if !within {
            return Err(Error::size_not_in_range(
                bit_len,
                lower_bound_size,
                upper_bound_size,
            ));
        }
        let (lower, upper) = if within {
            (lower_bound_size, upper_bound_size)
        } else {
            (None, None)
        };
        match (lower, upper) {
            (_, Some(0)) => Ok(()),
            (Some(lower), Some(upper)) if lower == upper && upper < CONSTRAINED_LENGTH_LIMIT => {
                self.write_bits_with_len(src, bit_len as usize)
            }
            (lower, Some(upper)) if upper < CONSTRAINED_LENGTH_LIMIT => {
                self.write_length_determinant(lower, Some(upper), bit_len)?;
                self.write_bits_with_len(src, bit_len as usize)
            }
            _ => write_fragmented(self, src, bit_len, 1),
        }
    }

    fn write_octetstring(
        &mut self,
        lower_bound_size: Option<u64>,
        upper_bound_size: Option<u64>,
        extensible: bool,
        src: &[u8],
    ) -> Result<(), Error> {
        let len = src.len() as u64;
        let within = lower_bound_size.map(|lower| len >= lower).unwrap_or(true)
            && upper_bound_size.map(|upper| len <= upper).unwrap_or(true);
        if extensible {
            self.write_bit(!within)?;
        } else if !within {
            return Err(Error::size_not_in_range(
                len,
                lower_bound_size,
                upper_bound_size,
            ));
        }
        let (lower, upper) = if within {
            (lower_bound_size, upper_bound_size)
        } else {
            (None, None)
        };
        match (lower, upper) {
            (_, Some(0)) => Ok(()),
            (Some(lower), Some(upper)) if lower == upper && upper < CONSTRAINED_LENGTH_LIMIT => {
                self.write_bits(src)
            }
            (lower, Some(upper)) if upper < CONSTRAINED_LENGTH_LIMIT => {
                self.write_length_determinant(lower, Some(upper), len)?;
                self.write_bits(src)
            }
            _ => write_fragmented(self, src, len, BYTE_LEN as u64),
        }
    }

    fn write_choice_index(
        &mut self,
        std_variants: u64,
        extensible: bool,
        selection: Selection,
    ) -> Result<(), Error> {
        write_index(self, std_variants, extensible, selection)
    }

    fn write_enumeration_index(
        &mut self,
        std_variants: u64,
        extensible: bool,
        selection: Selection,
    ) -> Result<(), Error> {
        write_index(self, std_variants, extensible, selection)
    }
}

fn write_index<T: BitWrite>(
    writer: &mut T,
    std_variants: u64,
    extensible: bool,
    selection: Selection,
) -> Result<(), Error> {
    match selection {
        Selection::Root(index) => {
            if index >= std_variants {
                return Err(Error::unknown_choice_index(index, std_variants));
            }
            if extensible {
                writer.write_bit(false)?;
            }
            let range = std_variants.saturating_sub(1);
            writer.write_non_negative_binary_integer(
                bits_for_range(u128::from(range)),
                u128::from(index),
            )
        }
        Selection::Extension(index) if extensible => {
            writer.write_bit(true)?;
            writer.write_normally_small_non_negative_whole_number(index)
        }
        Selection::Extension(index) => Err(Error::unknown_choice_index(index, std_variants)),
    }
}

/// 11.9.3.8: writes `count` items of `item_bits` bits each in fragments of up to 64K items,
/// followed by a final (possibly empty) unfragmented part
fn write_fragmented<T: BitWrite>(
    writer: &mut T,
    src: &[u8],
    count: u64,
    item_bits: u64,
) -> Result<(), Error> {
    let mut written = 0_u64;
    loop {
        let remaining = count - written;
        let (items, fragmented) = if remaining >= FRAGMENT_SIZE {
            let multiple = (remaining / FRAGMENT_SIZE).min(4);
            writer.write_bit(true)?;
            writer.write_bit(true)?;
            writer.write_non_negative_binary_integer(6, u128::from(multiple))?;
            (multiple * FRAGMENT_SIZE, true)
        } else {
            writer.write_length_determinant(None, None, remaining)?;
            (remaining, false)
        };
        writer.write_bits_with_offset_len(
            src,
            (written * item_bits) as usize,
            (items * item_bits) as usize,
        )?;
        written += items;
        if !fragmented {
            return Ok(());
        }
    }
}
