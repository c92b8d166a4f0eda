use super::BitRead;
use crate::err::Error;
use crate::io::per::BYTE_LEN;

/// A read cursor over an unaligned PER encoding, limited to `bit_len` bits of `data`
#[derive(Debug, Clone, Copy)]
pub struct Bits<'a> {
    data: &'a [u8],
    position: usize,
    bit_len: usize,
}

impl<'a> Bits<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_bit_len(data, data.len() * BYTE_LEN)
    }

    /// Trailing bits of the last octet beyond `bit_len` are not read
    pub fn with_bit_len(data: &'a [u8], bit_len: usize) -> Self {
        Self {
            data,
            position: 0,
            bit_len: bit_len.min(data.len() * BYTE_LEN),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.position >= self.bit_len
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

impl BitRead for Bits<'_> {
    #[inline]
    fn read_bit(&mut self) -> Result<bool, Error> {
        if self.position >= self.bit_len {
            return Err(Error::truncated(1, 0));
        }
        let bit = self.data[self.position / BYTE_LEN] & (0x80 >> (self.position % BYTE_LEN)) != 0;
        self.position += 1;
        Ok(bit)
    }

    #[inline]
    fn read_bits_with_offset_len(
        &mut self,
        dst: &mut [u8],
        dst_bit_offset: usize,
        dst_bit_len: usize,
    ) -> Result<(), Error> {
        let remaining = self.remaining_bits();
        if dst_bit_len > remaining {
            return Err(Error::truncated(dst_bit_len, remaining));
        }
        bit_string_copy_bulked(self.data, self.position, dst, dst_bit_offset, dst_bit_len)?;
        self.position += dst_bit_len;
        Ok(())
    }

    #[inline]
    fn bit_position(&self) -> usize {
        self.position
    }

    #[inline]
    fn remaining_bits(&self) -> usize {
        self.bit_len.saturating_sub(self.position)
    }
}

#[inline]
fn ensure_bounds(
    src: &[u8],
    src_bit_position: usize,
    dst: &[u8],
    dst_bit_position: usize,
    len: usize,
) -> Result<(), Error> {
    let available = (dst.len() * BYTE_LEN).saturating_sub(dst_bit_position);
    if available < len {
        return Err(Error::truncated(len, available));
    }
    let available = (src.len() * BYTE_LEN).saturating_sub(src_bit_position);
    if available < len {
        return Err(Error::truncated(len, available));
    }
    Ok(())
}

#[inline]
fn bit_string_copy(
    src: &[u8],
    src_bit_position: usize,
    dst: &mut [u8],
    dst_bit_position: usize,
    len: usize,
) -> Result<(), Error> {
    ensure_bounds(src, src_bit_position, dst, dst_bit_position, len)?;
    for bit in 0..len {
        let dst_byte_pos = (dst_bit_position + bit) / BYTE_LEN;
        let dst_bit_pos = (dst_bit_position + bit) % BYTE_LEN;
        let dst_bit_pos = BYTE_LEN - dst_bit_pos - 1; // flip

        let bit = {
            let src_byte_pos = (src_bit_position + bit) / BYTE_LEN;
            let src_bit_pos = (src_bit_position + bit) % BYTE_LEN;
            let src_bit_pos = BYTE_LEN - src_bit_pos - 1; // flip

            src[src_byte_pos] & (0x01 << src_bit_pos) > 0
        };

        if bit {
            dst[dst_byte_pos] |= 0x01 << dst_bit_pos;
        } else {
            dst[dst_byte_pos] &= !(0x01 << dst_bit_pos);
        }
    }
    Ok(())
}

/// Copies `len` bits, octet wise once the source position is aligned
#[inline]
pub(crate) fn bit_string_copy_bulked(
    src: &[u8],
    src_bit_position: usize,
    dst: &mut [u8],
    dst_bit_position: usize,
    len: usize,
) -> Result<(), Error> {
    if len <= BYTE_LEN * 2 {
        return bit_string_copy(src, src_bit_position, dst, dst_bit_position, len);
    }

    ensure_bounds(src, src_bit_position, dst, dst_bit_position, len)?;

    let bits_till_full_byte_src = (BYTE_LEN - (src_bit_position % BYTE_LEN)) % BYTE_LEN;

    // align the source to a full byte
    if bits_till_full_byte_src != 0 {
        bit_string_copy(
            src,
            src_bit_position,
            dst,
            dst_bit_position,
            bits_till_full_byte_src,
        )?;
    }

    let src_bit_position = src_bit_position + bits_till_full_byte_src;
    let dst_bit_position = dst_bit_position + bits_till_full_byte_src;
    let len = len - bits_till_full_byte_src;

    let dst_byte_index = dst_bit_position / BYTE_LEN;
    let dst_byte_offset = dst_bit_position % BYTE_LEN;

    let src_byte_index = src_bit_position / BYTE_LEN;
    let len_in_bytes = len / BYTE_LEN;

    if dst_byte_offset == 0 {
        dst[dst_byte_index..dst_byte_index + len_in_bytes]
            .copy_from_slice(&src[src_byte_index..src_byte_index + len_in_bytes]);
    } else {
        for index in 0..len_in_bytes {
            let byte = src[index + src_byte_index];
            let half_left = byte >> dst_byte_offset;
            let half_right = byte << (BYTE_LEN - dst_byte_offset);

            // keep the bits left of the destination position
            dst[index + dst_byte_index] =
                (dst[index + dst_byte_index] & (0xFF << (BYTE_LEN - dst_byte_offset))) | half_left;

            let next = &mut dst[index + dst_byte_index + 1];
            *next = (*next & (0xFF >> dst_byte_offset)) | half_right;
        }
    }

    if len % BYTE_LEN == 0 {
        Ok(())
    } else {
        bit_string_copy(
            src,
            src_bit_position + (len_in_bytes * BYTE_LEN),
            dst,
            dst_bit_position + (len_in_bytes * BYTE_LEN),
            len % BYTE_LEN,
        )
    }
}
