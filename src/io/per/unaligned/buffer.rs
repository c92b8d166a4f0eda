use super::slice::{bit_string_copy_bulked, Bits};
use super::BitWrite;
use crate::err::Error;
use crate::io::per::BYTE_LEN;

/// A growable bit sink for unaligned PER encodings
#[derive(Debug, Default, Clone)]
pub struct BitBuffer {
    buffer: Vec<u8>,
    write_position: usize,
}

impl BitBuffer {
    pub fn with_capacity(byte_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(byte_len),
            write_position: 0,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.write_position = 0;
    }

    pub fn content(&self) -> &[u8] {
        &self.buffer[..]
    }

    pub fn bit_len(&self) -> usize {
        self.write_position
    }

    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    /// The written octets, the last one padded with zero bits
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Reads back exactly the bits written so far
    pub fn reader(&self) -> Bits<'_> {
        Bits::with_bit_len(&self.buffer[..], self.write_position)
    }

    fn ensure_can_write_additional_bits(&mut self, bit_len: usize) {
        let bytes = (self.write_position + bit_len + BYTE_LEN - 1) / BYTE_LEN;
        if bytes > self.buffer.len() {
            self.buffer.resize(bytes, 0x00);
        }
    }
}

impl BitWrite for BitBuffer {
    #[inline]
    fn write_bit(&mut self, bit: bool) -> Result<(), Error> {
        self.ensure_can_write_additional_bits(1);
        let mask = 0x80 >> (self.write_position % BYTE_LEN);
        if bit {
            self.buffer[self.write_position / BYTE_LEN] |= mask;
        } else {
            self.buffer[self.write_position / BYTE_LEN] &= !mask;
        }
        self.write_position += 1;
        Ok(())
    }

    #[inline]
    fn write_bits_with_offset_len(
        &mut self,
        src: &[u8],
        src_bit_offset: usize,
        src_bit_len: usize,
    ) -> Result<(), Error> {
        self.ensure_can_write_additional_bits(src_bit_len);
        bit_string_copy_bulked(
            src,
            src_bit_offset,
            &mut self.buffer[..],
            self.write_position,
            src_bit_len,
        )?;
        self.write_position += src_bit_len;
        Ok(())
    }
}
