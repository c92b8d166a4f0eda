use super::*;

impl BasicWrite for Vec<u8> {
    fn write_identifier(&mut self, identifier: Identifier) -> Result<(), Error> {
        let mut octet = identifier.tag.class_bits() << CLASS_BITS_SHIFT;
        if identifier.constructed {
            octet |= CONSTRUCTED_BIT;
        }
        let number = identifier.tag.value();
        if number < usize::from(TAG_NUMBER_HIGH_FORM) {
            self.push(octet | number as u8);
        } else {
            // 8.1.2.4: base 128, most significant group first, all but the last with bit 8 set
            self.push(octet | TAG_NUMBER_HIGH_FORM);
            let groups = (usize::BITS - number.leading_zeros() + 6) / 7;
            for group in (0..groups).rev() {
                let mut byte = ((number >> (group * 7)) & 0x7F) as u8;
                if group > 0 {
                    byte |= CONTINUATION_BIT;
                }
                self.push(byte);
            }
        }
        Ok(())
    }

    fn write_length(&mut self, length: Length) -> Result<(), Error> {
        match length {
            Length::Indefinite => self.push(LENGTH_INDEFINITE),
            Length::Definite(length) if length <= LENGTH_SHORT_MAX_VALUE => {
                // short form 8.1.3.4
                self.push(length as u8)
            }
            Length::Definite(length) => {
                // long form 8.1.3.5
                let bytes = length.to_be_bytes();
                let leading_zero_bytes = (length.leading_zeros() / u8::BITS) as usize;
                self.push(LENGTH_BIT_MASK | (bytes.len() - leading_zero_bytes) as u8);
                self.extend_from_slice(&bytes[leading_zero_bytes..]);
            }
        }
        Ok(())
    }

    fn write_integer(&mut self, value: i128) -> Result<(), Error> {
        let bytes = value.to_be_bytes();
        let mut offset = 0;
        // 8.3.2: the first nine bits shall not all be ones or all be zeros
        while offset < bytes.len() - 1 {
            let redundant = match bytes[offset] {
                0x00 => bytes[offset + 1] & 0x80 == 0,
                0xFF => bytes[offset + 1] & 0x80 != 0,
                _ => false,
            };
            if !redundant {
                break;
            }
            offset += 1;
        }
        self.extend_from_slice(&bytes[offset..]);
        Ok(())
    }

    fn write_element(&mut self, identifier: Identifier, content: &[u8]) -> Result<(), Error> {
        self.write_identifier(identifier)?;
        self.write_length(Length::Definite(content.len()))?;
        self.extend_from_slice(content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ber::Octets;

    #[test]
    fn test_integer_is_minimal() {
        for (value, expected) in [
            (0_i128, &[0x00][..]),
            (127, &[0x7F][..]),
            (128, &[0x00, 0x80][..]),
            (256, &[0x01, 0x00][..]),
            (-1, &[0xFF][..]),
            (-128, &[0x80][..]),
            (-129, &[0xFF, 0x7F][..]),
        ] {
            let mut buffer = Vec::<u8>::new();
            buffer.write_integer(value).unwrap();
            assert_eq!(expected, &buffer[..], "value {}", value);
        }
    }

    #[test]
    fn test_length_forms() {
        let mut buffer = Vec::<u8>::new();
        buffer.write_length(Length::Definite(5)).unwrap();
        buffer.write_length(Length::Definite(256)).unwrap();
        buffer.write_length(Length::Indefinite).unwrap();
        assert_eq!(&[0x05, 0x82, 0x01, 0x00, 0x80], &buffer[..]);
    }

    #[test]
    fn test_high_tag_number_is_read_back() {
        let mut buffer = Vec::<u8>::new();
        buffer
            .write_identifier(Identifier::primitive(Tag::ContextSpecific(1000)))
            .unwrap();
        assert_eq!(&[0x9F, 0x87, 0x68], &buffer[..]);
        assert_eq!(
            Identifier::primitive(Tag::ContextSpecific(1000)),
            Octets::new(&buffer).read_identifier().unwrap()
        );
    }
}
