use super::*;
use crate::err::Malformed;
use byteorder::{ByteOrder, NetworkEndian};

/// A cursor over BER encoded octets.
///
/// Positions are absolute within the complete buffer so nested cursors report offsets relative to
/// the start of the PDU. The `end` of a cursor is the envelope of the element it was created for:
/// a nested element that claims more content than the buffer holds is [`Error::truncated`], one
/// that fits the buffer but overruns its enclosing element is [`Malformed::EnvelopeOverrun`].
#[derive(Debug, Clone, Copy)]
pub struct Octets<'a> {
    data: &'a [u8],
    position: usize,
    end: usize,
}

/// A complete element as framed by its identifier and length
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub identifier: Identifier,
    /// Position of the first identifier octet
    pub offset: usize,
    pub content: Octets<'a>,
    pub indefinite: bool,
    /// Position after the last octet, including a terminating end-of-contents marker
    pub end: usize,
}

impl<'a> Element<'a> {
    /// The complete encoding including identifier and length octets
    #[inline]
    pub fn raw(&self) -> &'a [u8] {
        &self.content.data[self.offset..self.end]
    }
}

impl<'a> Octets<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            end: data.len(),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.position >= self.end
    }

    /// The not yet consumed octets of this envelope
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        &self.data[self.position..self.end]
    }

    fn ensure(&self, len: usize) -> Result<(), Error> {
        let available = self.end - self.position;
        if len <= available {
            Ok(())
        } else if self.position.saturating_add(len) > self.data.len() {
            Err(Error::truncated(
                len.saturating_mul(8),
                (self.data.len() - self.position) * 8,
            ))
        } else {
            Err(Error::malformed(Malformed::EnvelopeOverrun {
                declared: len,
                available,
            }))
        }
    }

    #[inline]
    pub fn read_octet(&mut self) -> Result<u8, Error> {
        self.ensure(1)?;
        let octet = self.data[self.position];
        self.position += 1;
        Ok(octet)
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        self.ensure(len)?;
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Reads the identifier and length octets and frames the content of the element. For the
    /// indefinite form, the content ends before the end-of-contents marker of the same nesting
    /// level, the marker itself is consumed.
    pub fn read_element(&mut self) -> Result<Element<'a>, Error> {
        let offset = self.position;
        let identifier = self.read_identifier()?;
        let length = self.read_length()?;
        let content_start = self.position;
        match length {
            Length::Definite(len) => {
                self.ensure(len)?;
                self.position += len;
                Ok(Element {
                    identifier,
                    offset,
                    content: Octets {
                        data: self.data,
                        position: content_start,
                        end: content_start + len,
                    },
                    indefinite: false,
                    end: self.position,
                })
            }
            Length::Indefinite => {
                if !identifier.constructed {
                    return Err(Error::malformed(Malformed::IndefiniteLengthOnPrimitive));
                }
                let content_end = self.end_of_contents(content_start)?;
                self.position = content_end + 2;
                Ok(Element {
                    identifier,
                    offset,
                    content: Octets {
                        data: self.data,
                        position: content_start,
                        end: content_end,
                    },
                    indefinite: true,
                    end: self.position,
                })
            }
        }
    }

    #[inline]
    pub fn skip_element(&mut self) -> Result<(), Error> {
        self.read_element().map(drop)
    }

    /// Locates the end-of-contents marker closing an indefinite length element whose content
    /// starts at `from`. Nested elements are skipped without recursion.
    fn end_of_contents(&self, from: usize) -> Result<usize, Error> {
        let mut cursor = Octets {
            data: self.data,
            position: from,
            end: self.end,
        };
        let mut open = 1_usize;
        loop {
            if cursor.is_empty() {
                return if cursor.end == cursor.data.len() {
                    Err(Error::truncated(16, 0))
                } else {
                    Err(Error::malformed(Malformed::MissingEndOfContents))
                };
            }
            let start = cursor.position;
            let identifier = cursor.read_identifier()?;
            let length = cursor.read_length()?;
            match length {
                Length::Definite(0) if identifier.is_end_of_contents() => {
                    open -= 1;
                    if open == 0 {
                        return Ok(start);
                    }
                }
                Length::Definite(len) if identifier.is_end_of_contents() => {
                    return Err(Error::malformed(Malformed::InvalidLength {
                        expected: 0,
                        got: len,
                    }));
                }
                Length::Definite(len) => {
                    cursor.ensure(len)?;
                    cursor.position += len;
                }
                Length::Indefinite if identifier.constructed => open += 1,
                Length::Indefinite => {
                    return Err(Error::malformed(Malformed::IndefiniteLengthOnPrimitive));
                }
            }
        }
    }
}

impl BasicRead for Octets<'_> {
    fn read_identifier(&mut self) -> Result<Identifier, Error> {
        let octet = self.read_octet()?;
        let class = octet >> CLASS_BITS_SHIFT;
        let constructed = octet & CONSTRUCTED_BIT != 0;
        let mut number = usize::from(octet & TAG_NUMBER_MASK);

        if octet & TAG_NUMBER_MASK == TAG_NUMBER_HIGH_FORM {
            number = 0;
            let mut first = true;
            loop {
                let octet = self.read_octet()?;
                // 8.1.2.4.2 c): bits 7 to 1 of the first subsequent octet shall not all be zero
                if (first && octet == CONTINUATION_BIT) || number > (usize::MAX >> 7) {
                    return Err(Error::malformed(Malformed::InvalidTagNumber));
                }
                first = false;
                number = (number << 7) | usize::from(octet & !CONTINUATION_BIT);
                if octet & CONTINUATION_BIT == 0 {
                    break;
                }
            }
        }

        Ok(Identifier {
            tag: Tag::from_class_bits(class, number),
            constructed,
        })
    }

    fn peek_identifier(&self) -> Result<Option<Identifier>, Error> {
        if self.is_empty() {
            Ok(None)
        } else {
            let mut copy = *self;
            copy.read_identifier().map(Some)
        }
    }

    fn read_length(&mut self) -> Result<Length, Error> {
        let octet = self.read_octet()?;
        if octet & LENGTH_BIT_MASK == 0 {
            // short form 8.1.3.4
            Ok(Length::Definite(usize::from(octet)))
        } else if octet == LENGTH_INDEFINITE {
            // 8.1.3.6
            Ok(Length::Indefinite)
        } else if octet == LENGTH_RESERVED {
            // 8.1.3.5 c)
            Err(Error::malformed(Malformed::ReservedLength))
        } else {
            // long form 8.1.3.5
            let octets = octet & !LENGTH_BIT_MASK;
            if usize::from(octets) > std::mem::size_of::<u64>() {
                return Err(Error::malformed(Malformed::UnsupportedLengthSize(octets)));
            }
            let bytes = self.read_slice(usize::from(octets))?;
            let length = NetworkEndian::read_uint(bytes, bytes.len());
            usize::try_from(length)
                .map(Length::Definite)
                .map_err(|_| Error::malformed(Malformed::UnsupportedLengthSize(octets)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::ErrorKind;

    #[test]
    fn test_short_definite_length_consumes_header_and_content() {
        let data = [0x04, 0x05, 1, 2, 3, 4, 5, 0xFF];
        let mut octets = Octets::new(&data[1..]);
        assert_eq!(Length::Definite(5), octets.read_length().unwrap());
        let content = octets.read_slice(5).unwrap();
        assert_eq!(&[1, 2, 3, 4, 5], content);
        assert_eq!(6, octets.position());
    }

    #[test]
    fn test_long_form_length() {
        let mut data = vec![0x04, 0x82, 0x01, 0x00];
        data.extend(std::iter::repeat(0xAB).take(256));
        let mut octets = Octets::new(&data);
        let element = octets.read_element().unwrap();
        assert_eq!(256, element.content.remaining());
        assert_eq!(260, octets.position());
        assert!(octets.is_empty());
    }

    #[test]
    fn test_reserved_length_is_malformed() {
        let mut octets = Octets::new(&[0xFF]);
        assert_eq!(
            &ErrorKind::Malformed(Malformed::ReservedLength),
            octets.read_length().unwrap_err().kind()
        );
    }

    #[test]
    fn test_too_many_length_octets() {
        let mut octets = Octets::new(&[0x89, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(
            &ErrorKind::Malformed(Malformed::UnsupportedLengthSize(9)),
            octets.read_length().unwrap_err().kind()
        );
    }

    #[test]
    fn test_high_tag_number() {
        // [APPLICATION 201] constructed
        let mut octets = Octets::new(&[0x7F, 0x81, 0x49, 0x00]);
        let identifier = octets.read_identifier().unwrap();
        assert_eq!(Tag::Application(201), identifier.tag);
        assert!(identifier.constructed);
        assert_eq!(3, octets.position());
    }

    #[test]
    fn test_high_tag_number_with_leading_zero() {
        let mut octets = Octets::new(&[0x9F, 0x80, 0x01]);
        assert_eq!(
            &ErrorKind::Malformed(Malformed::InvalidTagNumber),
            octets.read_identifier().unwrap_err().kind()
        );
    }

    #[test]
    fn test_declared_length_beyond_buffer_is_truncated() {
        let mut octets = Octets::new(&[0x04, 0x05, 1, 2]);
        assert_eq!(
            &ErrorKind::Truncated {
                needed: 40,
                remaining: 16
            },
            octets.read_element().unwrap_err().kind()
        );
    }

    #[test]
    fn test_declared_length_beyond_envelope_is_malformed() {
        // SEQUENCE of 3 octets holding an OCTET STRING claiming 4
        let data = [0x30, 0x03, 0x04, 0x04, 1, 2, 3, 4];
        let mut octets = Octets::new(&data);
        let mut sequence = octets.read_element().unwrap().content;
        assert_eq!(
            &ErrorKind::Malformed(Malformed::EnvelopeOverrun {
                declared: 4,
                available: 1
            }),
            sequence.read_element().unwrap_err().kind()
        );
    }

    #[test]
    fn test_indefinite_length_with_nested_indefinite() {
        let data = [
            0x30, 0x80, // SEQUENCE, indefinite
            0x30, 0x80, // SEQUENCE, indefinite
            0x02, 0x01, 0x07, // INTEGER 7
            0x00, 0x00, // end of inner
            0x01, 0x01, 0xFF, // BOOLEAN true
            0x00, 0x00, // end of outer
            0x05, 0x00, // NULL after the element
        ];
        let mut octets = Octets::new(&data);
        let element = octets.read_element().unwrap();
        assert!(element.indefinite);
        assert_eq!(10, element.content.remaining());
        assert_eq!(14, octets.position());
        assert_eq!(&data[..14], element.raw());

        let mut content = element.content;
        let inner = content.read_element().unwrap();
        assert_eq!(3, inner.content.remaining());
        assert_eq!(
            Some(Identifier::primitive(Tag::DEFAULT_BOOLEAN)),
            content.peek_identifier().unwrap()
        );
    }

    #[test]
    fn test_indefinite_length_on_primitive() {
        let mut octets = Octets::new(&[0x04, 0x80, 0x00, 0x00]);
        assert_eq!(
            &ErrorKind::Malformed(Malformed::IndefiniteLengthOnPrimitive),
            octets.read_element().unwrap_err().kind()
        );
    }

    #[test]
    fn test_missing_end_of_contents() {
        // the outer definite envelope ends before the inner indefinite element is closed
        let data = [0x30, 0x04, 0x30, 0x80, 0x05, 0x00, 0x00, 0x00];
        let mut octets = Octets::new(&data);
        let mut outer = octets.read_element().unwrap().content;
        assert_eq!(
            &ErrorKind::Malformed(Malformed::MissingEndOfContents),
            outer.read_element().unwrap_err().kind()
        );

        let mut truncated = Octets::new(&[0x30, 0x80, 0x05, 0x00]);
        assert!(matches!(
            truncated.read_element().unwrap_err().kind(),
            ErrorKind::Truncated { .. }
        ));
    }
}
