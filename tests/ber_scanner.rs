
use asn1dissect::io::ber::{BasicRead, BasicWrite, Identifier, Length, Octets};
use proptest::prelude::*;
use test_utils::*;

fn ber_error(schema: &Schema, data: &[u8]) -> Error {
    Decoder::new(Rule::Ber).decode(schema, data).unwrap_err()
}

#[test]
fn test_indefinite_length_sequence() {
    let schema = Composite::new("Outer")
        .field(Field::new(
            "inner",
            Composite::new("Inner")
                .field(Field::new("number", Schema::integer()))
                .into_sequence(),
        ))
        .field(Field::new("flag", Schema::boolean()))
        .into_sequence();
    #[rustfmt::skip]
    let data = [
        0x30, 0x80,
        0x30, 0x80, 0x02, 0x01, 0x2A, 0x00, 0x00,
        0x01, 0x01, 0xFF,
        0x00, 0x00,
    ];
    let tree = decode_ber(&schema, &data);
    assert_eq!(42, integer_at(&tree, "inner.number"));
    assert_eq!(Some(true), tree.find("flag").and_then(|n| n.value.as_bool()));
    assert_eq!(data.len() * 8, tree.bit_len);
}

#[test]
fn test_missing_end_of_contents_within_envelope() {
    let schema = Composite::new("Outer")
        .field(Field::new(
            "inner",
            Composite::new("Inner").into_sequence(),
        ))
        .into_sequence();
    // the marker follows, but beyond the enclosing element
    let error = ber_error(&schema, &[0x30, 0x04, 0x30, 0x80, 0x05, 0x00, 0x00, 0x00]);
    assert_eq!(
        &ErrorKind::Malformed(Malformed::MissingEndOfContents),
        error.kind()
    );
}

#[test]
fn test_length_errors() {
    assert_eq!(
        &ErrorKind::Malformed(Malformed::ReservedLength),
        ber_error(&Schema::octet_string(), &[0x04, 0xFF]).kind()
    );
    assert_eq!(
        &ErrorKind::Malformed(Malformed::IndefiniteLengthOnPrimitive),
        ber_error(&Schema::octet_string(), &[0x04, 0x80, 0x00, 0x00]).kind()
    );
    assert_eq!(
        &ErrorKind::Malformed(Malformed::UnsupportedLengthSize(9)),
        ber_error(&Schema::octet_string(), &[0x04, 0x89, 0, 0, 0, 0, 0, 0, 0, 0, 1]).kind()
    );
    assert!(matches!(
        ber_error(&Schema::octet_string(), &[0x04, 0x05, 0x01]).kind(),
        ErrorKind::Truncated { .. }
    ));
}

#[test]
fn test_sequence_of_beyond_input() {
    let schema = Schema::sequence_of(Field::new("item", Schema::integer()));
    assert!(matches!(
        ber_error(&schema, &[0x30, 0x10, 0x02, 0x01, 0x01]).kind(),
        ErrorKind::Truncated { .. }
    ));
}

#[test]
fn test_error_reports_path_and_offset() {
    let schema = Composite::new("Record")
        .field(Field::new("id", Schema::integer()))
        .field(Field::new("name", Schema::string(Charset::Printable)))
        .into_sequence();
    let error = ber_error(
        &schema,
        &[0x30, 0x06, 0x02, 0x01, 0x01, 0x13, 0x01, b'@'],
    );
    assert_eq!(
        &ErrorKind::Malformed(Malformed::InvalidString {
            charset: Charset::Printable,
            index: 0,
        }),
        error.kind()
    );
    assert_eq!(&["Record".to_string(), "name".to_string()], error.path());
    assert_eq!(Some(5), error.byte_offset());
}

#[test]
fn test_high_tag_number_field() {
    let schema = Composite::new("Wide")
        .field(
            Field::new("value", Schema::integer())
                .tagged(Tagging::implicit(Tag::Application(1000))),
        )
        .into_sequence();
    let tree = decode_ber(&schema, &[0x30, 0x05, 0x5F, 0x87, 0x68, 0x01, 0x09]);
    assert_eq!(9, integer_at(&tree, "value"));
}

fn tags() -> impl Strategy<Value = Tag> {
    (0_u8..4, 0_usize..100_000).prop_map(|(class, number)| match class {
        0 => Tag::Universal(number),
        1 => Tag::Application(number),
        2 => Tag::ContextSpecific(number),
        _ => Tag::Private(number),
    })
}

proptest! {
    #[test]
    fn prop_identifier_and_length_are_read_back(
        tag in tags(),
        constructed in any::<bool>(),
        length in 0_usize..(1 << 40),
    ) {
        let identifier = Identifier { tag, constructed };
        let mut buffer = Vec::new();
        buffer.write_identifier(identifier).unwrap();
        buffer.write_length(Length::Definite(length)).unwrap();

        let mut octets = Octets::new(&buffer);
        prop_assert_eq!(Some(identifier), octets.peek_identifier().unwrap());
        prop_assert_eq!(identifier, octets.read_identifier().unwrap());
        prop_assert_eq!(Length::Definite(length), octets.read_length().unwrap());
        prop_assert!(octets.is_empty());
    }

    #[test]
    fn prop_integer_is_decoded(value in any::<i64>()) {
        let mut content = Vec::new();
        content.write_integer(i128::from(value)).unwrap();
        let mut data = Vec::new();
        data.write_element(Identifier::primitive(Tag::DEFAULT_INTEGER), &content).unwrap();

        let tree = decode_ber(&Schema::integer(), &data);
        prop_assert_eq!(Value::Integer(i128::from(value)), tree.value);
    }

    #[test]
    fn prop_scanner_never_panics(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut octets = Octets::new(&data);
        while !octets.is_empty() {
            if octets.skip_element().is_err() {
                break;
            }
        }
    }
}
