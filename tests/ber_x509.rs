
use test_utils::*;

const ID_CE_BASIC_CONSTRAINTS: &str = "2.5.29.19";
const ID_CE_KEY_USAGE: &str = "2.5.29.15";
const ID_CE_SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";

/// `Extensions ::= SEQUENCE OF Extension` of PKIX1Explicit
fn extensions() -> Schema {
    Schema::sequence_of(Field::new(
        "Extension",
        Composite::new("Extension")
            .field(Field::new("extnID", Schema::object_identifier()).binds("extnID"))
            .field(Field::new("critical", Schema::boolean()).default(Value::Boolean(false)))
            .field(Field::new("extnValue", Schema::contained_open_type("extnID")))
            .into_sequence(),
    ))
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .bind_schema(
            ID_CE_BASIC_CONSTRAINTS,
            "basicConstraints",
            Composite::new("BasicConstraints")
                .field(Field::new("cA", Schema::boolean()).default(Value::Boolean(false)))
                .field(
                    Field::new("pathLenConstraint", IntegerType::semi_constrained(0)).optional(),
                )
                .into_sequence(),
        )
        .bind_schema(
            ID_CE_KEY_USAGE,
            "keyUsage",
            Schema::named_bit_string(NamedBits::new(vec![
                (0, "digitalSignature"),
                (1, "nonRepudiation"),
                (2, "keyEncipherment"),
                (3, "dataEncipherment"),
            ])),
        )
        .name(ID_CE_SUBJECT_KEY_IDENTIFIER, "subjectKeyIdentifier");
    registry
}

#[rustfmt::skip]
const EXTENSIONS: [u8; 46] = [
    0x30, 0x2C,
    // basicConstraints, critical, cA
    0x30, 0x0F, 0x06, 0x03, 0x55, 0x1D, 0x13, 0x01, 0x01, 0xFF,
    0x04, 0x05, 0x30, 0x03, 0x01, 0x01, 0xFF,
    // keyUsage, critical, digitalSignature and keyEncipherment
    0x30, 0x0E, 0x06, 0x03, 0x55, 0x1D, 0x0F, 0x01, 0x01, 0xFF,
    0x04, 0x04, 0x03, 0x02, 0x05, 0xA0,
    // subjectKeyIdentifier, not critical
    0x30, 0x09, 0x06, 0x03, 0x55, 0x1D, 0x0E, 0x04, 0x02, 0x04, 0x00,
];

#[test]
fn test_extensions_resolved_by_oid() {
    let registry = registry();
    let decoded = Decoder::new(Rule::Ber)
        .with_registry(&registry)
        .decode(&extensions(), &EXTENSIONS)
        .unwrap();
    assert_eq!(EXTENSIONS.len(), decoded.bytes_consumed());
    let tree = decoded.tree;
    assert_eq!(3, tree.children.len());

    let basic = tree.find("0").unwrap();
    assert_eq!(vec!["extnID", "critical", "extnValue"], labels(basic));
    assert_eq!(
        Value::Boolean(true),
        tree.find("0.extnValue.basicConstraints.cA").unwrap().value
    );
    assert!(tree
        .find("0.extnValue.basicConstraints.pathLenConstraint")
        .is_none());

    let key_usage = tree.find("1.extnValue.keyUsage").unwrap();
    assert_eq!(
        Value::Bits {
            data: vec![0xA0],
            bit_len: 3,
        },
        key_usage.value
    );
    let set = key_usage
        .children
        .iter()
        .filter(|bit| bit.value.as_bool() == Some(true))
        .map(|bit| bit.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(vec!["digitalSignature", "keyEncipherment"], set);
}

#[test]
fn test_unregistered_extension_is_kept_as_bytes() {
    let registry = registry();
    let tree = Decoder::new(Rule::Ber)
        .with_registry(&registry)
        .decode(&extensions(), &EXTENSIONS)
        .unwrap()
        .tree;
    let identifier = tree.find("2.extnID").unwrap();
    assert_eq!(
        Some("subjectKeyIdentifier (2.5.29.14)"),
        identifier.display.as_deref()
    );
    // not present, DEFAULT FALSE
    assert!(tree.find("2.critical").is_none());

    let value = tree.find("2.extnValue").unwrap();
    assert_eq!(Value::Bytes(vec![0x04, 0x00]), value.value);
    assert_eq!(
        vec![&Notice::UnregisteredOpenType(Discriminator::from(
            ID_CE_SUBJECT_KEY_IDENTIFIER
        ))],
        tree.all_notices()
    );
}

#[test]
fn test_absent_default_is_emitted_on_request() {
    let registry = registry();
    let tree = Decoder::new(Rule::Ber)
        .with_registry(&registry)
        .with_config(DecodeConfig {
            emit_absent: true,
            ..DecodeConfig::default()
        })
        .decode(&extensions(), &EXTENSIONS)
        .unwrap()
        .tree;
    let critical = tree.find("2.critical").unwrap();
    assert!(critical.is_absent());
    assert_eq!(
        Value::Absent(Some(Box::new(Value::Boolean(false)))),
        critical.value
    );
}

#[test]
fn test_nested_positions_are_absolute() {
    let registry = registry();
    let tree = Decoder::new(Rule::Ber)
        .with_registry(&registry)
        .decode(&extensions(), &EXTENSIONS)
        .unwrap()
        .tree;
    let key_usage = tree.find("1.extnValue.keyUsage").unwrap();
    // identifier of the BIT STRING inside the second extension
    assert_eq!(31 * 8, key_usage.bit_offset);
    assert_eq!(4 * 8, key_usage.bit_len);
}

#[test]
fn test_rendered_tree() {
    let registry = registry();
    let tree = Decoder::new(Rule::Ber)
        .with_registry(&registry)
        .decode(&extensions(), &EXTENSIONS)
        .unwrap()
        .tree;
    let text = tree.to_string();
    assert!(text.contains("extnID OBJECT IDENTIFIER: basicConstraints (2.5.29.19)"));
    assert!(text.contains("[unregistered open type 2.5.29.14]"));
}

#[test]
fn test_validity() {
    let validity = Composite::new("Validity")
        .field(Field::new("notBefore", Schema::utc_time()))
        .field(Field::new("notAfter", Schema::generalized_time()))
        .into_sequence();
    let mut data = vec![0x30, 0x20, 0x17, 0x0D];
    data.extend_from_slice(b"190501120000Z");
    data.extend_from_slice(&[0x18, 0x0F]);
    data.extend_from_slice(b"20290501120000Z");

    let tree = decode_ber(&validity, &data);
    let not_before = tree.find("notBefore").unwrap();
    assert_eq!(Value::Time("190501120000Z".into()), not_before.value);
    assert_eq!(Some("2019-05-01 12:00:00 UTC"), not_before.display.as_deref());
    assert_eq!(
        Some("2029-05-01 12:00:00 UTC"),
        tree.find("notAfter").and_then(|n| n.display.as_deref())
    );
}

#[test]
fn test_invalid_time_is_malformed() {
    let mut data = vec![0x17, 0x0D];
    data.extend_from_slice(b"191301120000Z");
    let error = Decoder::new(Rule::Ber)
        .decode(&Schema::utc_time(), &data)
        .unwrap_err();
    assert!(matches!(
        error.kind(),
        ErrorKind::Malformed(Malformed::InvalidTime(_))
    ));
}
