
use test_utils::*;

fn byte() -> Schema {
    Schema::constrained_integer(0, 255)
}

/// A reduced ULP-PDU of SUPL 2.0
fn ulp_pdu() -> Schema {
    let version = Composite::new("Version")
        .field(Field::new("maj", byte()))
        .field(Field::new("min", byte()))
        .field(Field::new("servind", byte()))
        .into_sequence();
    let session_id = Composite::new("SessionID")
        .field(
            Field::new(
                "setSessionID",
                Composite::new("SetSessionID")
                    .field(Field::new("sessionId", Schema::constrained_integer(0, 65535)))
                    .into_sequence(),
            )
            .optional(),
        )
        .field(
            Field::new(
                "slpSessionID",
                Composite::new("SlpSessionID")
                    .field(Field::new(
                        "sessionID",
                        Schema::sized_octet_string(Size::fixed(4)),
                    ))
                    .into_sequence(),
            )
            .optional(),
        )
        .into_sequence();
    let status_code = Schema::extensible_enumerated(ValueMap::new(vec![
        (0, "unspecified"),
        (1, "systemFailure"),
        (2, "unexpectedMessage"),
        (3, "protocolError"),
        (4, "dataMissing"),
        (5, "unexpectedDataValue"),
    ]));
    let supl_end = Composite::new("SUPLEND")
        .field(Field::new("statusCode", status_code).optional())
        .field(Field::new("ver", Schema::sized_octet_string(Size::fixed(8))).optional())
        .extensible()
        .into_sequence();
    let supl_start = Composite::new("SUPLSTART")
        .field(Field::new("qop", byte()).optional())
        .extensible()
        .into_sequence();
    let supl_notify = Composite::new("SUPLNOTIFY")
        .field(Field::new(
            "notificationResponse",
            Schema::enumerated(ValueMap::new(vec![(0, "allowed"), (1, "notAllowed")])),
        ))
        .into_sequence();
    let message = Choice::new("UlpMessage")
        .alternative(Field::new("msSUPLINIT", Schema::null()))
        .alternative(Field::new("msSUPLSTART", supl_start))
        .alternative(Field::new("msSUPLEND", supl_end))
        .addition(Field::new("msSUPLNOTIFY", supl_notify));

    Composite::new("ULP-PDU")
        .field(Field::new("length", Schema::constrained_integer(0, 65535)))
        .field(Field::new("version", version))
        .field(Field::new("sessionID", session_id))
        .field(Field::new("message", message))
        .into_sequence()
}

fn header(buffer: &mut BitBuffer) -> Result<(), Error> {
    buffer.write_constrained_whole_number(0, 65535, 18)?;
    for value in [2, 0, 0] {
        buffer.write_constrained_whole_number(0, 255, value)?;
    }
    buffer.write_bit(true)?;
    buffer.write_bit(false)?;
    buffer.write_constrained_whole_number(0, 65535, 0x1234)
}

#[test]
fn test_supl_end_with_status() {
    let (bits, data) = uper(|buffer| {
        header(buffer)?;
        buffer.write_choice_index(3, true, Selection::Root(2))?;
        // not extended, statusCode present, ver absent
        buffer.write_bit(false)?;
        buffer.write_bit(true)?;
        buffer.write_bit(false)?;
        buffer.write_enumeration_index(6, true, Selection::Root(4))
    });
    let tree = decode_uper(&ulp_pdu(), &data, bits);

    assert_eq!(18, integer_at(&tree, "length"));
    assert_eq!(2, integer_at(&tree, "version.maj"));
    assert_eq!(0x1234, integer_at(&tree, "sessionID.setSessionID.sessionId"));
    assert!(tree.find("sessionID.slpSessionID").is_none());

    let message = tree.find("message").unwrap();
    assert_eq!(Some("msSUPLEND"), message.display.as_deref());
    let status = tree.find("message.msSUPLEND.statusCode").unwrap();
    assert_eq!(Value::Integer(4), status.value);
    assert_eq!(Some("dataMissing"), status.display.as_deref());
    assert!(tree.find("message.msSUPLEND.ver").is_none());
}

#[test]
fn test_bit_positions() {
    let (bits, data) = uper(|buffer| {
        header(buffer)?;
        buffer.write_choice_index(3, true, Selection::Root(0))
    });
    let tree = decode_uper(&ulp_pdu(), &data, bits);
    let version = tree.find("version").unwrap();
    assert_eq!((16, 24), (version.bit_offset, version.bit_len));
    let min = tree.find("version.min").unwrap();
    assert_eq!((24, 8), (min.bit_offset, min.bit_len));
    let session = tree.find("sessionID.setSessionID.sessionId").unwrap();
    assert_eq!((42, 16), (session.bit_offset, session.bit_len));
    assert_eq!(Value::None, tree.find("message.msSUPLINIT").unwrap().value);
}

#[test]
fn test_message_addition() {
    let (bits, data) = uper(|buffer| {
        header(buffer)?;
        buffer.write_choice_index(3, true, Selection::Extension(0))?;
        buffer.write_open_type(&[0x80])
    });
    let tree = decode_uper(&ulp_pdu(), &data, bits);
    let response = tree
        .find("message.msSUPLNOTIFY.notificationResponse")
        .unwrap();
    assert_eq!(Some("notAllowed"), response.display.as_deref());
    // header, extension bit, normally small index and the length octet
    assert_eq!(58 + 1 + 7 + 8, response.bit_offset);
}

#[test]
fn test_unknown_message_is_skipped() {
    let (bits, data) = uper(|buffer| {
        header(buffer)?;
        buffer.write_choice_index(3, true, Selection::Extension(7))?;
        buffer.write_open_type(&[0xDE, 0xAD])
    });
    let tree = decode_uper(&ulp_pdu(), &data, bits);
    let message = tree.find("message").unwrap();
    assert!(message.children[0].is_unknown());
    assert_eq!(Value::Bytes(vec![0xDE, 0xAD]), message.children[0].value);
    assert_eq!(vec![&Notice::UnknownAlternative], tree.all_notices());
}

#[test]
fn test_start_from_newer_version() {
    let (bits, data) = uper(|buffer| {
        header(buffer)?;
        buffer.write_choice_index(3, true, Selection::Root(1))?;
        // extended, qop present
        buffer.write_bit(true)?;
        buffer.write_bit(true)?;
        buffer.write_constrained_whole_number(0, 255, 60)?;
        buffer.write_normally_small_length(1)?;
        buffer.write_bit(true)?;
        buffer.write_open_type(&[0x01, 0x02, 0x03])
    });
    let tree = decode_uper(&ulp_pdu(), &data, bits);
    let start = tree.find("message.msSUPLSTART").unwrap();
    assert_eq!(60, integer_at(start, "qop"));
    assert_eq!(2, start.children.len());
    assert!(start.children[1].is_unknown());
    assert_eq!(vec![&Notice::UnknownExtension], tree.all_notices());
}

#[test]
fn test_truncated_pdu() {
    let (_, data) = uper(header);
    let error = Decoder::new(Rule::Uper)
        .decode(&ulp_pdu(), &data[..6])
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::Truncated { .. }));
    assert_eq!(
        vec!["ULP-PDU", "sessionID", "setSessionID", "sessionId"],
        error
            .path()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
    );
    assert_eq!(Some(42), error.bit_offset());
}
