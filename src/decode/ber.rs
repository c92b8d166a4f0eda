//! Tag driven decoding of BER encodings, ITU-T X.690

use crate::decode::context::{DecodeContext, Slot};
use crate::decode::{primitive, undefined, Rule};
use crate::err::{Error, Malformed};
use crate::io::ber::{BasicRead, Element, Octets};
use crate::model::{
    Carrier, Charset, Choice, Collection, Composite, Field, OpenType, Primitive, Schema, Tag,
    TagMode, TagSet, Tagging,
};
use crate::registry::Handler;
use crate::tree::{Notice, ParseNode, Value};

/// Decodes one element from the start of `data`, returns the node and the number of bits the
/// element occupies
pub(super) fn decode<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: Slot<'s>,
    data: &[u8],
) -> Result<(ParseNode, usize), Error> {
    let mut octets = Octets::new(data);
    let node = decode_slot(ctx, slot, &mut octets)?;
    Ok((node, octets.position() * 8))
}

fn decode_slot<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: Slot<'s>,
    octets: &mut Octets<'_>,
) -> Result<ParseNode, Error> {
    let offset = octets.position();
    ctx.charge()
        .and_then(|_| ctx.nested(|ctx| decode_tagged(ctx, &slot, octets)))
        .map_err(|error| error.located(offset * 8, slot.name))
}

fn decode_tagged<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    octets: &mut Octets<'_>,
) -> Result<ParseNode, Error> {
    let schema = ctx.resolve(slot.schema)?;
    let mut node = match ctx.resolver().effective(slot.tagging, slot.schema) {
        Some(Tagging {
            tag,
            mode: TagMode::Explicit,
        }) => {
            let element = expect_element(octets, tag)?;
            if !element.identifier.constructed {
                return Err(Error::malformed(Malformed::UnexpectedConstruction {
                    constructed: false,
                }));
            }
            let mut content = element.content;
            let node = decode_untagged(ctx, slot, schema, &mut content)?;
            ensure_consumed(&content)?;
            node.with_span(element.offset * 8, (element.end - element.offset) * 8)
        }
        Some(Tagging {
            tag,
            mode: TagMode::Implicit,
        }) => {
            let element = expect_element(octets, tag)?;
            decode_content(ctx, slot, schema, element)?
        }
        None => decode_untagged(ctx, slot, schema, octets)?,
    };
    ctx.finish(slot, &mut node);
    Ok(node)
}

/// Decodes a value that carries the tag of its own type
fn decode_untagged<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    schema: &'s Schema,
    octets: &mut Octets<'_>,
) -> Result<ParseNode, Error> {
    match schema {
        Schema::Choice(choice) => decode_choice(ctx, slot, choice, octets),
        Schema::OpenType(open) if open.carrier == Carrier::Any => {
            let element = octets.read_element()?;
            let node = decode_open_type(ctx, slot, open, element.raw(), element.offset)?;
            Ok(node.with_span(element.offset * 8, (element.end - element.offset) * 8))
        }
        Schema::OpenType(_) => {
            let element = expect_element(octets, Tag::DEFAULT_OCTET_STRING)?;
            decode_content(ctx, slot, schema, element)
        }
        other => match other.natural_tag() {
            Some(tag) => {
                let element = expect_element(octets, tag)?;
                decode_content(ctx, slot, other, element)
            }
            None => Err(undefined(other)),
        },
    }
}

/// Reads the next element, which must carry the given tag
fn expect_element<'a>(octets: &mut Octets<'a>, tag: Tag) -> Result<Element<'a>, Error> {
    if let Some(identifier) = octets.peek_identifier()? {
        if identifier.tag != tag {
            return Err(Error::unexpected_tag(tag, identifier.tag));
        }
    }
    octets.read_element()
}

fn ensure_consumed(content: &Octets<'_>) -> Result<(), Error> {
    if content.is_empty() {
        Ok(())
    } else {
        Err(Error::malformed(Malformed::TrailingContent {
            bits: content.remaining() * 8,
        }))
    }
}

fn ensure_construction(element: &Element<'_>, constructed: bool) -> Result<(), Error> {
    if element.identifier.constructed == constructed {
        Ok(())
    } else {
        Err(Error::malformed(Malformed::UnexpectedConstruction {
            constructed: element.identifier.constructed,
        }))
    }
}

/// Interprets the content of an element whose identifier has already been checked
fn decode_content<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    schema: &'s Schema,
    element: Element<'_>,
) -> Result<ParseNode, Error> {
    let mut content = element.content;
    let node = match schema {
        Schema::Primitive(primitive) => decode_primitive(ctx, slot, primitive, element)?,
        Schema::Sequence(composite) => {
            ensure_construction(&element, true)?;
            decode_sequence(ctx, slot, composite, &mut content)?
        }
        Schema::Set(composite) => {
            ensure_construction(&element, true)?;
            decode_set(ctx, slot, composite, &mut content)?
        }
        Schema::SequenceOf(collection) => {
            ensure_construction(&element, true)?;
            decode_collection(ctx, slot, collection, "SEQUENCE OF", &mut content)?
        }
        Schema::SetOf(collection) => {
            ensure_construction(&element, true)?;
            decode_collection(ctx, slot, collection, "SET OF", &mut content)?
        }
        Schema::Choice(choice) => {
            let node = decode_choice(ctx, slot, choice, &mut content)?;
            ensure_consumed(&content)?;
            node
        }
        Schema::OpenType(open) => match open.carrier {
            Carrier::Any => decode_open_type(ctx, slot, open, element.raw(), element.offset)?,
            Carrier::OctetString => {
                let payload = concatenated(ctx, element, Tag::DEFAULT_OCTET_STRING)?;
                decode_open_type(ctx, slot, open, &payload, content.position())?
            }
        },
        Schema::Reference(_) => return Err(undefined(schema)),
    };
    Ok(node.with_span(element.offset * 8, (element.end - element.offset) * 8))
}

fn decode_primitive<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    primitive: &'s Primitive,
    element: Element<'_>,
) -> Result<ParseNode, Error> {
    let kind = primitive.kind_name();
    match primitive {
        Primitive::OctetString(_) => {
            let octets = concatenated(ctx, element, Tag::DEFAULT_OCTET_STRING)?;
            Ok(ParseNode::new(slot.name, kind, Value::Bytes(octets)))
        }
        Primitive::BitString(bit_string) => {
            let (data, bit_len) = concatenated_bits(ctx, element)?;
            let mut node = ParseNode::new(slot.name, kind, Value::Bits { data, bit_len });
            if let (Some(named), Value::Bits { data, .. }) = (&bit_string.named, &node.value) {
                node.children = primitive::named_bits(named, data, element.offset * 8);
            }
            Ok(node)
        }
        Primitive::String(string) => {
            let octets = concatenated(ctx, element, Tag::DEFAULT_OCTET_STRING)?;
            let text = primitive::string(string.charset, &octets)?;
            Ok(ParseNode::new(slot.name, kind, Value::String(text)))
        }
        Primitive::Time(time) => {
            let octets = concatenated(ctx, element, Tag::DEFAULT_OCTET_STRING)?;
            let text = primitive::string(Charset::Visible, &octets)?;
            let display = primitive::time(*time, &text)?;
            Ok(ParseNode::new(slot.name, kind, Value::Time(text)).with_display(display))
        }
        _ => {
            ensure_construction(&element, false)?;
            let content = element.content.as_slice();
            let node = match primitive {
                Primitive::Boolean => {
                    ParseNode::new(slot.name, kind, Value::Boolean(primitive::boolean(content)?))
                }
                Primitive::Null => {
                    primitive::null(content)?;
                    ParseNode::new(slot.name, kind, Value::None)
                }
                Primitive::Integer(integer) => {
                    let value = primitive::integer(content, integer)?;
                    let display = value
                        .as_integer()
                        .and_then(|v| primitive::value_name(integer.values.as_ref(), v));
                    let mut node = ParseNode::new(slot.name, kind, value);
                    node.display = display;
                    node
                }
                Primitive::Enumerated(enumerated) => {
                    let value = primitive::signed(content)?;
                    let name = i64::try_from(value)
                        .ok()
                        .and_then(|value| enumerated.values.name_of(value));
                    let mut node = ParseNode::new(slot.name, kind, Value::Integer(value));
                    match name {
                        Some(name) => node.display = Some(name.to_string()),
                        None if enumerated.extensible => {
                            log::debug!("Unknown value {} of {}", value, slot.name);
                            node.notices.push(Notice::UnknownExtension)
                        }
                        None => return Err(Error::value_not_in_range(value, None, None)),
                    }
                    node
                }
                Primitive::ObjectIdentifier => ParseNode::new(
                    slot.name,
                    kind,
                    Value::Oid(primitive::object_identifier(content)?),
                ),
                _ => return Err(undefined(slot.schema)),
            };
            Ok(node)
        }
    }
}

/// The content octets of a string type, the segments of a constructed encoding (X.690 8.23.6)
/// are concatenated in document order
fn concatenated(
    ctx: &mut DecodeContext<'_>,
    element: Element<'_>,
    segment_tag: Tag,
) -> Result<Vec<u8>, Error> {
    Ok(segments(ctx, element, segment_tag)?.concat())
}

/// X.690 8.6.4: only the last segment of a constructed BIT STRING may have unused bits
fn concatenated_bits(
    ctx: &mut DecodeContext<'_>,
    element: Element<'_>,
) -> Result<(Vec<u8>, u64), Error> {
    let segments = segments(ctx, element, Tag::DEFAULT_BIT_STRING)?;
    let mut data = Vec::new();
    let mut bit_len = 0_u64;
    for (index, segment) in segments.iter().enumerate() {
        let (bits, len) = primitive::bit_string(segment)?;
        if index + 1 < segments.len() && len % 8 != 0 {
            return Err(Error::malformed(Malformed::InvalidUnusedBits(
                segment.first().copied().unwrap_or_default(),
            )));
        }
        data.extend_from_slice(&bits);
        bit_len += len;
    }
    Ok((data, bit_len))
}

/// The content of all primitive segments. Each nested constructed segment counts as one level of
/// nesting, an indefinite segment is framed once per enclosing level
fn segments<'a>(
    ctx: &mut DecodeContext<'_>,
    element: Element<'a>,
    segment_tag: Tag,
) -> Result<Vec<&'a [u8]>, Error> {
    let mut segments = Vec::new();
    collect_segments(ctx, element, segment_tag, &mut segments)?;
    Ok(segments)
}

fn collect_segments<'a>(
    ctx: &mut DecodeContext<'_>,
    element: Element<'a>,
    segment_tag: Tag,
    segments: &mut Vec<&'a [u8]>,
) -> Result<(), Error> {
    if !element.identifier.constructed {
        segments.push(element.content.as_slice());
        return Ok(());
    }
    let mut content = element.content;
    while !content.is_empty() {
        let segment = expect_element(&mut content, segment_tag)?;
        ctx.charge()?;
        if segment.identifier.constructed {
            ctx.nested(|ctx| collect_segments(ctx, segment, segment_tag, segments))?;
        } else {
            segments.push(segment.content.as_slice());
        }
    }
    Ok(())
}

fn unknown_element(element: &Element<'_>, notice: Notice) -> ParseNode {
    ParseNode::unknown(
        element.identifier.tag.to_string(),
        element.raw().to_vec(),
        notice,
    )
    .with_span(element.offset * 8, (element.end - element.offset) * 8)
}

fn decode_sequence<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    composite: &'s Composite,
    content: &mut Octets<'_>,
) -> Result<ParseNode, Error> {
    let mut node = ParseNode::new(slot.name, "SEQUENCE", Value::None);
    let mark = ctx.mark();
    let result = decode_sequence_fields(ctx, composite, content, &mut node.children);
    ctx.release(mark);
    result.map(|_| node)
}

fn decode_sequence_fields<'s>(
    ctx: &mut DecodeContext<'s>,
    composite: &'s Composite,
    content: &mut Octets<'_>,
    children: &mut Vec<ParseNode>,
) -> Result<(), Error> {
    let resolver = ctx.resolver();
    for (index, field) in composite.all_fields().enumerate() {
        // extension additions are optional towards older encoders
        let optional = field.presence.is_optional() || index >= composite.fields.len();
        let tags = resolver.field_tags(field);
        match content.peek_identifier()? {
            Some(identifier) if tags.contains(identifier.tag) => {
                children.push(decode_slot(ctx, Slot::from(field), content)?);
            }
            _ if optional => {
                if let Some(absent) = ctx.absent(&Slot::from(field), content.position() * 8) {
                    children.push(absent);
                }
            }
            Some(identifier) => {
                return Err(missing(field, &tags, Some(identifier.tag)));
            }
            None => return Err(missing(field, &tags, None)),
        }
    }

    while !content.is_empty() {
        if !composite.extensible {
            return ensure_consumed(content);
        }
        let element = content.read_element()?;
        ctx.charge()?;
        log::debug!(
            "Skipping unknown element {} in {}",
            element.identifier.tag,
            composite.name
        );
        children.push(unknown_element(&element, Notice::UnknownExtension));
    }
    Ok(())
}

fn missing(field: &Field, tags: &TagSet, got: Option<Tag>) -> Error {
    match (tags.first(), got) {
        (Some(expected), Some(got)) => Error::unexpected_tag(expected, got),
        _ => Error::malformed(Malformed::MissingField(field.name.clone())),
    }
}

fn decode_set<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    composite: &'s Composite,
    content: &mut Octets<'_>,
) -> Result<ParseNode, Error> {
    let mut node = ParseNode::new(slot.name, "SET", Value::None);
    let mark = ctx.mark();
    let result = decode_set_members(ctx, composite, content, &mut node.children);
    ctx.release(mark);
    result.map(|_| node)
}

fn decode_set_members<'s>(
    ctx: &mut DecodeContext<'s>,
    composite: &'s Composite,
    content: &mut Octets<'_>,
    children: &mut Vec<ParseNode>,
) -> Result<(), Error> {
    let resolver = ctx.resolver();
    let members = composite
        .all_fields()
        .map(|field| (field, resolver.field_tags(field)))
        .collect::<Vec<_>>();
    let mut decoded: Vec<Option<ParseNode>> = vec![None; members.len()];
    let mut unknown = Vec::new();

    while let Some(identifier) = content.peek_identifier()? {
        match members
            .iter()
            .position(|(_, tags)| tags.contains(identifier.tag))
        {
            Some(index) if decoded[index].is_some() => {
                return Err(Error::malformed(Malformed::DuplicateField(
                    members[index].0.name.clone(),
                )));
            }
            Some(index) => {
                decoded[index] = Some(decode_slot(ctx, Slot::from(members[index].0), content)?);
            }
            None if composite.extensible => {
                let element = content.read_element()?;
                ctx.charge()?;
                unknown.push(unknown_element(&element, Notice::UnknownExtension));
            }
            None => {
                return Err(Error::malformed(Malformed::UnexpectedElement(
                    identifier.tag,
                )));
            }
        }
    }

    let end = content.position() * 8;
    for (index, ((field, _), node)) in members.iter().zip(decoded).enumerate() {
        match node {
            Some(node) => children.push(node),
            None if field.presence.is_optional() || index >= composite.fields.len() => {
                if let Some(absent) = ctx.absent(&Slot::from(*field), end) {
                    children.push(absent);
                }
            }
            None => {
                return Err(Error::malformed(Malformed::MissingField(
                    field.name.clone(),
                )));
            }
        }
    }
    children.extend(unknown);
    Ok(())
}

fn decode_collection<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    collection: &'s Collection,
    kind: &'static str,
    content: &mut Octets<'_>,
) -> Result<ParseNode, Error> {
    let mut node = ParseNode::new(slot.name, kind, Value::None);
    let element = Slot::from(collection.element.as_ref());
    while !content.is_empty() {
        ctx.charge()?;
        node.children.push(decode_slot(ctx, element, content)?);
    }
    Ok(node)
}

fn decode_choice<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    choice: &'s Choice,
    octets: &mut Octets<'_>,
) -> Result<ParseNode, Error> {
    let start = octets.position();
    let identifier = match octets.peek_identifier()? {
        Some(identifier) => identifier,
        None => {
            return Err(Error::malformed(Malformed::MissingField(
                slot.name.to_string(),
            )))
        }
    };
    let resolver = ctx.resolver();
    let alternative = choice
        .all_alternatives()
        .find(|alternative| resolver.field_tags(alternative).contains(identifier.tag));

    let mut node = ParseNode::new(slot.name, "CHOICE", Value::None);
    match alternative {
        Some(alternative) => {
            let child = decode_slot(ctx, Slot::from(alternative), octets)?;
            node.display = Some(child.label.clone());
            node.children.push(child);
        }
        None if choice.extensible => {
            let element = octets.read_element()?;
            ctx.charge()?;
            log::debug!(
                "Unknown alternative {} of {}",
                identifier.tag,
                choice.name
            );
            node.children
                .push(unknown_element(&element, Notice::UnknownAlternative));
        }
        None => return Err(Error::unknown_choice_tag(identifier.tag)),
    }
    Ok(node.with_span(start * 8, (octets.position() - start) * 8))
}

/// Resolves the open type by the discriminator bound under its key. `offset` is the position of
/// `payload` within the decoded buffer.
fn decode_open_type<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    open: &'s OpenType,
    payload: &[u8],
    offset: usize,
) -> Result<ParseNode, Error> {
    let mut node = ParseNode::new(slot.name, "OPEN TYPE", Value::None);
    let discriminator = match ctx.discriminator(&open.key) {
        Ok(discriminator) => discriminator,
        Err(notice) => {
            log::debug!("Open type {} decoded as bytes: {}", slot.name, notice);
            node.value = Value::Bytes(payload.to_vec());
            node.notices.push(notice);
            return Ok(node);
        }
    };

    let registry = ctx.registry;
    let mut inner = match registry.lookup(&discriminator) {
        Some(Handler::Schema(field)) => {
            let mut octets = Octets::new(payload);
            let inner = decode_slot(ctx, Slot::from(field), &mut octets)
                .map_err(|error| error.shifted(offset * 8))?;
            if !octets.is_empty() {
                log::debug!(
                    "{} octets after {} in open type {}",
                    octets.remaining(),
                    field.name,
                    slot.name
                );
            }
            inner
        }
        Some(Handler::Function(function)) => {
            function(payload, Rule::Ber).map_err(|error| error.shifted(offset * 8))?
        }
        None => {
            log::debug!(
                "No type registered for {}, {} decoded as bytes",
                discriminator,
                slot.name
            );
            node.value = Value::Bytes(payload.to_vec());
            node.notices.push(Notice::UnregisteredOpenType(discriminator));
            return Ok(node);
        }
    };
    inner.shift(offset * 8);
    node.children.push(inner);
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeConfig, Decoder};
    use crate::err::ErrorKind;
    use crate::model::{Size, TypeTable};
    use crate::registry::TypeRegistry;

    fn decode(schema: &Schema, data: &[u8]) -> Result<ParseNode, Error> {
        Decoder::new(Rule::Ber)
            .decode(schema, data)
            .map(|decoded| decoded.tree)
    }

    #[test]
    fn test_optional_field_resolved_by_tag() {
        let schema = Composite::new("Pair")
            .field(Field::new("flag", Schema::boolean()).optional())
            .field(Field::new("number", Schema::integer()))
            .into_sequence();
        let tree = decode(&schema, &[0x30, 0x03, 0x02, 0x01, 0x2A]).unwrap();
        assert!(tree.child("flag").is_none());
        assert_eq!(Some(42), tree.find("number").and_then(|n| n.value.as_integer()));
    }

    #[test]
    fn test_missing_mandatory_field() {
        let schema = Composite::new("Pair")
            .field(Field::new("flag", Schema::boolean()))
            .field(Field::new("number", Schema::integer()))
            .into_sequence();
        let error = decode(&schema, &[0x30, 0x03, 0x01, 0x01, 0xFF]).unwrap_err();
        assert_eq!(
            &ErrorKind::Malformed(Malformed::MissingField("number".into())),
            error.kind()
        );
        assert_eq!(&["Pair".to_string()], error.path());
    }

    #[test]
    fn test_implicit_and_explicit_tags() {
        let schema = Composite::new("Tagged")
            .field(Field::new("a", Schema::integer()).implicit(0))
            .field(Field::new("b", Schema::integer()).explicit(1))
            .into_sequence();
        let data = [
            0x30, 0x08, 0x80, 0x01, 0x05, 0xA1, 0x03, 0x02, 0x01, 0x06,
        ];
        let tree = decode(&schema, &data).unwrap();
        assert_eq!(Some(5), tree.find("a").and_then(|n| n.value.as_integer()));
        let b = tree.find("b").unwrap();
        assert_eq!(Some(6), b.value.as_integer());
        assert_eq!((40, 40), (b.bit_offset, b.bit_len));
    }

    #[test]
    fn test_explicit_tag_with_trailing_content() {
        let schema = Composite::new("Tagged")
            .field(Field::new("b", Schema::integer()).explicit(1))
            .into_sequence();
        let data = [0x30, 0x06, 0xA1, 0x04, 0x02, 0x01, 0x06, 0x00];
        assert_eq!(
            &ErrorKind::Malformed(Malformed::TrailingContent { bits: 8 }),
            decode(&schema, &data).unwrap_err().kind()
        );
    }

    #[test]
    fn test_constructed_octet_string_is_concatenated() {
        let data = [
            0x24, 0x80, 0x04, 0x02, 0x01, 0x02, 0x24, 0x03, 0x04, 0x01, 0x03, 0x00, 0x00,
        ];
        let tree = decode(&Schema::octet_string(), &data).unwrap();
        assert_eq!(Value::Bytes(vec![1, 2, 3]), tree.value);
        assert_eq!(data.len() * 8, tree.bit_len);
    }

    #[test]
    fn test_sequence_of_exhausts_content() {
        let schema = Schema::sequence_of(Field::new("item", Schema::integer()));
        let tree = decode(&schema, &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]).unwrap();
        assert_eq!(2, tree.children.len());
        assert_eq!(Some(2), tree.find("1").and_then(|n| n.value.as_integer()));

        // the partial element reaches beyond the SEQUENCE OF but not beyond the buffer
        let error = decode(&schema, &[0x30, 0x04, 0x02, 0x01, 0x01, 0x02, 0x01, 0x05]).unwrap_err();
        assert!(matches!(
            error.kind(),
            ErrorKind::Malformed(Malformed::EnvelopeOverrun { .. })
        ));
    }

    #[test]
    fn test_set_in_any_order() {
        let schema = Composite::new("Unordered")
            .field(Field::new("a", Schema::integer()).implicit(0))
            .field(Field::new("b", Schema::boolean()).implicit(1))
            .field(Field::new("c", Schema::null()).implicit(2).optional())
            .into_set();
        let tree = decode(&schema, &[0x31, 0x06, 0x81, 0x01, 0xFF, 0x80, 0x01, 0x07]).unwrap();
        let labels = tree
            .children
            .iter()
            .map(|child| child.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(vec!["a", "b"], labels);

        let duplicate = [0x31, 0x06, 0x80, 0x01, 0x01, 0x80, 0x01, 0x02];
        assert_eq!(
            &ErrorKind::Malformed(Malformed::DuplicateField("a".into())),
            decode(&schema, &duplicate).unwrap_err().kind()
        );
    }

    #[test]
    fn test_choice_and_unknown_alternative() {
        let choice = Choice::new("Either")
            .alternative(Field::new("number", Schema::integer()))
            .alternative(Field::new("text", Schema::string(Charset::Utf8)));
        let tree = decode(&choice.clone().into(), &[0x0C, 0x02, b'h', b'i']).unwrap();
        assert_eq!(1, tree.children.len());
        assert_eq!(Some("hi"), tree.find("text").and_then(|n| n.value.as_str()));

        assert_eq!(
            &ErrorKind::UnknownChoice(crate::err::ChoiceSelector::Tag(Tag::DEFAULT_BOOLEAN)),
            decode(&choice.clone().into(), &[0x01, 0x01, 0x00])
                .unwrap_err()
                .kind()
        );

        let tree = decode(&choice.extensible().into(), &[0x01, 0x01, 0x00]).unwrap();
        assert!(tree.children[0].is_unknown());
        assert_eq!(
            vec![&Notice::UnknownAlternative],
            tree.all_notices()
        );
    }

    #[test]
    fn test_trailing_elements_of_extensible_sequence() {
        let base = Composite::new("Versioned").field(Field::new("a", Schema::integer()));
        let data = [0x30, 0x05, 0x02, 0x01, 0x01, 0x05, 0x00];
        assert!(decode(&base.clone().into_sequence(), &data).is_err());
        let tree = decode(&base.extensible().into_sequence(), &data).unwrap();
        assert_eq!(2, tree.children.len());
        assert_eq!(Value::Bytes(vec![0x05, 0x00]), tree.children[1].value);
    }

    #[test]
    fn test_primitive_with_constructed_bit() {
        assert_eq!(
            &ErrorKind::Malformed(Malformed::UnexpectedConstruction { constructed: true }),
            decode(&Schema::integer(), &[0x22, 0x01, 0x00])
                .unwrap_err()
                .kind()
        );
    }

    #[test]
    fn test_open_type_by_bound_oid() {
        let schema = Composite::new("Extension")
            .field(Field::new("extnID", Schema::object_identifier()).binds("extnID"))
            .field(Field::new("extnValue", Schema::contained_open_type("extnID")))
            .into_sequence();
        let mut registry = TypeRegistry::new();
        registry.bind_schema(
            "2.5.29.19",
            "basicConstraints",
            Composite::new("BasicConstraints")
                .field(Field::new("cA", Schema::boolean()).default(Value::Boolean(false)))
                .into_sequence(),
        );
        let data = [
            0x30, 0x0C, 0x06, 0x03, 0x55, 0x1D, 0x13, 0x04, 0x05, 0x30, 0x03, 0x01, 0x01, 0xFF,
        ];
        let tree = Decoder::new(Rule::Ber)
            .with_registry(&registry)
            .decode(&schema, &data)
            .unwrap()
            .tree;
        assert_eq!(
            Some("basicConstraints (2.5.29.19)"),
            tree.find("extnID").and_then(|n| n.display.as_deref())
        );
        let ca = tree.find("extnValue.basicConstraints.cA").unwrap();
        assert_eq!(Value::Boolean(true), ca.value);
        // positions are relative to the outer buffer
        assert_eq!(11 * 8, ca.bit_offset);
    }

    #[test]
    fn test_recursion_limit() {
        let mut types = TypeTable::new();
        let id = types.declare("Nested");
        types
            .define(
                id,
                Composite::new("Nested")
                    .field(Field::new("inner", Schema::Reference(id)).optional())
                    .into_sequence(),
            )
            .unwrap();
        let mut data = Vec::new();
        for _ in 0..10 {
            data = [vec![0x30, data.len() as u8], data].concat();
        }
        let decoder = Decoder::new(Rule::Ber).with_types(&types);
        assert!(decoder.decode(&Schema::Reference(id), &data).is_ok());
        let error = decoder
            .with_config(DecodeConfig {
                max_depth: 4,
                ..DecodeConfig::default()
            })
            .decode(&Schema::Reference(id), &data)
            .unwrap_err();
        assert_eq!(&ErrorKind::RecursionLimitExceeded { limit: 4 }, error.kind());
    }

    #[test]
    fn test_sized_string_is_not_enforced() {
        let schema = Schema::sized_string(Charset::Ia5, Size::fixed(1));
        let tree = decode(&schema, &[0x16, 0x02, b'a', b'b']).unwrap();
        assert_eq!(Some("ab"), tree.value.as_str());
    }
}
