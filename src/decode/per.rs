//! Schema driven decoding of UNALIGNED PER encodings, ITU-T X.691

use crate::decode::context::{DecodeContext, Slot};
use crate::decode::{primitive, undefined, Rule};
use crate::err::{Error, Malformed};
use crate::io::per::unaligned::{ensure_size, BitRead, Bits};
use crate::io::per::{bits_for_range, PackedRead, Selection, BYTE_LEN, CONSTRAINED_LENGTH_LIMIT};
use crate::model::{
    CharacterEncoding, Charset, Choice, Collection, Composite, Enumerated, IntegerType, OpenType,
    Primitive, Schema, Size, StringType,
};
use crate::registry::Handler;
use crate::tree::{Notice, ParseNode, Value};

/// Nested types are not looked into deeper than this when estimating their minimal width
const MINIMUM_BITS_DEPTH: usize = 8;

/// Decodes one value from the start of `data`, returns the node and the number of bits read
pub(super) fn decode<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: Slot<'s>,
    data: &[u8],
) -> Result<(ParseNode, usize), Error> {
    let mut bits = Bits::new(data);
    let node = decode_slot(ctx, slot, &mut bits)?;
    Ok((node, bits.bit_position()))
}

fn decode_slot<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: Slot<'s>,
    bits: &mut Bits<'_>,
) -> Result<ParseNode, Error> {
    let offset = bits.bit_position();
    ctx.charge()
        .and_then(|_| {
            ctx.nested(|ctx| {
                let schema = ctx.resolve(slot.schema)?;
                let mut node = decode_schema(ctx, &slot, schema, bits)?;
                node.bit_offset = offset;
                node.bit_len = bits.bit_position() - offset;
                ctx.finish(&slot, &mut node);
                Ok(node)
            })
        })
        .map_err(|error| error.located(offset, slot.name))
}

fn decode_schema<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    schema: &'s Schema,
    bits: &mut Bits<'_>,
) -> Result<ParseNode, Error> {
    match schema {
        Schema::Primitive(primitive) => decode_primitive(slot, primitive, bits),
        Schema::Sequence(composite) => decode_sequence(ctx, slot, composite, "SEQUENCE", bits),
        // the members of a SET are decoded in definition order
        Schema::Set(composite) => decode_sequence(ctx, slot, composite, "SET", bits),
        Schema::Choice(choice) => decode_choice(ctx, slot, choice, bits),
        Schema::SequenceOf(collection) => {
            decode_collection(ctx, slot, collection, "SEQUENCE OF", bits)
        }
        Schema::SetOf(collection) => decode_collection(ctx, slot, collection, "SET OF", bits),
        Schema::OpenType(open) => {
            let payload = bits.read_open_type()?;
            let offset = bits.bit_position() - payload.len() * BYTE_LEN;
            decode_open_type(ctx, slot, open, &payload, offset)
        }
        Schema::Reference(_) => Err(undefined(schema)),
    }
}

fn decode_primitive(
    slot: &Slot<'_>,
    primitive: &Primitive,
    bits: &mut Bits<'_>,
) -> Result<ParseNode, Error> {
    let kind = primitive.kind_name();
    let node = match primitive {
        Primitive::Boolean => ParseNode::new(slot.name, kind, Value::Boolean(bits.read_boolean()?)),
        Primitive::Null => ParseNode::new(slot.name, kind, Value::None),
        Primitive::Integer(integer) => {
            let value = read_integer(integer, bits)?;
            let mut node = ParseNode::new(slot.name, kind, Value::Integer(value));
            node.display = primitive::value_name(integer.values.as_ref(), value);
            node
        }
        Primitive::Enumerated(enumerated) => read_enumerated(slot, enumerated, bits)?,
        Primitive::OctetString(size) => {
            let octets = bits.read_octetstring(size.lower, size.upper, size.extensible)?;
            ParseNode::new(slot.name, kind, Value::Bytes(octets))
        }
        Primitive::BitString(bit_string) => {
            let offset = bits.bit_position();
            let size = &bit_string.size;
            let (data, bit_len) = bits.read_bitstring(size.lower, size.upper, size.extensible)?;
            let mut node = ParseNode::new(slot.name, kind, Value::Bits { data, bit_len });
            if let (Some(named), Value::Bits { data, .. }) = (&bit_string.named, &node.value) {
                node.children = primitive::named_bits(named, data, offset);
            }
            node
        }
        Primitive::ObjectIdentifier => {
            let content = bits.read_octetstring(None, None, false)?;
            let oid = primitive::object_identifier(&content)?;
            ParseNode::new(slot.name, kind, Value::Oid(oid))
        }
        Primitive::String(string) => {
            ParseNode::new(slot.name, kind, Value::String(read_string(string, bits)?))
        }
        Primitive::Time(time) => {
            let text = read_string(&StringType::new(Charset::Visible), bits)?;
            let display = primitive::time(*time, &text)?;
            ParseNode::new(slot.name, kind, Value::Time(text)).with_display(display)
        }
    };
    Ok(node)
}

/// ITU-T X.691, 13
fn read_integer(integer: &IntegerType, bits: &mut Bits<'_>) -> Result<i128, Error> {
    let extended = integer.extensible && bits.read_bit()?;
    let value = match (integer.lower, integer.upper) {
        _ if extended => bits.read_unconstrained_whole_number()?,
        (Some(lower), Some(upper)) => {
            bits.read_constrained_whole_number(i128::from(lower), i128::from(upper))?
        }
        (Some(lower), None) => bits.read_semi_constrained_whole_number(i128::from(lower))?,
        (None, _) => bits.read_unconstrained_whole_number()?,
    };
    primitive::check_width(value, integer.width)?;
    Ok(value)
}

/// ITU-T X.691, 14: root values by their index in value order, additions by their index in
/// definition order
fn read_enumerated(
    slot: &Slot<'_>,
    enumerated: &Enumerated,
    bits: &mut Bits<'_>,
) -> Result<ParseNode, Error> {
    let kind = "ENUMERATED";
    let values = &enumerated.values;
    match bits.read_enumeration_index(values.root_len() as u64, enumerated.extensible)? {
        Selection::Root(index) => match values.root_entry(index) {
            Some((value, name)) => {
                Ok(ParseNode::new(slot.name, kind, Value::Integer(i128::from(value)))
                    .with_display(name))
            }
            None => Err(Error::value_not_in_range(
                i128::from(index),
                Some(0),
                Some(values.root_len() as i128 - 1),
            )),
        },
        Selection::Extension(index) => match values.addition_entry(index) {
            Some((value, name)) => {
                Ok(ParseNode::new(slot.name, kind, Value::Integer(i128::from(value)))
                    .with_display(name))
            }
            None => {
                log::debug!("Unknown enumeration addition {} of {}", index, slot.name);
                let mut node = ParseNode::new(slot.name, kind, Value::Integer(i128::from(index)));
                node.notices.push(Notice::UnknownExtension);
                Ok(node)
            }
        },
    }
}

/// ITU-T X.691, 30.5 for known-multiplier character strings, 30.6 for all others
fn read_string(string: &StringType, bits: &mut Bits<'_>) -> Result<String, Error> {
    let size = &string.size;
    match string.charset.per_encoding(string.permitted.as_deref()) {
        CharacterEncoding::Octets => {
            let octets = bits.read_octetstring(size.lower, size.upper, size.extensible)?;
            primitive::string(string.charset, &octets)
        }
        CharacterEncoding::Code { bits: width } => {
            read_characters(bits, size, width, string.charset, |code| {
                char::from_u32(code).filter(|c| string.charset.is_valid(*c))
            })
        }
        CharacterEncoding::Index {
            bits: width,
            alphabet,
        } => read_characters(bits, size, width, string.charset, |index| {
            alphabet.get(index as usize).copied()
        }),
    }
}

fn read_characters(
    bits: &mut Bits<'_>,
    size: &Size,
    width: usize,
    charset: Charset,
    character: impl Fn(u32) -> Option<char>,
) -> Result<String, Error> {
    let extended = size.extensible && bits.read_bit()?;
    let (lower, upper) = if extended {
        (None, None)
    } else {
        (size.lower, size.upper)
    };

    let mut text = String::new();
    let mut count = 0_u64;
    let mut read = |bits: &mut Bits<'_>, len: u64| -> Result<(), Error> {
        bits.ensure_remaining(len.saturating_mul(width as u64))?;
        for _ in 0..len {
            let code = bits.read_non_negative_binary_integer(width)?;
            let c = u32::try_from(code)
                .ok()
                .and_then(&character)
                .ok_or_else(|| {
                    Error::malformed(Malformed::InvalidString {
                        charset,
                        index: count as usize,
                    })
                })?;
            text.push(c);
            count += 1;
        }
        Ok(())
    };

    match (lower, upper) {
        // 30.5.6: a fixed length below 64K is not encoded
        (Some(lower), Some(upper)) if lower == upper && upper < CONSTRAINED_LENGTH_LIMIT => {
            read(bits, upper)?;
        }
        _ => {
            let mut determinant = bits.read_length_determinant(lower, upper)?;
            loop {
                read(bits, determinant.count)?;
                if !determinant.fragmented {
                    break;
                }
                determinant = bits.read_length_determinant(None, None)?;
            }
        }
    }
    ensure_size(count, lower, upper)?;
    Ok(text)
}

fn decode_sequence<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    composite: &'s Composite,
    kind: &'static str,
    bits: &mut Bits<'_>,
) -> Result<ParseNode, Error> {
    let mut node = ParseNode::new(slot.name, kind, Value::None);
    let mark = ctx.mark();
    let result = decode_sequence_fields(ctx, composite, bits, &mut node.children);
    ctx.release(mark);
    result.map(|_| node)
}

/// ITU-T X.691, 19
fn decode_sequence_fields<'s>(
    ctx: &mut DecodeContext<'s>,
    composite: &'s Composite,
    bits: &mut Bits<'_>,
    children: &mut Vec<ParseNode>,
) -> Result<(), Error> {
    let extended = composite.extensible && bits.read_bit()?;
    let optionals = composite
        .fields
        .iter()
        .filter(|field| field.presence.is_optional())
        .count();
    bits.ensure_remaining(optionals as u64)?;
    let mut presence = Vec::with_capacity(optionals);
    for _ in 0..optionals {
        presence.push(bits.read_bit()?);
    }
    let mut presence = presence.into_iter();

    for field in &composite.fields {
        let present = !field.presence.is_optional() || presence.next().unwrap_or(false);
        if present {
            children.push(decode_slot(ctx, Slot::from(field), bits)?);
        } else if let Some(absent) = ctx.absent(&Slot::from(field), bits.bit_position()) {
            children.push(absent);
        }
    }

    if extended {
        decode_additions(ctx, composite, bits, children)
    } else {
        for field in &composite.additions {
            if let Some(absent) = ctx.absent(&Slot::from(field), bits.bit_position()) {
                children.push(absent);
            }
        }
        Ok(())
    }
}

/// ITU-T X.691, 19.7 to 19.9: every present addition is wrapped into an open type, so additions
/// this schema does not know are skipped by their length
fn decode_additions<'s>(
    ctx: &mut DecodeContext<'s>,
    composite: &'s Composite,
    bits: &mut Bits<'_>,
    children: &mut Vec<ParseNode>,
) -> Result<(), Error> {
    let count = bits.read_normally_small_length()?;
    bits.ensure_remaining(count)?;
    let mut presence = Vec::new();
    for _ in 0..count {
        presence.push(bits.read_bit()?);
    }

    for (index, present) in presence.into_iter().enumerate() {
        let field = composite.additions.get(index);
        if !present {
            if let Some(absent) =
                field.and_then(|field| ctx.absent(&Slot::from(field), bits.bit_position()))
            {
                children.push(absent);
            }
            continue;
        }
        let payload = bits.read_open_type()?;
        let offset = bits.bit_position() - payload.len() * BYTE_LEN;
        match field {
            Some(field) => {
                children.push(decode_envelope(ctx, Slot::from(field), &payload, offset)?);
            }
            None => {
                ctx.charge()?;
                log::debug!(
                    "Skipping unknown addition {} of {}",
                    index,
                    composite.name
                );
                let len = payload.len() * BYTE_LEN;
                children.push(
                    ParseNode::unknown(
                        format!("addition {}", index),
                        payload,
                        Notice::UnknownExtension,
                    )
                    .with_span(offset, len),
                );
            }
        }
    }

    for field in composite.additions.iter().skip(count as usize) {
        if let Some(absent) = ctx.absent(&Slot::from(field), bits.bit_position()) {
            children.push(absent);
        }
    }
    Ok(())
}

/// Decodes a complete encoding wrapped into an open type, `offset` is the position of the
/// payload within the decoded buffer
fn decode_envelope<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: Slot<'s>,
    payload: &[u8],
    offset: usize,
) -> Result<ParseNode, Error> {
    let mut envelope = Bits::new(payload);
    let mut node =
        decode_slot(ctx, slot, &mut envelope).map_err(|error| error.shifted(offset))?;
    node.shift(offset);
    Ok(node)
}

/// ITU-T X.691, 23
fn decode_choice<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    choice: &'s Choice,
    bits: &mut Bits<'_>,
) -> Result<ParseNode, Error> {
    let mut node = ParseNode::new(slot.name, "CHOICE", Value::None);
    let roots = choice.alternatives.len() as u64;
    let child = match bits.read_choice_index(roots, choice.extensible)? {
        Selection::Root(index) => {
            let alternative = choice
                .alternatives
                .get(index as usize)
                .ok_or_else(|| Error::unknown_choice_index(index, roots))?;
            decode_slot(ctx, Slot::from(alternative), bits)?
        }
        Selection::Extension(index) => {
            let payload = bits.read_open_type()?;
            let offset = bits.bit_position() - payload.len() * BYTE_LEN;
            match choice.additions.get(index as usize) {
                Some(alternative) => {
                    decode_envelope(ctx, Slot::from(alternative), &payload, offset)?
                }
                None => {
                    ctx.charge()?;
                    log::debug!("Unknown alternative {} of {}", index, choice.name);
                    let len = payload.len() * BYTE_LEN;
                    ParseNode::unknown(
                        format!("alternative {}", roots + index),
                        payload,
                        Notice::UnknownAlternative,
                    )
                    .with_span(offset, len)
                }
            }
        }
    };
    if !child.is_unknown() {
        node.display = Some(child.label.clone());
    }
    node.children.push(child);
    Ok(node)
}

/// ITU-T X.691, 20 and 21. The count is checked against the remaining input before any element
/// is decoded.
fn decode_collection<'s>(
    ctx: &mut DecodeContext<'s>,
    slot: &Slot<'s>,
    collection: &'s Collection,
    kind: &'static str,
    bits: &mut Bits<'_>,
) -> Result<ParseNode, Error> {
    let size = &collection.size;
    let extended = size.extensible && bits.read_bit()?;
    let (lower, upper) = if extended {
        (None, None)
    } else {
        (size.lower, size.upper)
    };
    let element = Slot::from(collection.element.as_ref());
    let minimum = minimum_bits(ctx, &collection.element.schema, 0);

    let mut node = ParseNode::new(slot.name, kind, Value::None);
    let mut total = 0_u64;
    match (lower, upper) {
        (Some(lower), Some(upper)) if lower == upper && upper < CONSTRAINED_LENGTH_LIMIT => {
            decode_elements(ctx, element, minimum, upper, bits, &mut node.children)?;
            total = upper;
        }
        _ => {
            let mut determinant = bits.read_length_determinant(lower, upper)?;
            loop {
                decode_elements(
                    ctx,
                    element,
                    minimum,
                    determinant.count,
                    bits,
                    &mut node.children,
                )?;
                total += determinant.count;
                if !determinant.fragmented {
                    break;
                }
                determinant = bits.read_length_determinant(None, None)?;
            }
        }
    }
    ensure_size(total, lower, upper)?;
    Ok(node)
}

fn decode_elements<'s>(
    ctx: &mut DecodeContext<'s>,
    element: Slot<'s>,
    minimum: u64,
    count: u64,
    bits: &mut Bits<'_>,
    children: &mut Vec<ParseNode>,
) -> Result<(), Error> {
    bits.ensure_remaining(count.saturating_mul(minimum))?;
    for _ in 0..count {
        ctx.charge()?;
        children.push(decode_slot(ctx, element, bits)?);
    }
    Ok(())
}

/// A lower bound for the number of bits any encoding of the schema occupies
fn minimum_bits<'s>(ctx: &DecodeContext<'s>, schema: &'s Schema, depth: usize) -> u64 {
    let schema = match ctx.resolve(schema) {
        Ok(schema) if depth <= MINIMUM_BITS_DEPTH => schema,
        _ => return 0,
    };
    match schema {
        Schema::Primitive(primitive) => match primitive {
            Primitive::Boolean => 1,
            Primitive::Null => 0,
            Primitive::Integer(integer) => match (integer.lower, integer.upper) {
                _ if integer.extensible => 1,
                (Some(lower), Some(upper)) => {
                    let range = (i128::from(upper) - i128::from(lower)).max(0) as u128;
                    bits_for_range(range) as u64
                }
                _ => BYTE_LEN as u64,
            },
            Primitive::Enumerated(enumerated) if enumerated.extensible => 1,
            Primitive::Enumerated(enumerated) => {
                bits_for_range(enumerated.values.root_len().saturating_sub(1) as u128) as u64
            }
            Primitive::OctetString(size) => sized_minimum(size, BYTE_LEN as u64),
            Primitive::BitString(bit_string) => sized_minimum(&bit_string.size, 1),
            Primitive::String(string) => {
                let width = match string.charset.per_encoding(string.permitted.as_deref()) {
                    CharacterEncoding::Octets => BYTE_LEN,
                    CharacterEncoding::Code { bits } | CharacterEncoding::Index { bits, .. } => {
                        bits
                    }
                };
                sized_minimum(&string.size, width as u64)
            }
            Primitive::ObjectIdentifier | Primitive::Time(_) => BYTE_LEN as u64,
        },
        Schema::Sequence(composite) | Schema::Set(composite) => {
            let mut bits = u64::from(composite.extensible);
            for field in &composite.fields {
                bits = bits.saturating_add(if field.presence.is_optional() {
                    1
                } else {
                    minimum_bits(ctx, &field.schema, depth + 1)
                });
            }
            bits
        }
        Schema::Choice(choice) if choice.extensible => 1,
        Schema::Choice(choice) => {
            bits_for_range(choice.alternatives.len().saturating_sub(1) as u128) as u64
        }
        Schema::SequenceOf(collection) | Schema::SetOf(collection) => {
            sized_minimum(&collection.size, 0)
        }
        Schema::OpenType(_) => BYTE_LEN as u64,
        Schema::Reference(_) => 0,
    }
}

/// Length determinant and content of the smallest value of a sized type, `unit` bits per item
fn sized_minimum(size: &Size, unit: u64) -> u64 {
    if size.extensible {
        return 1;
    }
    let length = match (size.lower, size.upper) {
        (Some(lower), Some(upper)) if upper < CONSTRAINED_LENGTH_LIMIT => {
            bits_for_range(u128::from(upper.saturating_sub(lower))) as u64
        }
        _ => BYTE_LEN as u64,
    };
    size.lower
        .unwrap_or(0)
        .saturating_mul(unit)
        .saturating_add(length)
}

/// Resolves the open type by the discriminator bound under its key
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
    let inner = match registry.lookup(&discriminator) {
        Some(Handler::Schema(field)) => decode_envelope(ctx, Slot::from(field), payload, offset)?,
        Some(Handler::Function(function)) => {
            let mut inner =
                function(payload, Rule::Uper).map_err(|error| error.shifted(offset))?;
            inner.shift(offset);
            inner
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
    node.children.push(inner);
    Ok(node)
}
