use crate::format::Format;
use crate::model::charset::Charset;
use crate::model::tag::{Tag, Tagging};
use crate::model::value_map::{NamedBits, ValueMap};
use crate::tree::Value;

/// Index of a type inside a [`crate::model::TypeTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

/// Declarative description of an ASN.1 type, built once and shared by reference during decoding
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Primitive(Primitive),
    Sequence(Composite),
    Set(Composite),
    Choice(Choice),
    SequenceOf(Collection),
    SetOf(Collection),
    OpenType(OpenType),
    /// Refers to a type in the [`crate::model::TypeTable`], allows shared and recursive types
    Reference(TypeId),
}

impl Schema {
    pub fn boolean() -> Self {
        Schema::Primitive(Primitive::Boolean)
    }

    pub fn null() -> Self {
        Schema::Primitive(Primitive::Null)
    }

    pub fn integer() -> Self {
        Schema::Primitive(Primitive::Integer(IntegerType::default()))
    }

    pub fn constrained_integer(lower: i64, upper: i64) -> Self {
        Schema::Primitive(Primitive::Integer(IntegerType::constrained(lower, upper)))
    }

    pub fn enumerated(values: ValueMap) -> Self {
        Schema::Primitive(Primitive::Enumerated(Enumerated {
            values,
            extensible: false,
        }))
    }

    pub fn extensible_enumerated(values: ValueMap) -> Self {
        Schema::Primitive(Primitive::Enumerated(Enumerated {
            values,
            extensible: true,
        }))
    }

    pub fn octet_string() -> Self {
        Schema::Primitive(Primitive::OctetString(Size::default()))
    }

    pub fn sized_octet_string(size: Size) -> Self {
        Schema::Primitive(Primitive::OctetString(size))
    }

    pub fn bit_string() -> Self {
        Schema::Primitive(Primitive::BitString(BitStringType::default()))
    }

    pub fn named_bit_string(named: NamedBits) -> Self {
        Schema::Primitive(Primitive::BitString(BitStringType {
            size: Size::default(),
            named: Some(named),
        }))
    }

    pub fn object_identifier() -> Self {
        Schema::Primitive(Primitive::ObjectIdentifier)
    }

    pub fn string(charset: Charset) -> Self {
        Schema::Primitive(Primitive::String(StringType {
            charset,
            size: Size::default(),
            permitted: None,
        }))
    }

    pub fn sized_string(charset: Charset, size: Size) -> Self {
        Schema::Primitive(Primitive::String(StringType {
            charset,
            size,
            permitted: None,
        }))
    }

    pub fn utc_time() -> Self {
        Schema::Primitive(Primitive::Time(TimeKind::UtcTime))
    }

    pub fn generalized_time() -> Self {
        Schema::Primitive(Primitive::Time(TimeKind::GeneralizedTime))
    }

    pub fn sequence_of(element: Field) -> Self {
        Schema::SequenceOf(Collection::new(element))
    }

    pub fn set_of(element: Field) -> Self {
        Schema::SetOf(Collection::new(element))
    }

    pub fn open_type(key: impl Into<String>) -> Self {
        Schema::OpenType(OpenType {
            key: key.into(),
            carrier: Carrier::Any,
        })
    }

    pub fn contained_open_type(key: impl Into<String>) -> Self {
        Schema::OpenType(OpenType {
            key: key.into(),
            carrier: Carrier::OctetString,
        })
    }

    /// The tag a BER encoding of this type carries without any tagging applied. Choices, open
    /// types and references have no tag of their own.
    pub fn natural_tag(&self) -> Option<Tag> {
        match self {
            Schema::Primitive(primitive) => Some(primitive.natural_tag()),
            Schema::Sequence(_) => Some(Tag::DEFAULT_SEQUENCE),
            Schema::Set(_) => Some(Tag::DEFAULT_SET),
            Schema::SequenceOf(_) => Some(Tag::DEFAULT_SEQUENCE_OF),
            Schema::SetOf(_) => Some(Tag::DEFAULT_SET_OF),
            Schema::Choice(_) | Schema::OpenType(_) | Schema::Reference(_) => None,
        }
    }

    /// Short name of the kind of type, used as the kind of parse nodes
    pub fn kind_name(&self) -> &'static str {
        match self {
            Schema::Primitive(primitive) => primitive.kind_name(),
            Schema::Sequence(_) => "SEQUENCE",
            Schema::Set(_) => "SET",
            Schema::Choice(_) => "CHOICE",
            Schema::SequenceOf(_) => "SEQUENCE OF",
            Schema::SetOf(_) => "SET OF",
            Schema::OpenType(_) => "OPEN TYPE",
            Schema::Reference(_) => "REFERENCE",
        }
    }
}

impl From<Primitive> for Schema {
    fn from(primitive: Primitive) -> Self {
        Schema::Primitive(primitive)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Boolean,
    Null,
    Integer(IntegerType),
    Enumerated(Enumerated),
    OctetString(Size),
    BitString(BitStringType),
    ObjectIdentifier,
    String(StringType),
    Time(TimeKind),
}

impl Primitive {
    pub fn natural_tag(&self) -> Tag {
        match self {
            Primitive::Boolean => Tag::DEFAULT_BOOLEAN,
            Primitive::Null => Tag::DEFAULT_NULL,
            Primitive::Integer(_) => Tag::DEFAULT_INTEGER,
            Primitive::Enumerated(_) => Tag::DEFAULT_ENUMERATED,
            Primitive::OctetString(_) => Tag::DEFAULT_OCTET_STRING,
            Primitive::BitString(_) => Tag::DEFAULT_BIT_STRING,
            Primitive::ObjectIdentifier => Tag::DEFAULT_OBJECT_IDENTIFIER,
            Primitive::String(string) => string.charset.default_tag(),
            Primitive::Time(TimeKind::UtcTime) => Tag::DEFAULT_UTC_TIME,
            Primitive::Time(TimeKind::GeneralizedTime) => Tag::DEFAULT_GENERALIZED_TIME,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Primitive::Boolean => "BOOLEAN",
            Primitive::Null => "NULL",
            Primitive::Integer(_) => "INTEGER",
            Primitive::Enumerated(_) => "ENUMERATED",
            Primitive::OctetString(_) => "OCTET STRING",
            Primitive::BitString(_) => "BIT STRING",
            Primitive::ObjectIdentifier => "OBJECT IDENTIFIER",
            Primitive::String(_) => "STRING",
            Primitive::Time(TimeKind::UtcTime) => "UTCTime",
            Primitive::Time(TimeKind::GeneralizedTime) => "GeneralizedTime",
        }
    }
}

/// The integer width a caller requests for an INTEGER, decoded values outside of it are
/// constraint violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    /// Whatever fits 128 bits, larger BER values are kept as their content octets
    Unlimited,
}

impl Width {
    pub const fn bounds(self) -> (i128, i128) {
        match self {
            Width::I8 => (i8::MIN as i128, i8::MAX as i128),
            Width::I16 => (i16::MIN as i128, i16::MAX as i128),
            Width::I32 => (i32::MIN as i128, i32::MAX as i128),
            Width::I64 => (i64::MIN as i128, i64::MAX as i128),
            Width::U8 => (0, u8::MAX as i128),
            Width::U16 => (0, u16::MAX as i128),
            Width::U32 => (0, u32::MAX as i128),
            Width::U64 => (0, u64::MAX as i128),
            Width::Unlimited => (i128::MIN, i128::MAX),
        }
    }

    pub const fn contains(self, value: i128) -> bool {
        let (lower, upper) = self.bounds();
        lower <= value && value <= upper
    }
}

impl Default for Width {
    fn default() -> Self {
        Width::I64
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegerType {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub extensible: bool,
    pub width: Width,
    /// Names for distinguished values, ITU-T X.680 19.1
    pub values: Option<ValueMap>,
}

impl IntegerType {
    pub fn constrained(lower: i64, upper: i64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
            ..Default::default()
        }
    }

    pub fn semi_constrained(lower: i64) -> Self {
        Self {
            lower: Some(lower),
            ..Default::default()
        }
    }

    pub fn extensible(mut self) -> Self {
        self.extensible = true;
        self
    }

    pub fn width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    pub fn named(mut self, values: ValueMap) -> Self {
        self.values = Some(values);
        self
    }
}

impl From<IntegerType> for Schema {
    fn from(integer: IntegerType) -> Self {
        Schema::Primitive(Primitive::Integer(integer))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enumerated {
    pub values: ValueMap,
    pub extensible: bool,
}

/// A SIZE constraint, ITU-T X.680 51.5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub lower: Option<u64>,
    pub upper: Option<u64>,
    pub extensible: bool,
}

impl Size {
    pub const fn fixed(size: u64) -> Self {
        Self {
            lower: Some(size),
            upper: Some(size),
            extensible: false,
        }
    }

    pub const fn range(lower: u64, upper: u64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
            extensible: false,
        }
    }

    pub const fn at_least(lower: u64) -> Self {
        Self {
            lower: Some(lower),
            upper: None,
            extensible: false,
        }
    }

    pub const fn extensible(mut self) -> Self {
        self.extensible = true;
        self
    }

    pub fn contains(&self, size: u64) -> bool {
        self.lower.map(|lower| lower <= size).unwrap_or(true)
            && self.upper.map(|upper| size <= upper).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BitStringType {
    pub size: Size,
    pub named: Option<NamedBits>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringType {
    pub charset: Charset,
    pub size: Size,
    /// Permitted alphabet constraint (`FROM`), only honoured for known-multiplier strings
    pub permitted: Option<String>,
}

impl StringType {
    pub fn new(charset: Charset) -> Self {
        Self {
            charset,
            size: Size::default(),
            permitted: None,
        }
    }

    pub fn sized(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn permitted(mut self, alphabet: impl Into<String>) -> Self {
        self.permitted = Some(alphabet.into());
        self
    }
}

impl From<StringType> for Schema {
    fn from(string: StringType) -> Self {
        Schema::Primitive(Primitive::String(string))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    UtcTime,
    GeneralizedTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(Value),
}

impl Presence {
    #[inline]
    pub fn is_optional(&self) -> bool {
        !matches!(self, Presence::Required)
    }
}

/// A named component of a SEQUENCE or SET, an alternative of a CHOICE or the element of a
/// SEQUENCE OF / SET OF
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub tagging: Option<Tagging>,
    pub presence: Presence,
    pub schema: Schema,
    /// Publishes the decoded value under this key for open types decoded later on
    pub binds: Option<String>,
    pub format: Option<Format>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        Self {
            name: name.into(),
            tagging: None,
            presence: Presence::Required,
            schema: schema.into(),
            binds: None,
            format: None,
        }
    }

    pub fn tagged(mut self, tagging: Tagging) -> Self {
        self.tagging = Some(tagging);
        self
    }

    /// `[number] IMPLICIT`
    pub fn implicit(self, number: usize) -> Self {
        self.tagged(Tagging::implicit(Tag::ContextSpecific(number)))
    }

    /// `[number] EXPLICIT`
    pub fn explicit(self, number: usize) -> Self {
        self.tagged(Tagging::explicit(Tag::ContextSpecific(number)))
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn default(mut self, value: Value) -> Self {
        self.presence = Presence::Default(value);
        self
    }

    pub fn binds(mut self, key: impl Into<String>) -> Self {
        self.binds = Some(key.into());
        self
    }

    pub fn formatted(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }
}

/// Members of a SEQUENCE or SET. Extension additions follow the extension marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub name: String,
    pub fields: Vec<Field>,
    pub extensible: bool,
    pub additions: Vec<Field>,
}

impl Composite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            extensible: false,
            additions: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn extensible(mut self) -> Self {
        self.extensible = true;
        self
    }

    /// Appends an extension addition, implies the extension marker
    pub fn addition(mut self, field: Field) -> Self {
        self.extensible = true;
        self.additions.push(field);
        self
    }

    pub fn into_sequence(self) -> Schema {
        Schema::Sequence(self)
    }

    pub fn into_set(self) -> Schema {
        Schema::Set(self)
    }

    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().chain(self.additions.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub name: String,
    pub alternatives: Vec<Field>,
    pub extensible: bool,
    pub additions: Vec<Field>,
}

impl Choice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alternatives: Vec::new(),
            extensible: false,
            additions: Vec::new(),
        }
    }

    pub fn alternative(mut self, field: Field) -> Self {
        self.alternatives.push(field);
        self
    }

    pub fn extensible(mut self) -> Self {
        self.extensible = true;
        self
    }

    pub fn addition(mut self, field: Field) -> Self {
        self.extensible = true;
        self.additions.push(field);
        self
    }

    pub fn all_alternatives(&self) -> impl Iterator<Item = &Field> {
        self.alternatives.iter().chain(self.additions.iter())
    }
}

impl From<Choice> for Schema {
    fn from(choice: Choice) -> Self {
        Schema::Choice(choice)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub element: Box<Field>,
    pub size: Size,
}

impl Collection {
    pub fn new(element: Field) -> Self {
        Self {
            element: Box::new(element),
            size: Size::default(),
        }
    }

    pub fn sized(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn into_sequence_of(self) -> Schema {
        Schema::SequenceOf(self)
    }

    pub fn into_set_of(self) -> Schema {
        Schema::SetOf(self)
    }
}

/// How the encoding of an open type is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    /// `ANY DEFINED BY`, in BER the complete element of whatever tag
    Any,
    /// An OCTET STRING whose content is the encoding of the resolved type
    OctetString,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenType {
    /// Key under which a preceding field published the discriminator
    pub key: String,
    pub carrier: Carrier,
}
