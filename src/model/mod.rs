//! The declarative description of ASN.1 types the decoders are driven by. A schema is built once,
//! optionally validated and then shared by reference between any number of decode calls.

pub mod charset;
pub mod err;
pub mod schema;
pub mod table;
pub mod tag;
pub mod tag_resolver;
pub mod value_map;

pub use charset::{CharacterEncoding, Charset};
pub use err::{SchemaError, SchemaErrorKind};
pub use schema::{
    BitStringType, Carrier, Choice, Collection, Composite, Enumerated, Field, IntegerType,
    OpenType, Presence, Primitive, Schema, Size, StringType, TimeKind, TypeId, Width,
};
pub use table::TypeTable;
pub use tag::{Tag, TagMode, Tagging};
pub use tag_resolver::{first_tags, TagResolver, TagSet};
pub use value_map::{NamedBits, ValueMap};
