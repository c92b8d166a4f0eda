pub use crate::decode::{DecodeConfig, Decoded, Decoder, Rule};
pub use crate::err::{Error, ErrorKind, Malformed, Violation};
pub use crate::format::Format;
pub use crate::model::{
    Charset, Choice, Collection, Composite, Field, IntegerType, NamedBits, Presence, Primitive,
    Schema, Size, StringType, Tag, TagMode, Tagging, TypeId, TypeTable, ValueMap, Width,
};
pub use crate::registry::{Discriminator, Handler, TypeRegistry};
pub use crate::tree::{Notice, ParseNode, Value};
