//! Maps discriminators to the types open types and PDUs are decoded with. A registry is built
//! once, then shared read-only between decode calls.

use crate::decode::Rule;
use crate::err::Error;
use crate::model::{Field, Schema};
use crate::tree::ParseNode;
use serde_derive::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};

/// The value an open type is resolved by: an OBJECT IDENTIFIER in dotted notation or a number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Discriminator {
    Oid(String),
    Number(i64),
}

impl Display for Discriminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Discriminator::Oid(oid) => f.write_str(oid),
            Discriminator::Number(number) => write!(f, "#{}", number),
        }
    }
}

impl From<&str> for Discriminator {
    fn from(oid: &str) -> Self {
        Discriminator::Oid(oid.to_string())
    }
}

impl From<String> for Discriminator {
    fn from(oid: String) -> Self {
        Discriminator::Oid(oid)
    }
}

impl From<i64> for Discriminator {
    fn from(number: i64) -> Self {
        Discriminator::Number(number)
    }
}

/// Decodes a complete encoding without a schema, the node positions are relative to `data`
pub type DecodeFn = fn(data: &[u8], rule: Rule) -> Result<ParseNode, Error>;

#[derive(Clone)]
pub enum Handler {
    /// Decoded with the decoder of the enclosing PDU, sharing its type table and limits
    Schema(Field),
    Function(DecodeFn),
}

impl Debug for Handler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Schema(field) => f.debug_tuple("Schema").field(field).finish(),
            Handler::Function(function) => write!(f, "Function({:#x})", *function as usize),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    handlers: BTreeMap<Discriminator, Handler>,
    names: BTreeMap<String, String>,
}

impl TypeRegistry {
    pub const fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            names: BTreeMap::new(),
        }
    }

    /// Replaces any handler bound to the same discriminator before
    pub fn bind(&mut self, discriminator: impl Into<Discriminator>, handler: Handler) -> &mut Self {
        let discriminator = discriminator.into();
        log::trace!("Binding {} to {:?}", discriminator, handler);
        self.handlers.insert(discriminator, handler);
        self
    }

    pub fn bind_schema(
        &mut self,
        discriminator: impl Into<Discriminator>,
        name: impl Into<String>,
        schema: impl Into<Schema>,
    ) -> &mut Self {
        self.bind(discriminator, Handler::Schema(Field::new(name, schema)))
    }

    pub fn bind_fn(
        &mut self,
        discriminator: impl Into<Discriminator>,
        function: DecodeFn,
    ) -> &mut Self {
        self.bind(discriminator, Handler::Function(function))
    }

    /// Registers a display name for an OBJECT IDENTIFIER, shown next to decoded OID values
    pub fn name(&mut self, oid: impl Into<String>, label: impl Into<String>) -> &mut Self {
        self.names.insert(oid.into(), label.into());
        self
    }

    pub fn lookup(&self, discriminator: &Discriminator) -> Option<&Handler> {
        self.handlers.get(discriminator)
    }

    /// The registered display name, or the name of the field bound to the OID
    pub fn name_of(&self, oid: &str) -> Option<&str> {
        self.names.get(oid).map(String::as_str).or_else(|| {
            match self.handlers.get(&Discriminator::Oid(oid.to_string())) {
                Some(Handler::Schema(field)) => Some(field.name.as_str()),
                _ => None,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
