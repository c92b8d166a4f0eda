//! Decodes BER and UNALIGNED PER encodings into a tree of [`ParseNode`]s, driven by a [`Schema`].
//!
//! ```rust
//! use asn1dissect::prelude::*;
//!
//! let schema = Composite::new("Point")
//!     .field(Field::new("x", Schema::integer()))
//!     .field(Field::new("y", Schema::integer()).optional())
//!     .into_sequence();
//!
//! let decoded = Decoder::new(Rule::Ber)
//!     .decode(&schema, &[0x30, 0x03, 0x02, 0x01, 0x07])
//!     .unwrap();
//!
//! assert_eq!(5, decoded.bytes_consumed());
//! assert_eq!(Some(7), decoded.tree.find("x").and_then(|x| x.value.as_integer()));
//! assert!(decoded.tree.find("y").is_none());
//! ```

mod ber;
mod context;
mod per;
mod primitive;

use crate::err::{Error, ErrorKind};
use crate::model::{Field, Schema, SchemaErrorKind, TypeTable};
use crate::registry::{Discriminator, Handler, TypeRegistry};
use crate::tree::ParseNode;
use context::{DecodeContext, Slot};
use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The encoding rules a buffer is decoded with
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    /// ITU-T X.690, also accepts DER and CER
    Ber,
    /// ITU-T X.691, UNALIGNED variant
    Uper,
}

/// Limits and output options of a decode call. Every field has a default, so a partial
/// configuration deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Nesting of constructed types and open types beyond this fails
    pub max_depth: usize,
    /// Number of nodes and SEQUENCE OF / SET OF iterations a single decode may produce
    pub max_budget: usize,
    /// Produce a [`crate::tree::Value::Absent`] node for OPTIONAL and DEFAULT fields that are
    /// not present
    pub emit_absent: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_budget: 1_000_000,
            emit_absent: false,
        }
    }
}

static EMPTY_TYPES: TypeTable = TypeTable::new();
static EMPTY_REGISTRY: TypeRegistry = TypeRegistry::new();

#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    rule: Rule,
    types: &'a TypeTable,
    registry: &'a TypeRegistry,
    config: DecodeConfig,
}

impl<'a> Decoder<'a> {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            types: &EMPTY_TYPES,
            registry: &EMPTY_REGISTRY,
            config: DecodeConfig::default(),
        }
    }

    /// The table [`Schema::Reference`]s are resolved in
    pub fn with_types(mut self, types: &'a TypeTable) -> Self {
        self.types = types;
        self
    }

    pub fn with_registry(mut self, registry: &'a TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: DecodeConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn rule(&self) -> Rule {
        self.rule
    }

    #[inline]
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decodes one value of the schema from the start of `data`. Content after the value is not
    /// inspected, see [`Decoded::bits_consumed`].
    pub fn decode(&self, schema: &Schema, data: &[u8]) -> Result<Decoded, Error> {
        let label = self.root_label(schema);
        self.decode_slot(Slot::root(label, schema), data)
    }

    /// Like [`Decoder::decode`], labelled and tagged as described by the field
    pub fn decode_field(&self, field: &Field, data: &[u8]) -> Result<Decoded, Error> {
        self.decode_slot(Slot::from(field), data)
    }

    /// Decodes a PDU with whatever is bound to the discriminator in the registry
    pub fn decode_registered(
        &self,
        discriminator: &Discriminator,
        data: &[u8],
    ) -> Result<Decoded, Error> {
        match self.registry.lookup(discriminator) {
            Some(Handler::Schema(field)) => self.decode_field(field, data),
            Some(Handler::Function(function)) => {
                let tree = function(data, self.rule)?;
                let bits_consumed = tree.bit_offset + tree.bit_len;
                Ok(Decoded {
                    tree,
                    bits_consumed,
                })
            }
            None => Err(ErrorKind::UnregisteredOpenType(discriminator.clone()).into()),
        }
    }

    fn decode_slot(&self, slot: Slot<'_>, data: &[u8]) -> Result<Decoded, Error> {
        let mut context = DecodeContext::new(self.rule, self.types, self.registry, &self.config);
        let (tree, bits_consumed) = match self.rule {
            Rule::Ber => ber::decode(&mut context, slot, data)?,
            Rule::Uper => per::decode(&mut context, slot, data)?,
        };
        log::debug!(
            "Decoded {} with {:?}, {} bits consumed",
            tree.label,
            self.rule,
            bits_consumed
        );
        Ok(Decoded {
            tree,
            bits_consumed,
        })
    }

    fn root_label<'s>(&self, schema: &'s Schema) -> &'s str
    where
        'a: 's,
    {
        match schema {
            Schema::Sequence(composite) | Schema::Set(composite) => &composite.name,
            Schema::Choice(choice) => &choice.name,
            Schema::Reference(id) => self.types.name(*id).unwrap_or("REFERENCE"),
            other => other.kind_name(),
        }
    }
}

/// Resolves references, failing for types the table does not define
pub(crate) fn undefined(schema: &Schema) -> Error {
    match schema {
        Schema::Reference(id) => ErrorKind::InvalidSchema(SchemaErrorKind::UndefinedType(*id)),
        other => ErrorKind::InvalidSchema(SchemaErrorKind::CyclicReference(
            other.kind_name().to_string(),
        )),
    }
    .into()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub tree: ParseNode,
    pub bits_consumed: usize,
}

impl Decoded {
    /// Consumed octets, a partially used last octet counts as consumed
    pub fn bytes_consumed(&self) -> usize {
        (self.bits_consumed + 7) / 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_rule_from_str() {
        assert_eq!(Rule::Ber, Rule::from_str("ber").unwrap());
        assert_eq!(Rule::Uper, Rule::from_str("uper").unwrap());
        assert!(Rule::from_str("aper").is_err());
        assert_eq!("uper", Rule::Uper.to_string());
    }

    #[test]
    fn test_default_config() {
        let config = DecodeConfig::default();
        assert_eq!(64, config.max_depth);
        assert_eq!(1_000_000, config.max_budget);
        assert!(!config.emit_absent);
    }

    #[test]
    fn test_unregistered_pdu_is_an_error() {
        let error = Decoder::new(Rule::Ber)
            .decode_registered(&Discriminator::from("1.2.3"), &[0x05, 0x00])
            .unwrap_err();
        assert_eq!(
            &ErrorKind::UnregisteredOpenType(Discriminator::from("1.2.3")),
            error.kind()
        );
    }

    #[test]
    fn test_undefined_reference_is_reported() {
        let mut types = TypeTable::new();
        let id = types.declare("Missing");
        let error = Decoder::new(Rule::Uper)
            .with_types(&types)
            .decode(&Schema::Reference(id), &[0x00])
            .unwrap_err();
        assert_eq!(
            &ErrorKind::InvalidSchema(SchemaErrorKind::UndefinedType(id)),
            error.kind()
        );
    }
}
