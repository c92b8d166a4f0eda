use crate::decode::{undefined, DecodeConfig, Rule};
use crate::err::{Error, ErrorKind};
use crate::format::Format;
use crate::model::{Field, Presence, Schema, SchemaErrorKind, TagResolver, Tagging, TypeTable};
use crate::registry::{Discriminator, TypeRegistry};
use crate::tree::{Notice, ParseNode, Value};

/// Untagged references are followed at most this often before giving up
const MAX_REFERENCE_STEPS: usize = 64;

/// The parts of a [`Field`] the decoders need, so a bare [`Schema`] can be decoded as well
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot<'s> {
    pub name: &'s str,
    pub tagging: Option<Tagging>,
    pub presence: Option<&'s Presence>,
    pub schema: &'s Schema,
    pub binds: Option<&'s str>,
    pub format: Option<&'s Format>,
}

impl<'s> Slot<'s> {
    pub fn root(name: &'s str, schema: &'s Schema) -> Self {
        Self {
            name,
            tagging: None,
            presence: None,
            schema,
            binds: None,
            format: None,
        }
    }
}

impl<'s> From<&'s Field> for Slot<'s> {
    fn from(field: &'s Field) -> Self {
        Self {
            name: &field.name,
            tagging: field.tagging,
            presence: Some(&field.presence),
            schema: &field.schema,
            binds: field.binds.as_deref(),
            format: field.format.as_ref(),
        }
    }
}

/// State of a single decode call
pub(crate) struct DecodeContext<'s> {
    pub rule: Rule,
    pub types: &'s TypeTable,
    pub registry: &'s TypeRegistry,
    pub config: &'s DecodeConfig,
    depth: usize,
    budget: usize,
    /// Values published by fields with [`Field::binds`], innermost last
    bindings: Vec<(&'s str, Value)>,
}

impl<'s> DecodeContext<'s> {
    pub fn new(
        rule: Rule,
        types: &'s TypeTable,
        registry: &'s TypeRegistry,
        config: &'s DecodeConfig,
    ) -> Self {
        Self {
            rule,
            types,
            registry,
            config,
            depth: 0,
            budget: 0,
            bindings: Vec::new(),
        }
    }

    #[inline]
    pub fn resolver(&self) -> TagResolver<'s> {
        TagResolver::new(self.types)
    }

    /// Follows references until a concrete schema is reached
    pub fn resolve(&self, schema: &'s Schema) -> Result<&'s Schema, Error> {
        let mut current = schema;
        for _ in 0..MAX_REFERENCE_STEPS {
            match current {
                Schema::Reference(id) => {
                    current = self.types.get(*id).ok_or_else(|| undefined(current))?
                }
                other => return Ok(other),
            }
        }
        Err(ErrorKind::InvalidSchema(SchemaErrorKind::CyclicReference(
            self.resolver().type_label(schema),
        ))
        .into())
    }

    /// Runs `f` one nesting level deeper
    pub fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self.depth >= self.config.max_depth {
            return Err(ErrorKind::RecursionLimitExceeded {
                limit: self.config.max_depth,
            }
            .into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Accounts for one produced node or one collection iteration
    #[inline]
    pub fn charge(&mut self) -> Result<(), Error> {
        self.budget += 1;
        if self.budget > self.config.max_budget {
            Err(ErrorKind::BudgetExhausted {
                limit: self.config.max_budget,
            }
            .into())
        } else {
            Ok(())
        }
    }

    /// Bindings published after the mark are dropped by [`DecodeContext::release`]
    #[inline]
    pub fn mark(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn release(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }

    /// The discriminator an open type with the given key is resolved by
    pub fn discriminator(&self, key: &str) -> Result<Discriminator, Notice> {
        let value = self
            .bindings
            .iter()
            .rev()
            .find(|(bound, _)| *bound == key)
            .map(|(_, value)| value);
        match value {
            Some(Value::Oid(oid)) => Ok(Discriminator::Oid(oid.clone())),
            Some(Value::Integer(number)) => i64::try_from(*number)
                .map(Discriminator::Number)
                .map_err(|_| Notice::UnboundDiscriminator(key.to_string())),
            Some(Value::Absent(Some(default))) => match default.as_ref() {
                Value::Oid(oid) => Ok(Discriminator::Oid(oid.clone())),
                Value::Integer(number) => i64::try_from(*number)
                    .map(Discriminator::Number)
                    .map_err(|_| Notice::UnboundDiscriminator(key.to_string())),
                _ => Err(Notice::UnboundDiscriminator(key.to_string())),
            },
            _ => Err(Notice::UnboundDiscriminator(key.to_string())),
        }
    }

    /// Applies the display hook and publishes the value if the slot binds it
    pub fn finish(&mut self, slot: &Slot<'s>, node: &mut ParseNode) {
        if let Some(display) = slot.format.and_then(|format| format.apply(&node.value)) {
            node.display = Some(display);
        } else if let Value::Oid(oid) = &node.value {
            if let Some(name) = self.registry.name_of(oid) {
                node.display = Some(format!("{} ({})", name, oid));
            }
        }
        if let Some(key) = slot.binds {
            self.bindings.push((key, node.value.clone()));
        }
        log::trace!(
            "{} {} at bit {} ({} bits)",
            node.kind,
            node.label,
            node.bit_offset,
            node.bit_len
        );
    }

    /// The node for an OPTIONAL or DEFAULT field that is not present, if requested. A DEFAULT
    /// value is published as if it had been decoded.
    pub fn absent(&mut self, slot: &Slot<'s>, bit_offset: usize) -> Option<ParseNode> {
        let default = match slot.presence {
            Some(Presence::Default(value)) => Some(value),
            _ => None,
        };
        if let (Some(key), Some(value)) = (slot.binds, default) {
            self.bindings.push((key, value.clone()));
        }
        if self.config.emit_absent {
            let value = Value::Absent(default.map(|value| Box::new(value.clone())));
            Some(
                ParseNode::new(slot.name, slot.schema.kind_name(), value)
                    .with_span(bit_offset, 0),
            )
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'s>(
        types: &'s TypeTable,
        registry: &'s TypeRegistry,
        config: &'s DecodeConfig,
    ) -> DecodeContext<'s> {
        DecodeContext::new(Rule::Ber, types, registry, config)
    }

    #[test]
    fn test_nested_enforces_depth() {
        let types = TypeTable::new();
        let registry = TypeRegistry::new();
        let config = DecodeConfig {
            max_depth: 2,
            ..DecodeConfig::default()
        };
        let mut ctx = context(&types, &registry, &config);
        let result = ctx.nested(|ctx| ctx.nested(|ctx| ctx.nested(|_| Ok(()))));
        assert_eq!(
            &ErrorKind::RecursionLimitExceeded { limit: 2 },
            result.unwrap_err().kind()
        );
        // the depth is restored after a failure
        assert!(ctx.nested(|ctx| ctx.nested(|_| Ok(()))).is_ok());
    }

    #[test]
    fn test_bindings_are_scoped() {
        let types = TypeTable::new();
        let registry = TypeRegistry::new();
        let config = DecodeConfig::default();
        let field = Field::new("type", Schema::object_identifier()).binds("type");
        let slot = Slot::from(&field);
        let mut ctx = context(&types, &registry, &config);

        let mark = ctx.mark();
        let mut node = ParseNode::new("type", "OBJECT IDENTIFIER", Value::Oid("1.2.3".into()));
        ctx.finish(&slot, &mut node);
        assert_eq!(
            Ok(Discriminator::from("1.2.3")),
            ctx.discriminator("type")
        );
        ctx.release(mark);
        assert_eq!(
            Err(Notice::UnboundDiscriminator("type".to_string())),
            ctx.discriminator("type")
        );
    }

    #[test]
    fn test_absent_default_is_published() {
        let types = TypeTable::new();
        let registry = TypeRegistry::new();
        let config = DecodeConfig {
            emit_absent: true,
            ..DecodeConfig::default()
        };
        let field = Field::new("version", Schema::integer())
            .default(Value::Integer(0))
            .binds("version");
        let mut ctx = context(&types, &registry, &config);
        let node = ctx.absent(&Slot::from(&field), 16).unwrap();
        assert_eq!(
            Value::Absent(Some(Box::new(Value::Integer(0)))),
            node.value
        );
        assert_eq!(16, node.bit_offset);
        assert_eq!(Ok(Discriminator::Number(0)), ctx.discriminator("version"));
    }
}
