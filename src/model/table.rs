use crate::model::err::SchemaError;
use crate::model::schema::{Schema, TypeId};
use crate::model::tag_resolver::TagResolver;

#[derive(Debug, Clone)]
struct Definition {
    name: String,
    schema: Option<Schema>,
}

/// Named type definitions referenced by [`Schema::Reference`].
///
/// A type is first declared, which hands out its [`TypeId`], and defined afterwards. This allows
/// a definition to refer to itself or to types declared later on.
///
/// ```rust
/// use asn1dissect::model::{Composite, Field, Schema, TypeTable};
///
/// let mut types = TypeTable::new();
/// let node = types.declare("Node");
/// types
///     .define(
///         node,
///         Composite::new("Node")
///             .field(Field::new("value", Schema::integer()))
///             .field(Field::new("next", Schema::Reference(node)).explicit(0).optional())
///             .into_sequence(),
///     )
///     .unwrap();
/// assert!(types.validate().is_ok());
/// assert_eq!(Some("Node"), types.name(node));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    definitions: Vec<Definition>,
}

impl TypeTable {
    pub const fn new() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    pub fn declare(&mut self, name: impl Into<String>) -> TypeId {
        self.definitions.push(Definition {
            name: name.into(),
            schema: None,
        });
        TypeId(self.definitions.len() - 1)
    }

    pub fn define(&mut self, id: TypeId, schema: Schema) -> Result<(), SchemaError> {
        match self.definitions.get_mut(id.0) {
            Some(definition) => {
                definition.schema = Some(schema);
                Ok(())
            }
            None => Err(SchemaError::undefined_type(id)),
        }
    }

    /// Declares and defines a type in one go
    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) -> TypeId {
        self.definitions.push(Definition {
            name: name.into(),
            schema: Some(schema),
        });
        TypeId(self.definitions.len() - 1)
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> Option<&Schema> {
        self.definitions
            .get(id.0)
            .and_then(|definition| definition.schema.as_ref())
    }

    #[inline]
    pub fn name(&self, id: TypeId) -> Option<&str> {
        self.definitions
            .get(id.0)
            .map(|definition| definition.name.as_str())
    }

    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.definitions
            .iter()
            .position(|definition| definition.name == name)
            .map(TypeId)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &str, Option<&Schema>)> {
        self.definitions
            .iter()
            .enumerate()
            .map(|(index, definition)| {
                (
                    TypeId(index),
                    definition.name.as_str(),
                    definition.schema.as_ref(),
                )
            })
    }

    /// Checks every definition, see [`TagResolver::validate`]
    pub fn validate(&self) -> Result<(), SchemaError> {
        let resolver = TagResolver::new(self);
        for (id, _name, schema) in self.iter() {
            match schema {
                Some(schema) => resolver.validate_definition(id, schema)?,
                None => return Err(SchemaError::undefined_type(id)),
            }
        }
        Ok(())
    }
}

impl Schema {
    /// Checks this schema and every type it references, see [`TagResolver::validate`]
    pub fn validate(&self, types: &TypeTable) -> Result<(), SchemaError> {
        TagResolver::new(types).validate(self)
    }
}
