use crate::model::err::SchemaError;
use crate::model::schema::{Carrier, Field, Presence, Primitive, Schema, Size, TypeId};
use crate::model::table::TypeTable;
use crate::model::tag::{Tag, TagMode, Tagging};
use std::collections::BTreeSet;

/// Untagged references and choices are followed at most this often while resolving a tag
const MAX_RESOLVE_STEPS: usize = 64;

/// The tags a BER element of some type may start with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSet {
    /// Untagged open type, any element is accepted
    Any,
    Tags(BTreeSet<Tag>),
}

impl TagSet {
    pub fn single(tag: Tag) -> Self {
        let mut tags = BTreeSet::new();
        tags.insert(tag);
        TagSet::Tags(tags)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        match self {
            TagSet::Any => true,
            TagSet::Tags(tags) => tags.contains(&tag),
        }
    }

    /// The smallest tag in canonical order, ITU-T X.680 8.6
    pub fn first(&self) -> Option<Tag> {
        match self {
            TagSet::Any => None,
            TagSet::Tags(tags) => tags.iter().next().copied(),
        }
    }

    /// `Err(None)` if one of both is [`TagSet::Any`] and the other is not empty
    fn disjoint(&self, other: &TagSet) -> Result<(), Option<Tag>> {
        match (self, other) {
            (TagSet::Tags(a), TagSet::Tags(b)) => match a.intersection(b).next() {
                Some(tag) => Err(Some(*tag)),
                None => Ok(()),
            },
            (TagSet::Any, TagSet::Tags(tags)) | (TagSet::Tags(tags), TagSet::Any) => {
                if tags.is_empty() {
                    Ok(())
                } else {
                    Err(None)
                }
            }
            (TagSet::Any, TagSet::Any) => Err(None),
        }
    }

    fn extend(&mut self, other: TagSet) {
        match other {
            TagSet::Any => *self = TagSet::Any,
            TagSet::Tags(other) => {
                if let TagSet::Tags(tags) = self {
                    tags.extend(other);
                }
            }
        }
    }
}

/// The tags a BER element of the given schema may start with
pub fn first_tags(schema: &Schema, types: &TypeTable) -> TagSet {
    TagResolver::new(types).schema_tags(schema)
}

pub struct TagResolver<'a> {
    types: &'a TypeTable,
}

impl<'a> TagResolver<'a> {
    pub const fn new(types: &'a TypeTable) -> TagResolver<'a> {
        TagResolver { types }
    }

    /// Follows references until a concrete schema is reached. `None` for undefined or cyclic
    /// references.
    pub fn resolve<'s>(&self, schema: &'s Schema) -> Option<&'s Schema>
    where
        'a: 's,
    {
        let mut current = schema;
        for _ in 0..MAX_RESOLVE_STEPS {
            match current {
                Schema::Reference(id) => current = self.types.get(*id)?,
                other => return Some(other),
            }
        }
        None
    }

    /// ITU-T X.680 | ISO/IEC 8824-1, 31.2.7: tagging an untagged CHOICE or open type IMPLICIT is
    /// treated as EXPLICIT since there is no tag that could be replaced
    pub fn effective_tagging(&self, field: &Field) -> Option<Tagging> {
        self.effective(field.tagging, &field.schema)
    }

    /// Same as [`TagResolver::effective_tagging`] for a tagging and schema not held by a [`Field`]
    pub fn effective(&self, tagging: Option<Tagging>, schema: &Schema) -> Option<Tagging> {
        let tagging = tagging?;
        match (tagging.mode, self.resolve(schema)) {
            (TagMode::Implicit, Some(Schema::Choice(_))) => Some(Tagging::explicit(tagging.tag)),
            (
                TagMode::Implicit,
                Some(Schema::OpenType(open)),
            ) if open.carrier == Carrier::Any => Some(Tagging::explicit(tagging.tag)),
            _ => Some(tagging),
        }
    }

    /// The tags a field may start with, after applying its tagging
    pub fn field_tags(&self, field: &Field) -> TagSet {
        match field.tagging {
            Some(tagging) => TagSet::single(tagging.tag),
            None => self.schema_tags(&field.schema),
        }
    }

    /// ITU-T X.680 | ISO/IEC 8824-1, 8.6
    /// ITU-T X.680 | ISO/IEC 8824-1, 41, table 8
    pub fn schema_tags(&self, schema: &Schema) -> TagSet {
        self.checked_schema_tags(schema, 0)
            .unwrap_or_else(|_| TagSet::Tags(BTreeSet::new()))
    }

    fn checked_field_tags(&self, field: &Field, steps: usize) -> Result<TagSet, SchemaError> {
        match field.tagging {
            Some(tagging) => Ok(TagSet::single(tagging.tag)),
            None => self.checked_schema_tags(&field.schema, steps),
        }
    }

    fn checked_schema_tags(&self, schema: &Schema, steps: usize) -> Result<TagSet, SchemaError> {
        if steps > MAX_RESOLVE_STEPS {
            return Err(SchemaError::cyclic_reference(self.type_label(schema)));
        }
        match schema {
            Schema::Reference(id) => {
                let referenced = self
                    .types
                    .get(*id)
                    .ok_or_else(|| SchemaError::undefined_type(*id))?;
                self.checked_schema_tags(referenced, steps + 1)
                    .map_err(|e| match e.kind() {
                        crate::model::SchemaErrorKind::CyclicReference(_) => {
                            SchemaError::cyclic_reference(self.type_name(*id))
                        }
                        _ => e,
                    })
            }
            Schema::Choice(choice) => {
                let mut tags = TagSet::Tags(BTreeSet::new());
                for alternative in choice.all_alternatives() {
                    tags.extend(self.checked_field_tags(alternative, steps + 1)?);
                }
                Ok(tags)
            }
            Schema::OpenType(open) => match open.carrier {
                Carrier::Any => Ok(TagSet::Any),
                Carrier::OctetString => Ok(TagSet::single(Tag::DEFAULT_OCTET_STRING)),
            },
            other => Ok(other
                .natural_tag()
                .map(TagSet::single)
                .unwrap_or_else(|| TagSet::Tags(BTreeSet::new()))),
        }
    }

    fn type_name(&self, id: TypeId) -> String {
        self.types
            .name(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", id))
    }

    pub(crate) fn type_label(&self, schema: &Schema) -> String {
        match schema {
            Schema::Sequence(composite) | Schema::Set(composite) => composite.name.clone(),
            Schema::Choice(choice) => choice.name.clone(),
            Schema::Reference(id) => self.type_name(*id),
            other => other.kind_name().to_string(),
        }
    }

    /// Rejects schemas the decoders could not dispatch unambiguously:
    ///  - references to undefined types and cyclic untagged references
    ///  - CHOICEs without alternatives, with alternatives sharing a tag or with an untagged open
    ///    type alternative
    ///  - SETs with members sharing a tag
    ///  - SEQUENCEs where an OPTIONAL or DEFAULT member shares a tag with a following member it
    ///    could be confused with (ITU-T X.680 25.5)
    ///  - bounds where the lower exceeds the upper bound
    pub fn validate(&self, schema: &Schema) -> Result<(), SchemaError> {
        let mut pending = Vec::new();
        self.validate_schema(schema, &mut pending)?;
        self.validate_pending(pending)
    }

    pub(crate) fn validate_definition(&self, id: TypeId, schema: &Schema) -> Result<(), SchemaError> {
        let mut pending = Vec::new();
        self.validate_schema(schema, &mut pending)?;
        // referenced types are checked when the table reaches them
        self.checked_schema_tags(&Schema::Reference(id), 0).map(drop)
    }

    fn validate_pending(&self, mut pending: Vec<TypeId>) -> Result<(), SchemaError> {
        let mut visited = BTreeSet::new();
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let schema = self
                .types
                .get(id)
                .ok_or_else(|| SchemaError::undefined_type(id))?;
            self.checked_schema_tags(schema, 0)?;
            self.validate_schema(schema, &mut pending)?;
        }
        Ok(())
    }

    fn validate_schema(&self, schema: &Schema, pending: &mut Vec<TypeId>) -> Result<(), SchemaError> {
        match schema {
            Schema::Reference(id) => {
                if self.types.get(*id).is_none() {
                    return Err(SchemaError::undefined_type(*id));
                }
                pending.push(*id);
            }
            Schema::Primitive(primitive) => self.validate_primitive(primitive)?,
            Schema::Sequence(composite) => {
                let fields = composite.all_fields().collect::<Vec<_>>();
                for (index, field) in fields.iter().enumerate() {
                    self.validate_field(&composite.name, field, pending)?;
                    if !field.presence.is_optional() {
                        continue;
                    }
                    let tags = self.checked_field_tags(field, 0)?;
                    for following in &fields[index + 1..] {
                        tags.disjoint(&self.checked_field_tags(following, 0)?)
                            .map_err(|tag| SchemaError::ambiguous_tag(&composite.name, tag))?;
                        if matches!(following.presence, Presence::Required) {
                            break;
                        }
                    }
                }
            }
            Schema::Set(composite) => {
                let fields = composite.all_fields().collect::<Vec<_>>();
                for field in &fields {
                    self.validate_field(&composite.name, field, pending)?;
                }
                self.validate_disjoint(&composite.name, &fields)?;
            }
            Schema::Choice(choice) => {
                let alternatives = choice.all_alternatives().collect::<Vec<_>>();
                if alternatives.is_empty() {
                    return Err(SchemaError::empty_choice(&choice.name));
                }
                for alternative in &alternatives {
                    self.validate_field(&choice.name, alternative, pending)?;
                    if self.checked_field_tags(alternative, 0)? == TagSet::Any {
                        return Err(SchemaError::untagged_open_type(
                            &choice.name,
                            &alternative.name,
                        ));
                    }
                }
                self.validate_disjoint(&choice.name, &alternatives)?;
            }
            Schema::SequenceOf(collection) | Schema::SetOf(collection) => {
                self.validate_size(&collection.element.name, &collection.size)?;
                self.validate_field(&collection.element.name, &collection.element, pending)?;
            }
            Schema::OpenType(_) => {}
        }
        Ok(())
    }

    fn validate_field(
        &self,
        within: &str,
        field: &Field,
        pending: &mut Vec<TypeId>,
    ) -> Result<(), SchemaError> {
        self.validate_schema(&field.schema, pending)
            .map_err(|e| match e.kind() {
                crate::model::SchemaErrorKind::InvalidBounds { .. } => {
                    SchemaError::invalid_bounds(format!("{}.{}", within, field.name))
                }
                _ => e,
            })
    }

    fn validate_disjoint(&self, within: &str, fields: &[&Field]) -> Result<(), SchemaError> {
        let tags = fields
            .iter()
            .map(|field| self.checked_field_tags(field, 0))
            .collect::<Result<Vec<_>, _>>()?;
        for (index, set) in tags.iter().enumerate() {
            for other in &tags[index + 1..] {
                set.disjoint(other)
                    .map_err(|tag| SchemaError::ambiguous_tag(within, tag))?;
            }
        }
        Ok(())
    }

    fn validate_primitive(&self, primitive: &Primitive) -> Result<(), SchemaError> {
        match primitive {
            Primitive::Integer(integer) => match (integer.lower, integer.upper) {
                (Some(lower), Some(upper)) if lower > upper => {
                    Err(SchemaError::invalid_bounds(primitive.kind_name()))
                }
                _ => Ok(()),
            },
            Primitive::OctetString(size) => self.validate_size(primitive.kind_name(), size),
            Primitive::BitString(bits) => self.validate_size(primitive.kind_name(), &bits.size),
            Primitive::String(string) => self.validate_size(primitive.kind_name(), &string.size),
            _ => Ok(()),
        }
    }

    fn validate_size(&self, within: &str, size: &Size) -> Result<(), SchemaError> {
        match (size.lower, size.upper) {
            (Some(lower), Some(upper)) if lower > upper => Err(SchemaError::invalid_bounds(within)),
            _ => Ok(()),
        }
    }
}
