use crate::model::schema::TypeId;
use crate::model::Tag;
use backtrace::Backtrace;
use std::error;
use std::fmt::{Debug, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaErrorKind {
    UndefinedType(TypeId),
    /// Resolving the first tag of a type leads back to the type itself without a tag in between
    CyclicReference(String),
    EmptyChoice(String),
    /// Two alternatives or members may start with the same tag, `None` if one of them is an
    /// untagged open type and thereby matches any tag
    AmbiguousTag { within: String, tag: Option<Tag> },
    /// An untagged open type as alternative of a CHOICE gives no tag to select it by
    UntaggedOpenType { within: String, alternative: String },
    InvalidBounds { within: String },
}

pub struct SchemaError {
    kind: SchemaErrorKind,
    backtrace: Backtrace,
}

impl From<SchemaErrorKind> for SchemaError {
    fn from(kind: SchemaErrorKind) -> Self {
        SchemaError {
            kind,
            backtrace: Backtrace::new_unresolved(),
        }
    }
}

impl PartialEq for SchemaError {
    fn eq(&self, other: &Self) -> bool {
        self.kind.eq(&other.kind)
    }
}

impl SchemaError {
    pub fn kind(&self) -> &SchemaErrorKind {
        &self.kind
    }

    pub fn undefined_type(id: TypeId) -> Self {
        SchemaErrorKind::UndefinedType(id).into()
    }

    pub fn cyclic_reference(name: impl Into<String>) -> Self {
        SchemaErrorKind::CyclicReference(name.into()).into()
    }

    pub fn empty_choice(name: impl Into<String>) -> Self {
        SchemaErrorKind::EmptyChoice(name.into()).into()
    }

    pub fn ambiguous_tag(within: impl Into<String>, tag: Option<Tag>) -> Self {
        SchemaErrorKind::AmbiguousTag {
            within: within.into(),
            tag,
        }
        .into()
    }

    pub fn untagged_open_type(within: impl Into<String>, alternative: impl Into<String>) -> Self {
        SchemaErrorKind::UntaggedOpenType {
            within: within.into(),
            alternative: alternative.into(),
        }
        .into()
    }

    pub fn invalid_bounds(within: impl Into<String>) -> Self {
        SchemaErrorKind::InvalidBounds {
            within: within.into(),
        }
        .into()
    }
}

impl error::Error for SchemaError {}

impl Debug for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for SchemaErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaErrorKind::UndefinedType(id) => {
                write!(f, "The type {:?} is referenced but never defined", id)
            }
            SchemaErrorKind::CyclicReference(name) => {
                write!(f, "The type {} refers to itself without a tag in between", name)
            }
            SchemaErrorKind::EmptyChoice(name) => {
                write!(f, "The CHOICE {} has no alternatives", name)
            }
            SchemaErrorKind::AmbiguousTag {
                within,
                tag: Some(tag),
            } => write!(f, "Within {} the tag {} is not unique", within, tag),
            SchemaErrorKind::AmbiguousTag { within, tag: None } => write!(
                f,
                "Within {} an untagged open type collides with its neighbours",
                within
            ),
            SchemaErrorKind::UntaggedOpenType {
                within,
                alternative,
            } => write!(
                f,
                "The alternative {} of {} is an untagged open type",
                alternative, within
            ),
            SchemaErrorKind::InvalidBounds { within } => {
                write!(f, "The lower bound exceeds the upper bound in {}", within)
            }
        }
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.kind, f)?;
        let mut backtrace = self.backtrace.clone();
        backtrace.resolve();
        writeln!(f)?;
        writeln!(f, "{:?}", backtrace)
    }
}
