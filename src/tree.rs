//! The output of a decode: one labelled [`ParseNode`] per decoded field.

use crate::registry::Discriminator;
use serde_derive::Serialize;
use std::fmt::{Display, Formatter, Write};

/// The kind of nodes produced for content the schema does not know: unknown extension additions,
/// unknown CHOICE alternatives and trailing elements of extensible types
pub const UNKNOWN_KIND: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseNode {
    pub label: String,
    /// The ASN.1 kind of the decoded type, `SEQUENCE`, `INTEGER`, ...
    pub kind: &'static str,
    pub value: Value,
    /// Result of the display hook of the field, never replaces [`ParseNode::value`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    pub bit_offset: usize,
    pub bit_len: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ParseNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl ParseNode {
    pub fn new(label: impl Into<String>, kind: &'static str, value: Value) -> Self {
        Self {
            label: label.into(),
            kind,
            value,
            display: None,
            bit_offset: 0,
            bit_len: 0,
            children: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// A node for content that was skipped without being understood
    pub fn unknown(label: impl Into<String>, raw: Vec<u8>, notice: Notice) -> Self {
        let mut node = Self::new(label, UNKNOWN_KIND, Value::Bytes(raw));
        node.notices.push(notice);
        node
    }

    pub fn with_span(mut self, bit_offset: usize, bit_len: usize) -> Self {
        self.bit_offset = bit_offset;
        self.bit_len = bit_len;
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// The first direct child with the given label
    pub fn child(&self, label: &str) -> Option<&ParseNode> {
        self.children.iter().find(|child| child.label == label)
    }

    /// Follows a dot separated path of child labels. A numeric segment selects a child by its
    /// position, `certificate.extensions.0.extnID`.
    pub fn find(&self, path: &str) -> Option<&ParseNode> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| {
                node.child(segment).or_else(|| {
                    segment
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| node.children.get(index))
                })
            })
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self.value, Value::Absent(_))
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.kind == UNKNOWN_KIND
    }

    /// All notices of this node and its descendants, depth first
    pub fn all_notices(&self) -> Vec<&Notice> {
        let mut notices = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            notices.extend(node.notices.iter());
            stack.extend(node.children.iter().rev());
        }
        notices
    }

    /// Moves the node and all its descendants by `bits`, for nodes decoded from a nested buffer
    pub(crate) fn shift(&mut self, bits: usize) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.bit_offset += bits;
            stack.extend(node.children.iter_mut());
        }
    }

    fn render(&self, f: &mut Formatter<'_>, indent: usize) -> std::fmt::Result {
        write!(f, "{:indent$}{} {}", "", self.label, self.kind, indent = indent)?;
        match &self.display {
            Some(display) => write!(f, ": {}", display)?,
            None if !matches!(self.value, Value::None) => write!(f, ": {}", self.value)?,
            None => {}
        }
        for notice in &self.notices {
            write!(f, " [{}]", notice)?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.render(f, indent + 2)?;
        }
        Ok(())
    }
}

/// Renders the tree one node per line, children indented below their parent
impl Display for ParseNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.render(f, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// Constructed types and NULL
    None,
    Boolean(bool),
    Integer(i128),
    Bytes(Vec<u8>),
    Bits { data: Vec<u8>, bit_len: u64 },
    String(String),
    /// Dotted decimal notation
    Oid(String),
    /// The time as encoded, validated against its grammar
    Time(String),
    /// An OPTIONAL or DEFAULT field that is not present, with the default value if any
    Absent(Option<Box<Value>>),
}

impl Value {
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(&bytes[..]),
            Value::Bits { data, .. } => Some(&data[..]),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) | Value::Oid(text) | Value::Time(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "NULL"),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Bytes(bytes) => f.write_str(&hex(bytes)),
            Value::Bits { data, bit_len } => {
                let mut text = String::with_capacity(*bit_len as usize);
                for bit in 0..*bit_len {
                    let set = data
                        .get((bit / 8) as usize)
                        .map(|byte| byte & (0x80 >> (bit % 8)) != 0)
                        .unwrap_or(false);
                    text.push(if set { '1' } else { '0' });
                }
                write!(f, "'{}'B", text)
            }
            Value::String(text) => write!(f, "{:?}", text),
            Value::Oid(oid) => f.write_str(oid),
            Value::Time(time) => f.write_str(time),
            Value::Absent(Some(default)) => write!(f, "absent, default {}", default),
            Value::Absent(None) => write!(f, "absent"),
        }
    }
}

/// Octets as colon separated hex pairs
pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len() * 3);
    for (index, byte) in bytes.iter().enumerate() {
        if index > 0 {
            text.push(':');
        }
        let _ = write!(text, "{:02x}", byte);
    }
    text
}

/// A recoverable condition met while decoding, attached to the node it concerns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Notice {
    /// The discriminator is known, but nothing is registered for it. The content is kept as
    /// opaque bytes.
    UnregisteredOpenType(Discriminator),
    /// No field before the open type published the key it depends on
    UnboundDiscriminator(String),
    UnknownExtension,
    UnknownAlternative,
}

impl Display for Notice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::UnregisteredOpenType(discriminator) => {
                write!(f, "unregistered open type {}", discriminator)
            }
            Notice::UnboundDiscriminator(key) => write!(f, "no value bound to {}", key),
            Notice::UnknownExtension => write!(f, "unknown extension"),
            Notice::UnknownAlternative => write!(f, "unknown alternative"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ParseNode {
        let mut root = ParseNode::new("root", "SEQUENCE", Value::None);
        let mut list = ParseNode::new("list", "SEQUENCE OF", Value::None).with_span(8, 16);
        list.children
            .push(ParseNode::new("item", "INTEGER", Value::Integer(1)).with_span(16, 8));
        list.children
            .push(ParseNode::new("item", "INTEGER", Value::Integer(2)).with_span(24, 8));
        root.children.push(list);
        root.children.push(ParseNode::new(
            "flag",
            "BOOLEAN",
            Value::Absent(Some(Box::new(Value::Boolean(false)))),
        ));
        root
    }

    #[test]
    fn test_find_by_label_and_position() {
        let root = tree();
        assert_eq!(
            Some(2),
            root.find("list.1").and_then(|node| node.value.as_integer())
        );
        assert_eq!(
            Some(1),
            root.find("list.item").and_then(|node| node.value.as_integer())
        );
        assert!(root.find("list.2").is_none());
        assert!(root.find("flag").map(ParseNode::is_absent).unwrap_or(false));
    }

    #[test]
    fn test_shift_moves_descendants() {
        let mut root = tree();
        root.shift(100);
        assert_eq!(Some(124), root.find("list.1").map(|node| node.bit_offset));
        assert_eq!(100, root.bit_offset);
    }

    #[test]
    fn test_render_prefers_display() {
        let mut root = tree();
        root.children[0].children[0].display = Some("one".to_string());
        let text = root.to_string();
        assert!(text.contains("    item INTEGER: one\n"), "{}", text);
        assert!(text.contains("    item INTEGER: 2\n"), "{}", text);
        assert!(text.contains("  flag BOOLEAN: absent, default false\n"), "{}", text);
    }

    #[test]
    fn test_value_display() {
        assert_eq!("de:ad", Value::Bytes(vec![0xDE, 0xAD]).to_string());
        assert_eq!(
            "'101'B",
            Value::Bits {
                data: vec![0b1010_0000],
                bit_len: 3
            }
            .to_string()
        );
    }

    #[test]
    fn test_notices_are_collected() {
        let mut root = tree();
        root.children[0]
            .children
            .push(ParseNode::unknown("item", vec![1], Notice::UnknownExtension));
        assert_eq!(vec![&Notice::UnknownExtension], root.all_notices());
    }
}
