//! In-memory representation of metadata tuples, chunks and test cases.
//!
//! A [`Tuple`] is either a leaf carrying a serialized value or a container
//! whose value is a list of nested tuples. The `size`, `count` and `padding`
//! attributes are filled in by [`crate::size::compute_sizes`]; everything else
//! is authored by the generator or read from an input file.
//!
//! The JSON form mirrors the CSV columns: every attribute is a string and the
//! `value` of a nested tuple is a list of tuples.

use serde::{Deserialize, Serialize};

use crate::error::MetaError;

/// A tuple whose value is a serialized payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Leaf {
    pub tag: String,
    pub type_code: Option<char>,
    /// Size of one element in bytes.
    pub size: Option<usize>,
    /// Repeat count, only meaningful for repeat-bearing types.
    pub count: Option<usize>,
    pub padding: Option<usize>,
    pub value: Option<String>,
}

/// A tuple whose value is a list of nested tuples.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Container {
    pub tag: String,
    pub type_code: Option<char>,
    /// Total size of the nested tuples in bytes.
    pub size: Option<usize>,
    pub padding: Option<usize>,
    pub children: Vec<Tuple>,
}

/// One metadata tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTuple", into = "RawTuple")]
pub enum Tuple {
    Leaf(Leaf),
    Container(Container),
}

impl Tuple {
    /// Build a leaf tuple without a repeat count.
    pub fn leaf(tag: &str, type_code: char, size: usize, value: impl Into<String>) -> Self {
        Tuple::Leaf(Leaf {
            tag: tag.to_string(),
            type_code: Some(type_code),
            size: Some(size),
            value: Some(value.into()),
            ..Leaf::default()
        })
    }

    /// Build a leaf tuple with a repeat count.
    pub fn repeated(
        tag: &str,
        type_code: char,
        size: usize,
        count: usize,
        value: impl Into<String>,
    ) -> Self {
        Tuple::Leaf(Leaf {
            tag: tag.to_string(),
            type_code: Some(type_code),
            size: Some(size),
            count: Some(count),
            value: Some(value.into()),
            padding: None,
        })
    }

    /// Build a character string tuple sized from its value.
    pub fn string(tag: &str, value: &str) -> Self {
        Tuple::leaf(tag, crate::types::STRING_TYPE, value.len(), value)
    }

    /// Build a tuple that only carries a tag (no type, size or value).
    pub fn marker(tag: &str) -> Self {
        Tuple::Leaf(Leaf { tag: tag.to_string(), ..Leaf::default() })
    }

    /// Build a nested tuple whose type is filled in when sizes are computed.
    pub fn nested(tag: &str, children: Vec<Tuple>) -> Self {
        Tuple::Container(Container { tag: tag.to_string(), children, ..Container::default() })
    }

    /// Build a nested tuple with an explicit type code.
    pub fn typed_nested(tag: &str, type_code: char, children: Vec<Tuple>) -> Self {
        Tuple::Container(Container {
            tag: tag.to_string(),
            type_code: Some(type_code),
            children,
            ..Container::default()
        })
    }

    /// Build a metadata class instance.
    pub fn class(tag: &str, children: Vec<Tuple>) -> Self {
        Tuple::typed_nested(tag, crate::types::CLASS_TYPE, children)
    }

    pub fn tag(&self) -> &str {
        match self {
            Tuple::Leaf(leaf) => &leaf.tag,
            Tuple::Container(container) => &container.tag,
        }
    }

    pub fn type_code(&self) -> Option<char> {
        match self {
            Tuple::Leaf(leaf) => leaf.type_code,
            Tuple::Container(container) => container.type_code,
        }
    }

    pub fn size(&self) -> Option<usize> {
        match self {
            Tuple::Leaf(leaf) => leaf.size,
            Tuple::Container(container) => container.size,
        }
    }

    pub fn padding(&self) -> Option<usize> {
        match self {
            Tuple::Leaf(leaf) => leaf.padding,
            Tuple::Container(container) => container.padding,
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            Tuple::Leaf(leaf) => leaf.count,
            Tuple::Container(_) => None,
        }
    }

    /// Nested tuples (empty for a leaf).
    pub fn children(&self) -> &[Tuple] {
        match self {
            Tuple::Leaf(_) => &[],
            Tuple::Container(container) => &container.children,
        }
    }

    /// Return true if this tuple holds at least one nested tuple.
    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    /// Turn this tuple into a container holding `children`.
    ///
    /// A leaf keeps its tag and type; its size, count and value are dropped
    /// because the value of a nested tuple is defined by its children.
    pub fn with_children(self, children: Vec<Tuple>) -> Tuple {
        match self {
            Tuple::Leaf(leaf) => Tuple::Container(Container {
                tag: leaf.tag,
                type_code: leaf.type_code,
                size: None,
                padding: None,
                children,
            }),
            Tuple::Container(container) => Tuple::Container(Container { children, ..container }),
        }
    }

    /// Visit this tuple and every nested tuple in depth-first order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Tuple, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at<'a>(&'a self, level: usize, visit: &mut impl FnMut(&'a Tuple, usize)) {
        visit(self, level);
        for child in self.children() {
            child.walk_at(level + 1, visit);
        }
    }
}

/// A top-level chunk of metadata. Its size is counted in segments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawChunk", into = "RawChunk")]
pub struct Chunk {
    pub tag: String,
    pub size: Option<usize>,
    pub tuples: Vec<Tuple>,
}

/// Tag of a small metadata chunk.
pub const SMALL_CHUNK_TAG: &str = "0x4010";
/// Tag of a large metadata chunk.
pub const LARGE_CHUNK_TAG: &str = "0x61";

impl Chunk {
    pub fn new(tag: &str, tuples: Vec<Tuple>) -> Self {
        Self { tag: tag.to_string(), size: None, tuples }
    }

    /// Chunk holding a single class instance.
    pub fn with_class(tag: &str, class_tag: &str, tuples: Vec<Tuple>) -> Self {
        Self::new(tag, vec![Tuple::class(class_tag, tuples)])
    }
}

/// The root of a metadata test case.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    pub chunks: Vec<Chunk>,
}

impl Metadata {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// Number of tuples in the test case, including nested tuples.
    pub fn tuple_count(&self) -> usize {
        let mut count = 0;
        for chunk in &self.chunks {
            for tuple in &chunk.tuples {
                tuple.walk(&mut |_, _| count += 1);
            }
        }
        count
    }
}

// ---------------------------------------------------------------------------
// JSON representation

/// Numeric attribute that may be written as a number or a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum NumberField {
    Int(u64),
    Text(String),
}

impl NumberField {
    fn parse(self, tag: &str, name: &str) -> Result<Option<usize>, MetaError> {
        match self {
            NumberField::Int(n) => usize::try_from(n)
                .map(Some)
                .map_err(|_| MetaError::Parse(format!("tuple {tag}: {name} {n} out of range"))),
            NumberField::Text(text) => parse_number(tag, name, &text),
        }
    }
}

/// Parse an optional numeric attribute; an empty string means absent.
pub fn parse_number(tag: &str, name: &str, text: &str) -> Result<Option<usize>, MetaError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse()
        .map(Some)
        .map_err(|_| MetaError::Parse(format!("tuple {tag}: invalid {name} '{text}'")))
}

/// Parse an optional type code; an empty string means absent.
pub fn parse_type_code(tag: &str, text: &str) -> Result<Option<char>, MetaError> {
    let text = text.trim();
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(code), None) => Ok(Some(code)),
        _ => Err(MetaError::Parse(format!("tuple {tag}: invalid type '{text}'"))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Number(serde_json::Number),
    Tuples(Vec<Tuple>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTuple {
    tag: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_code: Option<NumberField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<NumberField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    count: Option<NumberField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    padding: Option<NumberField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<RawValue>,
}

fn text_field(n: Option<usize>) -> Option<NumberField> {
    n.map(|n| NumberField::Text(n.to_string()))
}

impl TryFrom<RawTuple> for Tuple {
    type Error = MetaError;

    fn try_from(raw: RawTuple) -> Result<Self, Self::Error> {
        let tag = raw.tag;
        let type_code = match raw.type_code {
            None => None,
            Some(NumberField::Int(n)) => parse_type_code(&tag, &n.to_string())?,
            Some(NumberField::Text(text)) => parse_type_code(&tag, &text)?,
        };
        let size = raw.size.map(|f| f.parse(&tag, "size")).transpose()?.flatten();
        let count = raw.count.map(|f| f.parse(&tag, "count")).transpose()?.flatten();
        let padding = raw.padding.map(|f| f.parse(&tag, "padding")).transpose()?.flatten();

        Ok(match raw.value {
            Some(RawValue::Tuples(children)) => {
                Tuple::Container(Container { tag, type_code, size, padding, children })
            }
            value => Tuple::Leaf(Leaf {
                tag,
                type_code,
                size,
                count,
                padding,
                value: match value {
                    Some(RawValue::Text(text)) => Some(text),
                    Some(RawValue::Number(n)) => Some(n.to_string()),
                    _ => None,
                },
            }),
        })
    }
}

impl From<Tuple> for RawTuple {
    fn from(tuple: Tuple) -> Self {
        match tuple {
            Tuple::Leaf(leaf) => RawTuple {
                tag: leaf.tag,
                type_code: leaf.type_code.map(|c| NumberField::Text(c.to_string())),
                size: text_field(leaf.size),
                count: text_field(leaf.count),
                padding: text_field(leaf.padding),
                value: leaf.value.map(RawValue::Text),
            },
            Tuple::Container(container) => RawTuple {
                tag: container.tag,
                type_code: container.type_code.map(|c| NumberField::Text(c.to_string())),
                size: text_field(container.size),
                count: None,
                padding: text_field(container.padding),
                value: Some(RawValue::Tuples(container.children)),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawChunk {
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<NumberField>,
    #[serde(default)]
    value: Vec<Tuple>,
}

impl TryFrom<RawChunk> for Chunk {
    type Error = MetaError;

    fn try_from(raw: RawChunk) -> Result<Self, Self::Error> {
        let size = raw.size.map(|f| f.parse(&raw.tag, "size")).transpose()?.flatten();
        Ok(Chunk { tag: raw.tag, size, tuples: raw.value })
    }
}

impl From<Chunk> for RawChunk {
    fn from(chunk: Chunk) -> Self {
        RawChunk { tag: chunk.tag, size: text_field(chunk.size), value: chunk.tuples }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_strings_and_numbers() {
        let json = r#"[
            {"tag": "LAYN", "type": "c", "size": "8", "value": "Layer001"},
            {"tag": "VEND", "type": "B", "size": 1, "count": "5", "value": "1 2 3 4 5"},
            {"tag": "DEVC", "type": 0, "value": [{"tag": "DVID", "type": "L", "size": "4", "value": "1"}]}
        ]"#;
        let tuples: Vec<Tuple> = serde_json::from_str(json).unwrap();
        assert_eq!(tuples[0], Tuple::leaf("LAYN", 'c', 8, "Layer001"));
        assert_eq!(tuples[1].count(), Some(5));
        assert_eq!(tuples[2].type_code(), Some('0'));
        assert_eq!(tuples[2].children().len(), 1);
    }

    #[test]
    fn json_writes_attributes_as_strings() {
        let tuple = Tuple::repeated("VEND", 'B', 1, 5, "1 2 3 4 5");
        let json = serde_json::to_value(&tuple).unwrap();
        assert_eq!(json["size"], "1");
        assert_eq!(json["count"], "5");
        assert!(json.get("padding").is_none());
    }

    #[test]
    fn bad_type_code_is_rejected() {
        let json = r#"{"tag": "LAYN", "type": "cc", "size": "8"}"#;
        assert!(serde_json::from_str::<Tuple>(json).is_err());
    }

    #[test]
    fn leaf_becomes_container() {
        let device = Tuple::marker("DEVC").with_children(vec![Tuple::string("DVNM", "Camera")]);
        assert!(matches!(device, Tuple::Container(_)));
        assert_eq!(device.children()[0].tag(), "DVNM");
    }
}
