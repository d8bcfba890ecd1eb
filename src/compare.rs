//! Structural comparison of metadata test cases.
//!
//! Two test cases are equal when their chunk and tuple trees carry the same
//! attributes in the same order. Formatting differences in the source files
//! (whitespace, attribute order, namespace prefixes) are gone once parsed.

use std::fmt;

use crate::tuple::{Chunk, Metadata, Tuple};

/// First point at which two test cases differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub location: String,
    pub message: String,
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

fn differ(location: &str, message: String) -> Option<Difference> {
    Some(Difference { location: location.to_string(), message })
}

fn show<T: fmt::Debug>(value: &Option<T>) -> String {
    match value {
        Some(value) => format!("{value:?}"),
        None => "none".into(),
    }
}

/// Compare `actual` against `expected`, returning the first difference.
pub fn compare_metadata(expected: &Metadata, actual: &Metadata) -> Option<Difference> {
    for (index, (a, b)) in expected.chunks.iter().zip(&actual.chunks).enumerate() {
        if let Some(difference) = compare_chunk(a, b, index) {
            return Some(difference);
        }
    }
    if expected.chunks.len() != actual.chunks.len() {
        return differ(
            "metadata",
            format!("{} chunks, expected {}", actual.chunks.len(), expected.chunks.len()),
        );
    }
    None
}

fn compare_chunk(expected: &Chunk, actual: &Chunk, index: usize) -> Option<Difference> {
    let location = format!("chunk[{index}]");
    if expected.tag != actual.tag {
        return differ(&location, format!("tag {}, expected {}", actual.tag, expected.tag));
    }
    let location = format!("{location} {}", expected.tag);
    if expected.size != actual.size {
        return differ(
            &location,
            format!("size {}, expected {}", show(&actual.size), show(&expected.size)),
        );
    }
    compare_tuples(&expected.tuples, &actual.tuples, &location)
}

fn compare_tuples(expected: &[Tuple], actual: &[Tuple], parent: &str) -> Option<Difference> {
    for (index, (a, b)) in expected.iter().zip(actual).enumerate() {
        let location = format!("{parent}/{}[{index}]", a.tag());
        if let Some(difference) = compare_tuple(a, b, &location) {
            return Some(difference);
        }
    }
    if expected.len() != actual.len() {
        return differ(parent, format!("{} tuples, expected {}", actual.len(), expected.len()));
    }
    None
}

fn compare_tuple(expected: &Tuple, actual: &Tuple, location: &str) -> Option<Difference> {
    if expected.tag() != actual.tag() {
        return differ(location, format!("tag {}, expected {}", actual.tag(), expected.tag()));
    }

    let attributes = [
        ("type", show(&expected.type_code()), show(&actual.type_code())),
        ("size", show(&expected.size()), show(&actual.size())),
        ("count", show(&expected.count()), show(&actual.count())),
        ("padding", show(&expected.padding()), show(&actual.padding())),
    ];
    for (name, want, got) in attributes {
        if want != got {
            return differ(location, format!("{name} {got}, expected {want}"));
        }
    }

    match (expected, actual) {
        (Tuple::Leaf(a), Tuple::Leaf(b)) if a.value != b.value => {
            differ(location, format!("value {}, expected {}", show(&b.value), show(&a.value)))
        }
        (Tuple::Leaf(_), Tuple::Leaf(_)) => None,
        (Tuple::Container(a), Tuple::Container(b)) => {
            compare_tuples(&a.children, &b.children, location)
        }
        (Tuple::Leaf(_), Tuple::Container(_)) => {
            differ(location, "nested tuples, expected a value".into())
        }
        (Tuple::Container(_), Tuple::Leaf(_)) => {
            differ(location, "value, expected nested tuples".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::read_xml;

    const LAYER: &str = r#"<metadata xmlns="https://www.vc5codec.org/xml/metadata">
        <chunk tag="0x4010" size="6">
          <tuple tag="CFHD" type="E" size="16" padding="0">
            <tuple tag="LAYN" type="c" size="8" padding="0" value="Layer001"/>
          </tuple>
        </chunk>
      </metadata>"#;

    #[test]
    fn formatting_is_ignored() {
        let reordered = r#"<metadata xmlns="https://www.vc5codec.org/xml/metadata"><chunk size="6" tag="0x4010"><tuple padding="0" size="16" type="E" tag="CFHD"><tuple value="Layer001" padding="0" size="8" type="c" tag="LAYN"/></tuple></chunk></metadata>"#;
        let a = read_xml(LAYER).unwrap();
        let b = read_xml(reordered).unwrap();
        assert_eq!(compare_metadata(&a, &b), None);
    }

    #[test]
    fn reports_changed_value() {
        let a = read_xml(LAYER).unwrap();
        let b = read_xml(&LAYER.replace("Layer001", "Layer002")).unwrap();
        let difference = compare_metadata(&a, &b).unwrap();
        assert_eq!(difference.location, "chunk[0] 0x4010/CFHD[0]/LAYN[0]");
        assert!(difference.message.contains("Layer002"));
    }

    #[test]
    fn reports_missing_chunk() {
        let a = read_xml(LAYER).unwrap();
        let difference = compare_metadata(&a, &Metadata::default()).unwrap();
        assert_eq!(difference.location, "metadata");
    }
}
