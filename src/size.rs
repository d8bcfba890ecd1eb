//! Payload size calculator.
//!
//! Walks a metadata tree bottom-up and fills in the `size`, `count`,
//! `padding` and `type` attributes of every chunk and tuple:
//!
//! * a leaf's value size is `size * count` (a missing or zero count is one);
//! * a nested tuple's value size is the sum of the encoded sizes of its
//!   children;
//! * every value is padded to a whole number of 4-byte segments;
//! * a tuple is encoded with an 8-byte header, a chunk with a 4-byte header,
//!   and the size of a chunk is counted in segments rather than bytes.
//!
//! The calculator never fails. Inconsistent input (a nested tuple with a
//! scalar type, an unknown type code) still gets a best-effort size and is
//! left for [`crate::validate`] to report.

use tracing::debug;

use crate::schema::is_encoding_curve;
use crate::tuple::{Chunk, Container, Leaf, Metadata, Tuple};
use crate::types::{
    padding_for, size_in_segments, tuple_total_size, TypeTable, CHUNK_HEADER_SIZE, NESTED_TYPE,
    OPAQUE_TYPE, SEGMENT_SIZE, TUPLE_HEADER_SIZE,
};

/// Type code assigned to a tuple that was authored without one.
pub fn default_tuple_type(tag: &str) -> char {
    if is_encoding_curve(tag) {
        OPAQUE_TYPE
    } else {
        NESTED_TYPE
    }
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

/// Annotate every chunk and tuple in the test case with its size and padding.
///
/// Returns the encoded size of all chunks in bytes.
pub fn compute_sizes(metadata: &mut Metadata, types: &TypeTable) -> usize {
    debug!("metadata");
    let total = metadata
        .chunks
        .iter_mut()
        .map(|chunk| chunk_size_at(chunk, types, 1))
        .fold(0, usize::saturating_add);
    debug!("metadata total: {total} bytes");
    total
}

/// Annotate a chunk and its tuples, returning the encoded chunk length in
/// bytes (payload segments plus the chunk header).
pub fn compute_chunk_size(chunk: &mut Chunk, types: &TypeTable) -> usize {
    chunk_size_at(chunk, types, 0)
}

/// Annotate a tuple and its nested tuples, returning the encoded tuple length
/// in bytes (header, value and padding).
pub fn compute_tuple_size(tuple: &mut Tuple, types: &TypeTable) -> usize {
    tuple_size_at(tuple, types, 0)
}

fn chunk_size_at(chunk: &mut Chunk, types: &TypeTable, level: usize) -> usize {
    debug!("{}chunk {}", indent(level), chunk.tag);

    let bytes = chunk
        .tuples
        .iter_mut()
        .map(|tuple| tuple_size_at(tuple, types, level + 1))
        .fold(0, usize::saturating_add);
    let segments = size_in_segments(bytes);
    chunk.size = Some(segments);

    debug!("{}chunk {} size: {segments} segments", indent(level), chunk.tag);
    SEGMENT_SIZE.saturating_mul(segments).saturating_add(CHUNK_HEADER_SIZE)
}

fn tuple_size_at(tuple: &mut Tuple, types: &TypeTable, level: usize) -> usize {
    match tuple {
        Tuple::Container(container) if !container.children.is_empty() => {
            container_size(container, types, level)
        }
        Tuple::Container(container) => {
            // Nested tuple with an empty payload is encoded as a bare header.
            container.type_code.get_or_insert_with(|| default_tuple_type(&container.tag));
            container.size = Some(0);
            container.padding = Some(0);
            TUPLE_HEADER_SIZE
        }
        Tuple::Leaf(leaf) => leaf_size(leaf, types, level),
    }
}

fn container_size(container: &mut Container, types: &TypeTable, level: usize) -> usize {
    debug!("{}tuple {}", indent(level), container.tag);

    container.type_code.get_or_insert_with(|| default_tuple_type(&container.tag));

    let size = container
        .children
        .iter_mut()
        .map(|child| tuple_size_at(child, types, level + 1))
        .fold(0, usize::saturating_add);
    let padding = padding_for(size);
    container.size = Some(size);
    container.padding = Some(padding);

    let total = tuple_total_size(size);
    debug!(
        "{}tuple {}, value size: {size} bytes, padding: {padding}, tuple size: {total}",
        indent(level),
        container.tag
    );
    total
}

fn leaf_size(leaf: &mut Leaf, types: &TypeTable, level: usize) -> usize {
    let type_code = *leaf.type_code.get_or_insert_with(|| default_tuple_type(&leaf.tag));
    let repeat = types.has_repeat_count(type_code);

    // A count on a type without repeat counts is not applicable.
    let count = if repeat { leaf.count.unwrap_or(0).max(1) } else { 1 };
    leaf.count = repeat.then_some(count);

    let Some(size) = leaf.size else {
        // Tuple without a value: the encoding is the header alone.
        leaf.size = Some(0);
        leaf.padding = Some(0);
        debug!("{}tuple {} has no value", indent(level), leaf.tag);
        return TUPLE_HEADER_SIZE;
    };

    let value_size = size.saturating_mul(count);
    let padding = padding_for(value_size);
    leaf.padding = Some(padding);

    let total = tuple_total_size(value_size);
    debug!(
        "{}tuple {}, value size: {value_size} bytes, padding: {padding}, tuple size: {total}",
        indent(level),
        leaf.tag
    );
    total
}

/// Encoded size of a tuple derived from its authored attributes, without
/// modifying it. Stored `size` attributes of nested tuples are ignored in
/// favour of their children.
pub fn encoded_size(tuple: &Tuple, types: &TypeTable) -> usize {
    match tuple {
        Tuple::Container(container) if !container.children.is_empty() => {
            tuple_total_size(payload_size(&container.children, types))
        }
        Tuple::Container(_) => TUPLE_HEADER_SIZE,
        Tuple::Leaf(leaf) => match leaf.size {
            None => TUPLE_HEADER_SIZE,
            Some(size) => tuple_total_size(size.saturating_mul(effective_count(leaf, types))),
        },
    }
}

/// Sum of the encoded sizes of a list of tuples.
pub fn payload_size(tuples: &[Tuple], types: &TypeTable) -> usize {
    tuples
        .iter()
        .map(|tuple| encoded_size(tuple, types))
        .fold(0, usize::saturating_add)
}

/// Repeat count used for the value size of a leaf.
pub fn effective_count(leaf: &Leaf, types: &TypeTable) -> usize {
    let type_code = leaf.type_code.unwrap_or_else(|| default_tuple_type(&leaf.tag));
    if types.has_repeat_count(type_code) {
        leaf.count.unwrap_or(0).max(1)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_tuple_is_header_only() {
        let types = TypeTable::standard();
        let mut tuple = Tuple::marker("DEVC");
        assert_eq!(compute_tuple_size(&mut tuple, &types), 8);
        assert_eq!(tuple.type_code(), Some('0'));
        assert_eq!(tuple.size(), Some(0));
        assert_eq!(tuple.padding(), Some(0));
    }

    #[test]
    fn encoding_curve_defaults_to_opaque_type() {
        let types = TypeTable::standard();
        let mut curve = Tuple::nested("LOGA", vec![Tuple::leaf("LOGb", 'f', 4, "10.0")]);
        assert_eq!(compute_tuple_size(&mut curve, &types), 8 + 12);
        assert_eq!(curve.type_code(), Some('P'));
        assert_eq!(curve.size(), Some(12));
        assert_eq!(curve.padding(), Some(0));
    }

    #[test]
    fn count_dropped_for_strings() {
        let types = TypeTable::standard();
        let mut tuple = Tuple::Leaf(Leaf {
            tag: "LAYN".into(),
            type_code: Some('c'),
            size: Some(5),
            count: Some(0),
            padding: None,
            value: Some("Layer".into()),
        });
        assert_eq!(compute_tuple_size(&mut tuple, &types), 16);
        assert_eq!(tuple.count(), None);
        assert_eq!(tuple.padding(), Some(3));
    }

    #[test]
    fn zero_count_becomes_one_for_repeat_types() {
        let types = TypeTable::standard();
        let mut tuple = Tuple::repeated("TICK", 'L', 4, 0, "1000");
        assert_eq!(compute_tuple_size(&mut tuple, &types), 12);
        assert_eq!(tuple.count(), Some(1));
    }

    #[test]
    fn empty_container_is_header_only() {
        let types = TypeTable::standard();
        let mut tuple = Tuple::nested("STRM", vec![]);
        assert_eq!(compute_tuple_size(&mut tuple, &types), 8);
        assert_eq!(tuple.size(), Some(0));
    }
}
