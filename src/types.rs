//! Data type table and segment arithmetic shared by the size calculator and
//! the validator.
//!
//! Every tuple carries a single character type code. The table records whether
//! values of that type may be repeated (and therefore carry a `count`
//! attribute) and, for scalar types, the size of one element in bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Size of the alignment unit used for all payloads.
pub const SEGMENT_SIZE: usize = 4;
/// Size of a tuple header (tag, type, size and count) in bytes.
pub const TUPLE_HEADER_SIZE: usize = 8;
/// Size of a chunk header in bytes.
pub const CHUNK_HEADER_SIZE: usize = 4;

/// Type code used for nested tuples without an explicit type.
pub const NESTED_TYPE: char = '0';
/// Type code of a metadata class instance.
pub const CLASS_TYPE: char = 'E';
/// Type code of an opaque nested payload (encoding curves).
pub const OPAQUE_TYPE: char = 'P';
/// Type code of extrinsic data carried inside a class instance.
pub const EXTRINSIC_TYPE: char = 'x';
/// Type code of an ASCII character string.
pub const STRING_TYPE: char = 'c';

/// Largest element size allowed in a tuple that has a repeat count.
pub const REPEAT_SIZE_MAX: usize = 255;
/// Largest repeat count.
pub const REPEAT_COUNT_MAX: usize = 65535;

/// Properties of one data type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Values of this type carry an explicit repeat count.
    pub repeat: bool,
    /// Size of one element for fixed-size scalar types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

impl TypeInfo {
    const fn scalar(size: usize) -> Self {
        Self { repeat: true, size: Some(size) }
    }

    const fn variable() -> Self {
        Self { repeat: false, size: None }
    }
}

/// Mapping from type code to [`TypeInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable {
    entries: BTreeMap<char, TypeInfo>,
}

impl TypeTable {
    /// Build a table from explicit entries.
    pub fn new(entries: impl IntoIterator<Item = (char, TypeInfo)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }

    /// Return the type table defined by the metadata standard.
    pub fn standard() -> Self {
        Self::new([
            ('0', TypeInfo::variable()),
            ('c', TypeInfo::variable()),
            ('b', TypeInfo::scalar(1)),
            ('B', TypeInfo::scalar(1)),
            ('h', TypeInfo::scalar(2)),
            ('f', TypeInfo::scalar(4)),
            ('d', TypeInfo::scalar(8)),
            ('E', TypeInfo::variable()),
            ('F', TypeInfo::scalar(4)),
            ('G', TypeInfo::scalar(16)),
            ('l', TypeInfo::scalar(4)),
            ('L', TypeInfo::scalar(4)),
            ('j', TypeInfo::scalar(8)),
            ('J', TypeInfo::scalar(8)),
            ('P', TypeInfo::variable()),
            ('q', TypeInfo::scalar(4)),
            ('Q', TypeInfo::scalar(8)),
            ('r', TypeInfo::scalar(4)),
            ('R', TypeInfo::scalar(4)),
            ('s', TypeInfo::scalar(2)),
            ('S', TypeInfo::scalar(2)),
            ('x', TypeInfo::variable()),
            ('u', TypeInfo::variable()),
            ('w', TypeInfo::variable()),
            ('U', TypeInfo::scalar(16)),
        ])
    }

    /// Look up a type code.
    pub fn get(&self, code: char) -> Option<&TypeInfo> {
        self.entries.get(&code)
    }

    pub fn contains(&self, code: char) -> bool {
        self.entries.contains_key(&code)
    }

    /// Return true if tuples of this type carry a repeat count.
    ///
    /// Unknown type codes never carry a count.
    pub fn has_repeat_count(&self, code: char) -> bool {
        self.get(code).map_or(false, |info| info.repeat)
    }

    /// Fixed element size of a scalar type.
    pub fn fixed_size(&self, code: char) -> Option<usize> {
        self.get(code).and_then(|info| info.size)
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Return true if the type code denotes a tuple whose value is a list of
/// nested tuples.
pub fn is_container_type(code: char) -> bool {
    matches!(code, NESTED_TYPE | CLASS_TYPE | OPAQUE_TYPE | EXTRINSIC_TYPE)
}

/// Round a size in bytes up to a number of segments.
pub fn size_in_segments(size: usize) -> usize {
    size.div_ceil(SEGMENT_SIZE)
}

/// Padding needed to extend `size` bytes to a segment boundary.
pub fn padding_for(size: usize) -> usize {
    (SEGMENT_SIZE - size % SEGMENT_SIZE) % SEGMENT_SIZE
}

/// Compute the padding of a tuple value with the given element size and
/// repeat count. A missing or zero count means a single element.
pub fn compute_padding(size: usize, count: Option<usize>) -> usize {
    padding_for(value_size(size, count))
}

/// Size of a tuple value in bytes.
pub fn value_size(size: usize, count: Option<usize>) -> usize {
    size.saturating_mul(count.unwrap_or(1).max(1))
}

/// Encoded size of a tuple with the given value size, including its header.
///
/// Saturates instead of overflowing on absurd sizes read from input files.
pub fn tuple_total_size(value_size: usize) -> usize {
    value_size
        .saturating_add(padding_for(value_size))
        .saturating_add(TUPLE_HEADER_SIZE)
}
