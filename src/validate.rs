//! Schema and layout verification of annotated test cases.
//!
//! The validator never stops at the first problem: every violation in the
//! tree is collected into a [`ValidationReport`] so one run shows everything
//! that is wrong with a test case.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::schema::SchemaTable;
use crate::size::{default_tuple_type, effective_count, payload_size};
use crate::tuple::{Chunk, Container, Leaf, Metadata, Tuple};
use crate::types::{is_container_type, padding_for, size_in_segments, TypeTable};

/// One schema or layout problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Path of tags from the chunk to the offending tuple.
    pub location: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Outcome of validating a test case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// "Passed" or "Failed".
    pub fn result_str(&self) -> &'static str {
        if self.passed() {
            "Passed"
        } else {
            "Failed"
        }
    }

    fn push(&mut self, location: &str, message: String) {
        debug!("{location}: {message}");
        self.violations.push(Violation { location: location.to_string(), message });
    }
}

/// Checks test cases against a type table and a schema.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    types: &'a TypeTable,
    schema: &'a SchemaTable,
}

impl<'a> Validator<'a> {
    pub fn new(types: &'a TypeTable, schema: &'a SchemaTable) -> Self {
        Self { types, schema }
    }

    /// Validate every chunk of a test case.
    pub fn validate(&self, metadata: &Metadata) -> ValidationReport {
        let mut report = ValidationReport::default();
        for (index, chunk) in metadata.chunks.iter().enumerate() {
            self.check_chunk(chunk, index, &mut report);
        }
        report
    }

    /// Validate a single tuple and its nested tuples.
    pub fn validate_tuple(&self, tuple: &Tuple) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.check_tuple(tuple, "", &mut report);
        report
    }

    fn check_chunk(&self, chunk: &Chunk, index: usize, report: &mut ValidationReport) {
        let location = format!("chunk[{index}] {}", chunk.tag);

        let expected = size_in_segments(payload_size(&chunk.tuples, self.types));
        match chunk.size {
            None => report.push(&location, "missing size".into()),
            Some(size) if size != expected => report.push(
                &location,
                format!("size {size} segments, expected {expected} segments"),
            ),
            Some(_) => {}
        }

        for tuple in &chunk.tuples {
            self.check_tuple(tuple, &location, report);
        }
    }

    fn check_tuple(&self, tuple: &Tuple, parent: &str, report: &mut ValidationReport) {
        let location = if parent.is_empty() {
            tuple.tag().to_string()
        } else {
            format!("{parent}/{}", tuple.tag())
        };

        if tuple.tag().is_empty() {
            report.push(&location, "missing tag".into());
        }

        match tuple {
            Tuple::Container(container) => {
                self.check_container(container, &location, report);
                for child in &container.children {
                    self.check_tuple(child, &location, report);
                }
            }
            Tuple::Leaf(leaf) => {
                self.check_leaf(leaf, &location, report);
                // An empty nested tuple reads back as a leaf.
                if self.schema.is_container(&leaf.tag) {
                    self.check_required_children(&leaf.tag, &[], &location, report);
                }
            }
        }
    }

    /// Resolve the type code of a tuple, reporting unknown codes.
    fn check_type(
        &self,
        type_code: Option<char>,
        tag: &str,
        location: &str,
        report: &mut ValidationReport,
    ) -> Option<char> {
        let code = type_code.unwrap_or_else(|| default_tuple_type(tag));
        if self.types.contains(code) {
            Some(code)
        } else {
            report.push(location, format!("invalid type: {code}"));
            None
        }
    }

    fn check_leaf(&self, leaf: &Leaf, location: &str, report: &mut ValidationReport) {
        let type_code = self.check_type(leaf.type_code, &leaf.tag, location, report);

        match (leaf.size, type_code.and_then(|code| self.types.fixed_size(code))) {
            (None, _) => report.push(location, "missing size".into()),
            (Some(size), Some(element)) if element > 0 && size % element != 0 => {
                report.push(location, format!("wrong size: {size}"))
            }
            _ => {}
        }

        if let Some(code) = type_code {
            let repeat = self.types.has_repeat_count(code);
            match leaf.count {
                None if repeat => report.push(location, "repeat count missing".into()),
                Some(count) if !repeat => {
                    report.push(location, format!("invalid repeat count: {count}"))
                }
                Some(0) => report.push(location, "repeat count must be at least one".into()),
                _ => {}
            }
        }

        if let (Some(padding), Some(size)) = (leaf.padding, leaf.size) {
            let expected = padding_for(size.saturating_mul(effective_count(leaf, self.types)));
            if padding != expected {
                report.push(location, format!("incorrect padding: {padding}, expected {expected}"));
            }
        }
    }

    fn check_container(&self, container: &Container, location: &str, report: &mut ValidationReport) {
        if let Some(code) = self.check_type(container.type_code, &container.tag, location, report) {
            if !is_container_type(code) {
                report.push(location, format!("nested tuple with non-nested type: {code}"));
            }
        }

        let expected = payload_size(&container.children, self.types);
        match container.size {
            None => report.push(location, "missing size".into()),
            Some(size) if size != expected => {
                report.push(location, format!("size {size}, expected {expected}"))
            }
            Some(_) => {}
        }

        if let Some(padding) = container.padding {
            // A nested tuple without children is a bare header.
            let expected = if container.children.is_empty() {
                0
            } else {
                padding_for(container.size.unwrap_or(expected))
            };
            if padding != expected {
                report.push(location, format!("incorrect padding: {padding}, expected {expected}"));
            }
        }

        let Some(children) = self.schema.children(&container.tag) else {
            report.push(location, format!("unknown nested tuple: {}", container.tag));
            return;
        };

        for child in &container.children {
            if !children.contains_key(child.tag()) {
                report.push(location, format!("invalid child {}", child.tag()));
            }
        }

        self.check_required_children(&container.tag, &container.children, location, report);
    }

    fn check_required_children(
        &self,
        tag: &str,
        children: &[Tuple],
        location: &str,
        report: &mut ValidationReport,
    ) {
        for required in self.schema.required_children(tag) {
            if !children.iter().any(|child| child.tag() == required) {
                report.push(location, format!("missing child {required}"));
            }
        }
    }
}
