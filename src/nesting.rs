//! Reconstruction of nested tuples from a flat tuple stream.
//!
//! Streaming metadata is authored as a flat, depth-first list in which a
//! container tag (a device, a stream) is followed by the tuples it contains.
//! The list carries no closing tuples: a container ends when its own tag
//! appears again (a sibling starts) or when the tag of an enclosing container
//! appears (control returns to an outer level).
//!
//! [`reconstruct_nesting`] rebuilds one level of that structure and recurses
//! for deeper levels, tracking the open containers as an explicit stack.
//! [`nest_tuples`] drives it over a whole list and [`flatten_nesting`] is the
//! inverse transformation.
//!
//! [`group_parameters`] handles the simpler single-level grouping used by
//! layer and encoding curve metadata.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::schema::ENCODING_CURVE_TAGS;
use crate::tuple::Tuple;

/// Errors raised while nesting a flat tuple list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NestingError {
    #[error("tuple {0} is not a container tag")]
    NotAContainer(String),
    #[error("found tuple {tag} before any {expected} tuple")]
    OrphanTuple { tag: String, expected: String },
    #[error("unknown tag {tag} in {context} metadata")]
    UnknownParameter { tag: String, context: String },
}

/// Tags whose logical children follow them in a flat tuple list, ordered
/// from the outermost container to the innermost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerTags {
    tags: Vec<String>,
}

impl ContainerTags {
    pub fn new<S: Into<String>>(tags: impl IntoIterator<Item = S>) -> Self {
        Self { tags: tags.into_iter().map(Into::into).collect() }
    }

    /// Device and stream containers of streaming metadata.
    pub fn streaming() -> Self {
        Self::new(["DEVC", "STRM"])
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// The container that must open a flat list.
    pub fn outermost(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

impl Default for ContainerTags {
    fn default() -> Self {
        Self::streaming()
    }
}

/// Collect the tuples nested in the container `container_tag`.
///
/// `sequence` holds the tuples that follow the container tuple itself and
/// `open_tags` lists the containers that enclose it, outermost first.
/// Returns the children of the container and the unconsumed remainder of the
/// sequence, which starts with the tuple that ended this level (if any).
pub fn reconstruct_nesting(
    mut sequence: VecDeque<Tuple>,
    container_tag: &str,
    open_tags: Vec<String>,
    container_tags: &ContainerTags,
) -> Result<(Vec<Tuple>, VecDeque<Tuple>), NestingError> {
    if !container_tags.contains(container_tag) {
        return Err(NestingError::NotAContainer(container_tag.to_string()));
    }

    let level = open_tags.len();
    let indent = "  ".repeat(level);
    debug!("{indent}open {container_tag}");

    let mut children = Vec::new();
    while let Some(tuple) = sequence.pop_front() {
        let tag = tuple.tag();

        if tag == container_tag {
            // Sibling of the container at this level.
            debug!("{indent}close {container_tag}: {} tuples", children.len());
            sequence.push_front(tuple);
            return Ok((children, sequence));
        }

        if container_tags.contains(tag) {
            if open_tags.iter().any(|open| open == tag) {
                // Container of an enclosing level ends this one too.
                debug!("{indent}close {container_tag} at enclosing {tag}");
                sequence.push_front(tuple);
                return Ok((children, sequence));
            }

            let nested_tag = tag.to_string();
            let mut nested_open = open_tags.clone();
            nested_open.push(container_tag.to_string());
            let (nested, rest) =
                reconstruct_nesting(sequence, &nested_tag, nested_open, container_tags)?;
            sequence = rest;
            children.push(tuple.with_children(nested));
            continue;
        }

        children.push(tuple);
    }

    debug!("{indent}end of tuples in {container_tag}: {} tuples", children.len());
    Ok((children, sequence))
}

/// Nest a flat tuple list under its container tuples.
///
/// The list must begin with the outermost container tag; a tuple that appears
/// before any container is opened is reported as an error.
pub fn nest_tuples(
    tuples: Vec<Tuple>,
    container_tags: &ContainerTags,
) -> Result<Vec<Tuple>, NestingError> {
    let Some(outermost) = container_tags.outermost() else {
        return Ok(tuples);
    };

    let mut sequence: VecDeque<Tuple> = tuples.into();
    let mut nested = Vec::new();
    while let Some(tuple) = sequence.pop_front() {
        if tuple.tag() != outermost {
            return Err(NestingError::OrphanTuple {
                tag: tuple.tag().to_string(),
                expected: outermost.to_string(),
            });
        }
        let tag = tuple.tag().to_string();
        let (children, rest) = reconstruct_nesting(sequence, &tag, Vec::new(), container_tags)?;
        sequence = rest;
        nested.push(tuple.with_children(children));
    }
    Ok(nested)
}

/// Flatten nested container tuples into the depth-first list accepted by
/// [`nest_tuples`]. Each container tuple is kept with an empty payload and is
/// followed by its children.
pub fn flatten_nesting(tuples: &[Tuple], container_tags: &ContainerTags) -> Vec<Tuple> {
    let mut flat = Vec::new();
    for tuple in tuples {
        flatten_into(tuple, container_tags, &mut flat);
    }
    flat
}

fn flatten_into(tuple: &Tuple, container_tags: &ContainerTags, flat: &mut Vec<Tuple>) {
    match tuple {
        Tuple::Container(container) if container_tags.contains(&container.tag) => {
            flat.push(tuple.clone().with_children(Vec::new()));
            for child in &container.children {
                flatten_into(child, container_tags, flat);
            }
        }
        _ => flat.push(tuple.clone()),
    }
}

/// Rules for single-level grouping of parameter tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterGroups {
    /// Name used in error messages.
    pub context: String,
    /// Tags that start a new group.
    pub group_tags: Vec<String>,
    /// Tags allowed inside a group, `None` to allow any tag.
    pub parameter_tags: Option<Vec<String>>,
}

impl ParameterGroups {
    /// Layer tuples and their name and description parameters.
    pub fn layers() -> Self {
        Self {
            context: "layer".into(),
            group_tags: vec!["LAYR".into()],
            parameter_tags: Some(vec!["LAYN".into(), "LAYD".into()]),
        }
    }

    /// Encoding curve tuples and their curve parameters.
    pub fn encoding_curves() -> Self {
        Self {
            context: "encoding curve".into(),
            group_tags: ENCODING_CURVE_TAGS.iter().map(|t| t.to_string()).collect(),
            parameter_tags: None,
        }
    }

    fn is_group(&self, tag: &str) -> bool {
        self.group_tags.iter().any(|t| t == tag)
    }

    fn is_parameter(&self, tag: &str) -> bool {
        self.parameter_tags
            .as_ref()
            .map_or(true, |tags| tags.iter().any(|t| t == tag))
    }
}

/// Group each parameter tuple under the group tuple that precedes it.
pub fn group_parameters(
    tuples: Vec<Tuple>,
    rules: &ParameterGroups,
) -> Result<Vec<Tuple>, NestingError> {
    let mut groups: Vec<(Tuple, Vec<Tuple>)> = Vec::new();

    for tuple in tuples {
        if rules.is_group(tuple.tag()) {
            debug!("begin {} {}", rules.context, tuple.tag());
            groups.push((tuple, Vec::new()));
        } else if !rules.is_parameter(tuple.tag()) {
            return Err(NestingError::UnknownParameter {
                tag: tuple.tag().to_string(),
                context: rules.context.clone(),
            });
        } else if let Some((_, parameters)) = groups.last_mut() {
            parameters.push(tuple);
        } else {
            return Err(NestingError::OrphanTuple {
                tag: tuple.tag().to_string(),
                expected: rules.context.clone(),
            });
        }
    }

    Ok(groups
        .into_iter()
        .map(|(group, parameters)| group.with_children(parameters))
        .collect())
}
