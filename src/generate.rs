//! Construction of metadata test cases from tuple lists.
//!
//! Every builder returns a [`Metadata`] tree with sizes and padding already
//! computed, ready for the XML or JSON writer.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::Config;
use crate::nesting::{group_parameters, nest_tuples, ParameterGroups};
use crate::size::compute_sizes;
use crate::tuple::{Chunk, Metadata, Tuple, LARGE_CHUNK_TAG, SMALL_CHUNK_TAG};
use crate::tuple_io::write_json_to;
use crate::types::STRING_TYPE;
use crate::MetaError;

/// Class of intrinsic metadata.
pub const INTRINSIC_CLASS: &str = "CFHD";
/// Class of streaming metadata.
pub const STREAMING_CLASS: &str = "GPMF";
/// Class of dark metadata.
pub const DARK_CLASS: &str = "DARK";
/// File name prefix of JSON tuple lists that are wrapped in an intrinsic
/// class instance when merged into a multiclass test case.
pub const SIMPLE_LIST_PREFIX: &str = "simple";
/// Placeholder replaced by the tuple tag in output file templates.
pub const TAG_PLACEHOLDER: &str = "{tag}";

/// Order of the tuples in a generated test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TupleOrder {
    /// Same order as the input files.
    #[default]
    InOrder,
    /// A random permutation of the input.
    Randomize,
    /// The given number of random draws, possibly repeating tuples.
    Duplicates(usize),
}

/// Random number generator seeded for reproducible output when a seed is given.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Reorder the input according to `order`.
pub fn order_tuples<T: Clone, R: Rng + ?Sized>(mut items: Vec<T>, order: TupleOrder, rng: &mut R) -> Vec<T> {
    match order {
        TupleOrder::InOrder => items,
        TupleOrder::Randomize => {
            items.shuffle(rng);
            items
        }
        TupleOrder::Duplicates(_) if items.is_empty() => items,
        TupleOrder::Duplicates(count) => (0..count)
            .map(|_| items[rng.gen_range(0..items.len())].clone())
            .collect(),
    }
}

/// Split the input into at most `chunks` runs of `ceil(len / chunks)` items.
pub fn partition_chunks<T>(items: Vec<T>, chunks: usize) -> Vec<Vec<T>> {
    let length = items.len().div_ceil(chunks.max(1)).max(1);
    let mut items = items.into_iter().peekable();
    let mut partitions = Vec::new();
    while items.peek().is_some() {
        partitions.push(items.by_ref().take(length).collect());
    }
    partitions
}

fn finish(mut metadata: Metadata, config: &Config) -> Metadata {
    let total = compute_sizes(&mut metadata, &config.types);
    debug!("test case with {} chunks: {total} bytes", metadata.chunks.len());
    metadata
}

/// Intrinsic metadata: each partition becomes a small chunk holding one
/// `CFHD` class instance.
pub fn intrinsic_test_case(tuples: Vec<Tuple>, chunks: usize, config: &Config) -> Metadata {
    let chunks = partition_chunks(tuples, chunks)
        .into_iter()
        .map(|part| Chunk::with_class(SMALL_CHUNK_TAG, INTRINSIC_CLASS, part))
        .collect();
    finish(Metadata::new(chunks), config)
}

/// Streaming metadata: the flat tuple list is nested under its device and
/// stream tuples and the devices are partitioned into large chunks holding
/// one `GPMF` class instance each.
pub fn streaming_test_case(
    tuples: Vec<Tuple>,
    chunks: usize,
    config: &Config,
) -> Result<Metadata, MetaError> {
    let devices = nest_tuples(tuples, &config.streaming_containers)?;
    info!("nested streaming metadata into {} devices", devices.len());
    let chunks = partition_chunks(devices, chunks)
        .into_iter()
        .map(|part| Chunk::with_class(LARGE_CHUNK_TAG, STREAMING_CLASS, part))
        .collect();
    Ok(finish(Metadata::new(chunks), config))
}

/// Size every string leaf from the length of its value.
fn size_strings(tuples: &mut [Tuple]) {
    for tuple in tuples {
        match tuple {
            Tuple::Leaf(leaf) if leaf.type_code == Some(STRING_TYPE) => {
                leaf.size = Some(leaf.value.as_deref().map_or(0, str::len));
            }
            Tuple::Leaf(_) => {}
            Tuple::Container(container) => size_strings(&mut container.children),
        }
    }
}

/// Group `LAYR` tuples with the layer name and description that follow them.
pub fn layer_tuples(mut tuples: Vec<Tuple>) -> Result<Vec<Tuple>, MetaError> {
    size_strings(&mut tuples);
    Ok(group_parameters(tuples, &ParameterGroups::layers())?)
}

/// Layer metadata: all layers in one `CFHD` class instance.
pub fn layer_test_case(tuples: Vec<Tuple>, config: &Config) -> Result<Metadata, MetaError> {
    let layers = layer_tuples(tuples)?;
    info!("grouped {} layers", layers.len());
    let chunk = Chunk::with_class(SMALL_CHUNK_TAG, INTRINSIC_CLASS, layers);
    Ok(finish(Metadata::new(vec![chunk]), config))
}

/// Encoding curve metadata: one test case per curve, paired with the curve tag.
pub fn encoding_curve_test_cases(
    tuples: Vec<Tuple>,
    config: &Config,
) -> Result<Vec<(String, Metadata)>, MetaError> {
    let curves = group_parameters(tuples, &ParameterGroups::encoding_curves())?;
    Ok(curves
        .into_iter()
        .map(|curve| {
            let tag = curve.tag().to_string();
            debug!("encoding curve {tag}: {} parameters", curve.children().len());
            let chunk = Chunk::with_class(SMALL_CHUNK_TAG, INTRINSIC_CLASS, vec![curve]);
            (tag, finish(Metadata::new(vec![chunk]), config))
        })
        .collect())
}

/// Identification code of a dark metadata class instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DarkId {
    /// Four character code, type `F`.
    Fourcc(String),
    /// Globally unique identifier, type `G`.
    Guid(String),
}

impl Default for DarkId {
    fn default() -> Self {
        DarkId::Fourcc("TEST".into())
    }
}

impl DarkId {
    fn tuple(&self) -> Tuple {
        match self {
            DarkId::Fourcc(code) => Tuple::repeated("VENI", 'F', 4, 1, code.as_str()),
            DarkId::Guid(guid) => Tuple::repeated("VENI", 'G', 16, 1, guid.as_str()),
        }
    }
}

/// Dark metadata class instance carrying an opaque vendor payload.
///
/// `source` is the name of the file the payload was read from and is
/// appended to the vendor description.
pub fn dark_class(payload: &str, source: Option<&str>, id: &DarkId) -> Tuple {
    let description = match source {
        Some(name) => format!("Dark metadata test case: {name}"),
        None => "Dark metadata test case".to_string(),
    };
    Tuple::class(
        DARK_CLASS,
        vec![
            id.tuple(),
            Tuple::string("VENS", &description),
            Tuple::repeated("VEND", 'B', 1, payload.len(), payload),
        ],
    )
}

/// Class instances placed together in a single large chunk.
pub fn class_instances_test_case(instances: Vec<Tuple>, config: &Config) -> Metadata {
    info!("{} class instances in one chunk", instances.len());
    finish(Metadata::new(vec![Chunk::new(LARGE_CHUNK_TAG, instances)]), config)
}

/// One input of a multiclass test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassList {
    /// Plain intrinsic tuples, wrapped in a `CFHD` class instance.
    Simple(Vec<Tuple>),
    /// Complete class instances, used as they are.
    Instances(Vec<Tuple>),
}

impl ClassList {
    /// Classify a JSON tuple list by its file name.
    pub fn from_file_name(name: &str, tuples: Vec<Tuple>) -> Self {
        if name.starts_with(SIMPLE_LIST_PREFIX) {
            ClassList::Simple(tuples)
        } else {
            ClassList::Instances(tuples)
        }
    }
}

/// Class instances of a multiclass test case, in input order.
pub fn multiclass_instances(lists: Vec<ClassList>) -> Vec<Tuple> {
    let mut instances = Vec::new();
    for list in lists {
        match list {
            ClassList::Simple(tuples) => instances.push(Tuple::class(INTRINSIC_CLASS, tuples)),
            ClassList::Instances(tuples) => instances.extend(tuples),
        }
    }
    instances
}

/// Merge test cases into one by concatenating their chunks.
pub fn merge_test_cases(cases: Vec<Metadata>, config: &Config) -> Metadata {
    let chunks = cases.into_iter().flat_map(|case| case.chunks).collect();
    finish(Metadata::new(chunks), config)
}

/// Nesting applied when converting a CSV tuple list to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvertMode {
    #[default]
    Flat,
    Streaming,
    Layers,
    Curves,
}

/// Convert a flat tuple list into the JSON tuple list for `mode`.
pub fn convert_tuples(tuples: Vec<Tuple>, mode: ConvertMode, config: &Config) -> Result<Vec<Tuple>, MetaError> {
    match mode {
        ConvertMode::Flat => Ok(tuples),
        ConvertMode::Streaming => Ok(nest_tuples(tuples, &config.streaming_containers)?),
        ConvertMode::Layers => layer_tuples(tuples),
        ConvertMode::Curves => Ok(group_parameters(tuples, &ParameterGroups::encoding_curves())?),
    }
}

/// Output path for the tuple `tag` from a template containing `{tag}`.
pub fn expand_template(template: &str, tag: &str) -> Result<PathBuf, MetaError> {
    if !template.contains(TAG_PLACEHOLDER) {
        return Err(MetaError::Config(format!(
            "output template '{template}' has no {TAG_PLACEHOLDER} placeholder"
        )));
    }
    Ok(PathBuf::from(template.replace(TAG_PLACEHOLDER, tag)))
}

/// Write each tuple to its own JSON file named from `template`.
pub fn split_tuples(tuples: Vec<Tuple>, template: &str) -> Result<Vec<PathBuf>, MetaError> {
    let mut paths = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        let path = expand_template(template, tuple.tag())?;
        debug!("writing {} to {}", tuple.tag(), path.display());
        write_json_to(Some(path.as_path()), &[tuple])?;
        paths.push(path);
    }
    Ok(paths)
}
