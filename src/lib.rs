//! Tools for building and checking VC-5 metadata test cases.
//!
//! Metadata is a tree of tagged tuples grouped into chunks. The core passes
//! are the payload size calculator ([`compute_sizes`]), which fills in the
//! size and padding of every tuple, the nesting reconstructor
//! ([`reconstruct_nesting`]), which rebuilds the tree from a flat tuple
//! stream, and the [`Validator`], which checks an annotated tree against the
//! type and schema tables.

pub mod compare;
pub mod config;
mod error;
pub mod generate;
pub mod io_utils;
pub mod logging;
pub mod nesting;
pub mod schema;
pub mod size;
pub mod tuple;
pub mod tuple_io;
pub mod types;
pub mod validate;
pub mod xml;

pub use compare::{compare_metadata, Difference};
pub use config::Config;
pub use error::MetaError;
pub use nesting::{flatten_nesting, nest_tuples, reconstruct_nesting, ContainerTags, NestingError};
pub use schema::SchemaTable;
pub use size::{compute_sizes, compute_tuple_size};
pub use tuple::{Chunk, Container, Leaf, Metadata, Tuple};
pub use types::{TypeInfo, TypeTable};
pub use validate::{ValidationReport, Validator, Violation};
pub use xml::{read_xml, read_xml_file, write_xml};
