use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::nesting::ContainerTags;
use crate::schema::SchemaTable;
use crate::types::TypeTable;
use crate::MetaError;

/// Tables shared by the generator, the size calculator and the validator.
///
/// The tables are loaded once when a tool starts and passed by reference to
/// every pass that needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data type codes, their repeat flag and fixed size.
    pub types: TypeTable,
    /// Legal children of every nested tuple.
    pub schema: SchemaTable,
    /// Container tags of streaming metadata, outermost first.
    pub streaming_containers: ContainerTags,
    /// Tags dropped from input files (spurious tuples recorded by some
    /// devices).
    pub skip_tags: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            types: TypeTable::standard(),
            schema: SchemaTable::standard(),
            streaming_containers: ContainerTags::streaming(),
            skip_tags: vec!["sdeg".into(), "drad".into()],
        }
    }
}

impl Config {
    /// Load a configuration file in JSON format.
    ///
    /// Fields missing from the file keep their standard values. Schema entries
    /// in the file are added to the standard schema rather than replacing it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MetaError> {
        let text = fs::read_to_string(path.as_ref())?;
        let overrides: Config = serde_json::from_str(&text)
            .map_err(|e| MetaError::Config(format!("{}: {e}", path.as_ref().display())))?;

        let mut schema = SchemaTable::standard();
        schema.extend(overrides.schema);
        Ok(Self { schema, ..overrides })
    }

    pub fn is_skipped(&self, tag: &str) -> bool {
        self.skip_tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"skip_tags": ["junk"], "schema": {{"VEND": {{"VENx": {{"required": true}}}}}}}}"#)
            .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert!(config.is_skipped("junk"));
        assert!(!config.is_skipped("sdeg"));
        assert_eq!(config.types, TypeTable::standard());
        assert!(config.schema.is_container("VEND"));
        assert!(config.schema.is_container("CFHD"));
    }
}
