//! Reading tuple lists from CSV and JSON files and writing JSON output.
//!
//! A CSV file starts with a header row naming the tuple attributes
//! (`tag,type,size,count,value`); every further row is one tuple. Rows whose
//! tag starts with `#` are comments. Empty cells are absent attributes.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::tuple::{parse_number, parse_type_code, Leaf, Tuple};
use crate::MetaError;

/// Kinds of files handled by the tools, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Json,
    Xml,
}

impl FileType {
    pub fn of(path: &Path) -> Result<Self, MetaError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(FileType::Csv),
            "json" => Ok(FileType::Json),
            "xml" => Ok(FileType::Xml),
            _ => Err(MetaError::UnknownFileType(ext)),
        }
    }
}

/// Read tuples from CSV text, dropping comment rows and skipped tags.
pub fn read_csv_tuples<R: Read>(input: R, config: &Config) -> Result<Vec<Tuple>, MetaError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);
    let headers = reader.headers()?.clone();

    let mut tuples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let tag = headers
            .iter()
            .position(|name| name == "tag")
            .and_then(|index| record.get(index))
            .map_or("", str::trim);
        let mut leaf = Leaf { tag: tag.to_string(), ..Leaf::default() };
        for (name, cell) in headers.iter().zip(record.iter()) {
            match name {
                "type" => leaf.type_code = parse_type_code(&leaf.tag, cell)?,
                "size" => leaf.size = parse_number(&leaf.tag, "size", cell)?,
                "count" => leaf.count = parse_number(&leaf.tag, "count", cell)?,
                "padding" => leaf.padding = parse_number(&leaf.tag, "padding", cell)?,
                "value" if !cell.is_empty() => leaf.value = Some(cell.to_string()),
                _ => {}
            }
        }

        if leaf.tag.is_empty() || leaf.tag.starts_with('#') {
            continue;
        }
        if config.is_skipped(&leaf.tag) {
            warn!("skipping tuple with tag {}", leaf.tag);
            continue;
        }
        tuples.push(Tuple::Leaf(leaf));
    }

    debug!("read {} tuples from CSV", tuples.len());
    Ok(tuples)
}

/// Read any JSON document.
pub fn read_json<T: DeserializeOwned, R: Read>(input: R) -> Result<T, MetaError> {
    Ok(serde_json::from_reader(BufReader::new(input))?)
}

/// Read a JSON list of tuples, dropping skipped tags at any nesting level.
pub fn read_json_tuples<R: Read>(input: R, config: &Config) -> Result<Vec<Tuple>, MetaError> {
    let tuples: Vec<Tuple> = read_json(input)?;
    Ok(drop_skipped(tuples, config))
}

fn drop_skipped(tuples: Vec<Tuple>, config: &Config) -> Vec<Tuple> {
    tuples
        .into_iter()
        .filter(|tuple| {
            let skipped = config.is_skipped(tuple.tag());
            if skipped {
                warn!("skipping tuple with tag {}", tuple.tag());
            }
            !skipped
        })
        .map(|tuple| match tuple {
            Tuple::Container(mut container) => {
                container.children = drop_skipped(container.children, config);
                Tuple::Container(container)
            }
            leaf => leaf,
        })
        .collect()
}

/// Read a CSV or JSON file of tuples.
pub fn read_tuple_file(path: &Path, config: &Config) -> Result<Vec<Tuple>, MetaError> {
    debug!("reading tuples from {}", path.display());
    let file = File::open(path)?;
    match FileType::of(path)? {
        FileType::Csv => read_csv_tuples(file, config),
        FileType::Json => read_json_tuples(file, config),
        FileType::Xml => Err(MetaError::UnknownFileType("xml (expected a tuple list)".into())),
    }
}

/// Write a value as indented JSON followed by a newline.
pub fn write_json<T: Serialize + ?Sized, W: Write>(mut output: W, value: &T) -> Result<(), MetaError> {
    serde_json::to_writer_pretty(&mut output, value)?;
    output.write_all(b"\n")?;
    Ok(())
}

/// Write JSON to a file, or to stdout when no path is given.
pub fn write_json_to<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<(), MetaError> {
    match path {
        Some(path) => write_json(io::BufWriter::new(File::create(path)?), value),
        None => write_json(io::stdout().lock(), value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_comments_and_junk_skipped() {
        let csv = "tag,type,size,count,value\n\
                   #LAYN,c,8,,commented\n\
                   LAYN,c,8,,Layer001\n\
                   sdeg,f,4,1,1.0\n\
                   VEND,B,1,5,1 2 3 4 5\n";
        let tuples = read_csv_tuples(csv.as_bytes(), &Config::default()).unwrap();
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0], Tuple::leaf("LAYN", 'c', 8, "Layer001"));
        assert_eq!(tuples[1], Tuple::repeated("VEND", 'B', 1, 5, "1 2 3 4 5"));
    }

    #[test]
    fn csv_marker_rows_have_no_attributes() {
        let csv = "tag,type,size,count,value\nDEVC,,,,\n";
        let tuples = read_csv_tuples(csv.as_bytes(), &Config::default()).unwrap();
        assert_eq!(tuples, vec![Tuple::marker("DEVC")]);
    }

    #[test]
    fn csv_bad_size_reports_tag() {
        let csv = "tag,type,size,value\nLAYN,c,eight,Layer001\n";
        let err = read_csv_tuples(csv.as_bytes(), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("LAYN"));
    }

    #[test]
    fn csv_error_names_tag_in_last_column() {
        let csv = "type,size,value,tag\nc,eight,Layer001,LAYN\n";
        let err = read_csv_tuples(csv.as_bytes(), &Config::default()).unwrap_err();
        assert_eq!(err.to_string(), "parse error: tuple LAYN: invalid size 'eight'");
    }

    #[test]
    fn file_type_from_extension() {
        assert_eq!(FileType::of(Path::new("a/b.CSV")).unwrap(), FileType::Csv);
        assert!(FileType::of(Path::new("a/b.txt")).is_err());
    }
}
