use std::fmt;
use std::io;
use std::path::Path;

use crate::MetaError;

#[derive(Debug)]
pub struct CliError {
    pub msg: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Format a user friendly I/O error message with suggestions.
pub fn format_io_error(operation: &str, path: &Path, err: &io::Error) -> String {
    use io::ErrorKind::*;
    let suggestion = match err.kind() {
        NotFound => "Check that the file exists and the path is correct.",
        PermissionDenied => "Check permissions or run as a different user.",
        WriteZero => "Disk may be full. Free up space and try again.",
        _ => "Check the path and permissions.",
    };
    format!(
        "Error {} '{}': {}. {}",
        operation,
        path.display(),
        err,
        suggestion
    )
}

/// Convert an I/O error on an output file into a CLI error.
pub fn io_cli_error(operation: &str, path: &Path, err: io::Error) -> CliError {
    CliError {
        msg: format_io_error(operation, path, &err),
        source: Some(Box::new(err)),
    }
}

/// Simple CLI error from string.
pub fn simple_cli_error(msg: &str) -> CliError {
    CliError {
        msg: msg.to_string(),
        source: None,
    }
}

/// Convert a library error for one file into a CLI error with a hint.
pub fn file_cli_error(path: &Path, err: MetaError) -> CliError {
    let msg = match &err {
        MetaError::Io(io) => format_io_error("processing", path, io),
        other => format!("{}: {}", path.display(), cli_hint(other)),
    };
    CliError {
        msg,
        source: Some(Box::new(err)),
    }
}

/// Convert a library error into a CLI error with a hint.
pub fn meta_cli_error(context: &str, err: MetaError) -> CliError {
    CliError {
        msg: format!("{}: {}", context, cli_hint(&err)),
        source: Some(Box::new(err)),
    }
}

/// Convert a library error raised while combining several input files into
/// a CLI error naming all of them.
pub fn inputs_cli_error<P: AsRef<Path>>(context: &str, paths: &[P], err: MetaError) -> CliError {
    let names: Vec<String> = paths.iter().map(|p| p.as_ref().display().to_string()).collect();
    CliError {
        msg: format!("{} in {}: {}", context, names.join(", "), cli_hint(&err)),
        source: Some(Box::new(err)),
    }
}

/// Return an actionable hint for a library error variant.
pub fn cli_hint(err: &MetaError) -> String {
    use MetaError::*;
    match err {
        Parse(msg) => format!("{msg}. Check the tuple attributes in the input file."),
        Nesting(e) => format!("{e}. Check the order of the tuples in the input file."),
        Xml(msg) => format!("{msg}. The file is not a well-formed metadata test case."),
        Json(e) => format!("{e}. The file is not a valid list of tuples."),
        Csv(e) => format!("{e}. Check the CSV header row and columns."),
        UnknownFileType(ext) => format!("unknown file type '{ext}'. Expected csv, json or xml."),
        Config(msg) => format!("{msg}. Invalid configuration."),
        Io(io) => format!("{io}"),
    }
}
