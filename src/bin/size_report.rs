use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use vc5meta::io_utils::{file_cli_error, io_cli_error, simple_cli_error};
use vc5meta::size::{compute_sizes, effective_count, encoded_size};
use vc5meta::{read_xml_file, Config, Tuple, TypeTable};

/// Print the size and padding of every tuple in an XML test case.
#[derive(Parser)]
struct Args {
    /// XML test case to analyze
    input: PathBuf,
    /// JSON file overriding the standard type table
    #[arg(long)]
    config: Option<PathBuf>,
    /// Only print summary totals
    #[arg(long)]
    summary: bool,
    /// Optional CSV output path for per-tuple results
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Optional JSON output path for per-tuple results
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Serialize)]
struct Record {
    path: String,
    #[serde(rename = "type")]
    type_code: String,
    value_size: usize,
    padding: usize,
    total: usize,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn collect(tuple: &Tuple, parent: &str, types: &TypeTable, records: &mut Vec<Record>) {
    let path = format!("{parent}/{}", tuple.tag());
    let value_size = match tuple {
        Tuple::Leaf(leaf) => leaf.size.unwrap_or(0).saturating_mul(effective_count(leaf, types)),
        Tuple::Container(container) => container.size.unwrap_or(0),
    };
    records.push(Record {
        path: path.clone(),
        type_code: tuple.type_code().map(String::from).unwrap_or_default(),
        value_size,
        padding: tuple.padding().unwrap_or(0),
        total: encoded_size(tuple, types),
    });
    for child in tuple.children() {
        collect(child, &path, types, records);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    vc5meta::logging::init(false);

    let config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| file_cli_error(path, e))?,
        None => Config::default(),
    };
    let mut metadata = read_xml_file(&args.input).map_err(|e| file_cli_error(&args.input, e))?;
    if metadata.chunks.is_empty() {
        return Err(simple_cli_error("test case has no chunks").into());
    }
    let total = compute_sizes(&mut metadata, &config.types);

    let mut records = Vec::new();
    for (index, chunk) in metadata.chunks.iter().enumerate() {
        let parent = format!("chunk[{index}] {}", chunk.tag);
        for tuple in &chunk.tuples {
            collect(tuple, &parent, &config.types, &mut records);
        }
    }

    if !args.summary {
        for record in &records {
            println!(
                "{} {} value: {} padding: {} total: {}",
                record.path, record.type_code, record.value_size, record.padding, record.total
            );
        }
    }

    if let Some(path) = &args.csv {
        let file = File::create(path).map_err(|e| io_cli_error("creating csv", path, e))?;
        let mut wtr = csv::Writer::from_writer(file);
        for record in &records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
    }
    if let Some(path) = &args.json {
        let mut f = File::create(path).map_err(|e| io_cli_error("creating json", path, e))?;
        serde_json::to_writer_pretty(&mut f, &records)?;
        f.write_all(b"\n")?;
    }

    let padding = records.iter().map(|r| r.padding).fold(0, usize::saturating_add);
    println!("#chunks: {}", metadata.chunks.len());
    println!("#tuples: {}", records.len());
    println!("#padding bytes: {padding}");
    println!("#total bytes: {total}");

    Ok(())
}
