use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use vc5meta::generate::{
    class_instances_test_case, convert_tuples, dark_class, encoding_curve_test_cases,
    expand_template, intrinsic_test_case, layer_test_case, merge_test_cases,
    multiclass_instances, order_tuples, seeded_rng, split_tuples, streaming_test_case, ClassList,
    ConvertMode, DarkId, TupleOrder,
};
use vc5meta::io_utils::{
    file_cli_error, inputs_cli_error, io_cli_error, meta_cli_error, simple_cli_error, CliError,
};
use vc5meta::tuple_io::{read_tuple_file, write_json_to, FileType};
use vc5meta::xml::{read_xml_file, write_xml_to};
use vc5meta::{compare_metadata, compute_sizes, logging, Config, Metadata, Tuple, Validator};

/// Generate, convert, verify and compare VC-5 metadata test cases.
#[derive(Parser)]
#[command(name = "vc5meta", version)]
struct Cli {
    /// Log every tuple processed
    #[arg(short, long, global = true)]
    verbose: bool,
    /// JSON file overriding the standard type and schema tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a test case from CSV or JSON tuple lists
    Generate(GenerateArgs),
    /// Build a dark metadata test case from a base64 payload or JSON class instances
    Dark(DarkArgs),
    /// Combine class instances from JSON tuple lists into one large chunk
    Multiclass(MulticlassArgs),
    /// Convert CSV tuple lists to a JSON tuple list
    Convert(ConvertArgs),
    /// Combine XML test cases or JSON tuple lists into one file
    Merge(MergeArgs),
    /// Write each tuple of JSON tuple lists to its own file
    Split(SplitArgs),
    /// Recompute the sizes and padding of an XML test case
    Sizes(SizesArgs),
    /// Check XML test cases against the type and schema tables
    Verify(VerifyArgs),
    /// Compare XML test cases against the first one
    Compare(CompareArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Intrinsic,
    Streaming,
    Layers,
    Curves,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Nesting {
    Flat,
    Streaming,
    Layers,
    Curves,
}

impl From<Nesting> for ConvertMode {
    fn from(nesting: Nesting) -> Self {
        match nesting {
            Nesting::Flat => ConvertMode::Flat,
            Nesting::Streaming => ConvertMode::Streaming,
            Nesting::Layers => ConvertMode::Layers,
            Nesting::Curves => ConvertMode::Curves,
        }
    }
}

#[derive(Args)]
struct OrderArgs {
    /// Output the tuples in random order (flat tuple lists only)
    #[arg(long)]
    randomize: bool,
    /// Draw --count random tuples, allowing duplicates
    #[arg(long)]
    duplicates: bool,
    /// Number of tuples drawn with --duplicates
    #[arg(long, default_value_t = 10)]
    count: usize,
    /// Seed for reproducible random output
    #[arg(long)]
    seed: Option<u64>,
}

impl OrderArgs {
    fn order(&self) -> TupleOrder {
        if self.duplicates {
            TupleOrder::Duplicates(self.count)
        } else if self.randomize {
            TupleOrder::Randomize
        } else {
            TupleOrder::InOrder
        }
    }

    fn apply(&self, tuples: Vec<Tuple>) -> Vec<Tuple> {
        order_tuples(tuples, self.order(), &mut seeded_rng(self.seed))
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// CSV or JSON tuple lists
    #[arg(required = true)]
    files: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = Kind::Intrinsic)]
    kind: Kind,
    /// Number of chunks
    #[arg(long, default_value_t = 1)]
    chunks: usize,
    #[command(flatten)]
    order: OrderArgs,
    /// Output file (XML unless the extension is .json); stdout if absent
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write JSON instead of XML
    #[arg(long)]
    json: bool,
    /// Output file name template with a {tag} placeholder (encoding curves)
    #[arg(long)]
    template: Option<String>,
}

#[derive(Args)]
struct DarkArgs {
    /// Base64 payload file, or a JSON list of dark class instances
    input: PathBuf,
    /// GUID used as the vendor identification code instead of a FOURCC
    #[arg(long)]
    guid: Option<String>,
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write the class instance as JSON instead of XML
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MulticlassArgs {
    /// JSON tuple lists; lists named simple* are wrapped in a CFHD class instance
    #[arg(required = true)]
    files: Vec<PathBuf>,
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write the class instances as JSON instead of XML
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ConvertArgs {
    /// CSV tuple lists
    #[arg(required = true)]
    files: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = Nesting::Flat)]
    nesting: Nesting,
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct MergeArgs {
    /// XML test cases or JSON tuple lists (not both)
    #[arg(required = true)]
    files: Vec<PathBuf>,
    #[command(flatten)]
    order: OrderArgs,
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SplitArgs {
    /// JSON tuple lists
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Output file name template with a {tag} placeholder
    #[arg(long)]
    template: String,
}

#[derive(Args)]
struct SizesArgs {
    /// XML test case
    input: PathBuf,
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct VerifyArgs {
    /// XML test cases
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct CompareArgs {
    /// XML test cases; each is compared against the first
    #[arg(required = true, num_args = 2..)]
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => Config::load(path).map_err(|e| file_cli_error(path, e))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Generate(args) => generate(args, &config),
        Command::Dark(args) => dark(args, &config),
        Command::Multiclass(args) => multiclass(args, &config),
        Command::Convert(args) => convert(args, &config),
        Command::Merge(args) => merge(args, &config),
        Command::Split(args) => split(args, &config),
        Command::Sizes(args) => sizes(args, &config),
        Command::Verify(args) => verify(args, &config),
        Command::Compare(args) => compare(args),
    }
}

fn read_inputs(files: &[PathBuf], config: &Config) -> Result<Vec<Tuple>, CliError> {
    let mut tuples = Vec::new();
    for path in files {
        info!("reading {}", path.display());
        tuples.extend(read_tuple_file(path, config).map_err(|e| file_cli_error(path, e))?);
    }
    Ok(tuples)
}

fn wants_json(output: Option<&Path>) -> bool {
    output.is_some_and(|path| matches!(FileType::of(path), Ok(FileType::Json)))
}

fn write_test_case(output: Option<&Path>, json: bool, metadata: &Metadata) -> Result<(), CliError> {
    let written = if json || wants_json(output) {
        write_json_to(output, &metadata.chunks)
    } else {
        write_xml_to(output, metadata)
    };
    written.map_err(|e| match output {
        Some(path) => file_cli_error(path, e),
        None => meta_cli_error("writing test case", e),
    })
}

fn generate(args: GenerateArgs, config: &Config) -> Result<(), CliError> {
    let tuples = read_inputs(&args.files, config)?;
    let metadata = match args.kind {
        Kind::Intrinsic => intrinsic_test_case(args.order.apply(tuples), args.chunks, config),
        Kind::Streaming => streaming_test_case(tuples, args.chunks, config)
            .map_err(|e| inputs_cli_error("streaming metadata", &args.files, e))?,
        Kind::Layers => layer_test_case(tuples, config)
            .map_err(|e| inputs_cli_error("layer metadata", &args.files, e))?,
        Kind::Curves => return generate_curves(tuples, &args, config),
    };
    info!("generated {} tuples in {} chunks", metadata.tuple_count(), metadata.chunks.len());
    write_test_case(args.output.as_deref(), args.json, &metadata)
}

fn generate_curves(tuples: Vec<Tuple>, args: &GenerateArgs, config: &Config) -> Result<(), CliError> {
    let template = args
        .template
        .as_deref()
        .ok_or_else(|| simple_cli_error("encoding curve test cases need --template"))?;
    let cases = encoding_curve_test_cases(tuples, config)
        .map_err(|e| inputs_cli_error("encoding curve metadata", &args.files, e))?;
    for (tag, metadata) in cases {
        let path = expand_template(template, &tag).map_err(|e| meta_cli_error("--template", e))?;
        info!("writing encoding curve {tag} to {}", path.display());
        write_test_case(Some(path.as_path()), args.json, &metadata)?;
    }
    Ok(())
}

fn convert(args: ConvertArgs, config: &Config) -> Result<(), CliError> {
    let tuples = read_inputs(&args.files, config)?;
    let converted = convert_tuples(tuples, args.nesting.into(), config)
        .map_err(|e| inputs_cli_error("converting tuples", &args.files, e))?;
    write_json_to(args.output.as_deref(), &converted)
        .map_err(|e| meta_cli_error("writing tuples", e))
}

fn write_instances(
    output: Option<&Path>,
    json: bool,
    instances: Vec<Tuple>,
    config: &Config,
) -> Result<(), CliError> {
    if json || wants_json(output) {
        write_json_to(output, &instances).map_err(|e| meta_cli_error("writing class instances", e))
    } else {
        write_test_case(output, false, &class_instances_test_case(instances, config))
    }
}

fn dark(args: DarkArgs, config: &Config) -> Result<(), CliError> {
    info!("reading {}", args.input.display());
    let instances = if matches!(FileType::of(&args.input), Ok(FileType::Json)) {
        read_tuple_file(&args.input, config).map_err(|e| file_cli_error(&args.input, e))?
    } else {
        let payload = std::fs::read_to_string(&args.input)
            .map_err(|e| io_cli_error("reading", &args.input, e))?;
        let id = args.guid.clone().map_or_else(DarkId::default, DarkId::Guid);
        let source = args.input.file_name().map(|name| name.to_string_lossy());
        vec![dark_class(payload.trim(), source.as_deref(), &id)]
    };
    write_instances(args.output.as_deref(), args.json, instances, config)
}

fn multiclass(args: MulticlassArgs, config: &Config) -> Result<(), CliError> {
    let mut lists = Vec::with_capacity(args.files.len());
    for path in &args.files {
        if FileType::of(path).ok() != Some(FileType::Json) {
            return Err(simple_cli_error(&format!("not a JSON file: {}", path.display())));
        }
        info!("reading {}", path.display());
        let tuples = read_tuple_file(path, config).map_err(|e| file_cli_error(path, e))?;
        let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
        lists.push(ClassList::from_file_name(&name, tuples));
    }
    write_instances(args.output.as_deref(), args.json, multiclass_instances(lists), config)
}

fn merge(args: MergeArgs, config: &Config) -> Result<(), CliError> {
    let types = args
        .files
        .iter()
        .map(|path| FileType::of(path).map_err(|e| file_cli_error(path, e)))
        .collect::<Result<Vec<_>, _>>()?;
    if types.windows(2).any(|pair| pair[0] != pair[1]) {
        return Err(simple_cli_error("inconsistent file types: merge XML files or JSON files"));
    }

    match types.first() {
        Some(FileType::Xml) => {
            let mut cases = Vec::with_capacity(args.files.len());
            for path in &args.files {
                cases.push(read_xml_file(path).map_err(|e| file_cli_error(path, e))?);
            }
            let merged = merge_test_cases(cases, config);
            info!("merged {} chunks", merged.chunks.len());
            write_test_case(args.output.as_deref(), false, &merged)
        }
        Some(FileType::Json) => {
            let tuples = args.order.apply(read_inputs(&args.files, config)?);
            write_json_to(args.output.as_deref(), &tuples)
                .map_err(|e| meta_cli_error("writing tuples", e))
        }
        _ => Err(simple_cli_error("merge expects XML or JSON files")),
    }
}

fn split(args: SplitArgs, config: &Config) -> Result<(), CliError> {
    for path in &args.files {
        if FileType::of(path).ok() != Some(FileType::Json) {
            return Err(simple_cli_error(&format!("not a JSON file: {}", path.display())));
        }
    }
    let tuples = read_inputs(&args.files, config)?;
    let paths = split_tuples(tuples, &args.template).map_err(|e| meta_cli_error("splitting tuples", e))?;
    info!("wrote {} files", paths.len());
    Ok(())
}

fn sizes(args: SizesArgs, config: &Config) -> Result<(), CliError> {
    let mut metadata = read_xml_file(&args.input).map_err(|e| file_cli_error(&args.input, e))?;
    let total = compute_sizes(&mut metadata, &config.types);
    info!("{}: {total} bytes", args.input.display());
    write_test_case(args.output.as_deref(), false, &metadata)
}

fn verify(args: VerifyArgs, config: &Config) -> Result<(), CliError> {
    let validator = Validator::new(&config.types, &config.schema);
    let mut failed = 0;
    for path in &args.files {
        let result = match read_xml_file(path) {
            Ok(metadata) => {
                let report = validator.validate(&metadata);
                for violation in &report.violations {
                    println!("{violation}");
                }
                report.result_str()
            }
            Err(e) => {
                eprintln!("{}", file_cli_error(path, e));
                "Failed"
            }
        };
        if result == "Failed" {
            failed += 1;
        }
        println!("{result}: {}", path.display());
    }

    if failed > 0 {
        return Err(simple_cli_error(&format!(
            "{failed} of {} files failed verification",
            args.files.len()
        )));
    }
    Ok(())
}

fn compare(args: CompareArgs) -> Result<(), CliError> {
    let read = |path: &PathBuf| read_xml_file(path).map_err(|e| file_cli_error(path, e));
    let (first, rest) = args
        .files
        .split_first()
        .ok_or_else(|| simple_cli_error("nothing to compare"))?;
    let expected = read(first)?;

    let mut different = 0;
    for path in rest {
        let actual = read(path)?;
        match compare_metadata(&expected, &actual) {
            None => println!("Same: {}", path.display()),
            Some(difference) => {
                different += 1;
                println!("Different: {}: {difference}", path.display());
            }
        }
    }

    if different > 0 {
        return Err(simple_cli_error(&format!("{different} files differ from {}", first.display())));
    }
    Ok(())
}
