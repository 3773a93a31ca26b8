/// lazyhook - deferred hook transform CLI
use lazyhook::analyzer::analyze_unit;
use lazyhook::manifest::{DependencyArity, SlotKind};
use lazyhook::static_value::decode;
use lazyhook::transform::{transform_consumer, transform_unit, TransformContext};
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage() {
    eprintln!("lazyhook v{}", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    lazyhook [OPTIONS] <INPUT>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help           Print this help message");
    eprintln!("    -v, --version        Print version information");
    eprintln!("    -o, --output <FILE>  Write output to FILE (default: stdout)");
    eprintln!("    --manifest           Print the slot manifest of a deferred unit");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("    <INPUT>              Input JavaScript/JSX file (use '-' for stdin)");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    lazyhook Component.jsx");
    eprintln!("    lazyhook -o out.jsx Component.jsx");
    eprintln!("    lazyhook --manifest useCustomHook.jsx");
}

fn print_version() {
    println!("lazyhook {}", VERSION);
}

struct Options {
    input: Option<String>,
    output: Option<String>,
    show_manifest: bool,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();

    let mut input = None;
    let mut output = None;
    let mut show_manifest = false;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                process::exit(0);
            }
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing output file after -o".to_string());
                }
                output = Some(args[i].clone());
            }
            "--manifest" => {
                show_manifest = true;
            }
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => {
                if input.is_some() {
                    return Err("Multiple input files specified".to_string());
                }
                input = Some(arg.to_string());
            }
        }
        i += 1;
    }

    Ok(Options {
        input,
        output,
        show_manifest,
    })
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        Ok(buffer)
    } else {
        let path = Path::new(input);
        if !path.exists() {
            return Err(format!("Input file not found: {}", input));
        }
        fs::read_to_string(path).map_err(|e| format!("Failed to read file '{}': {}", input, e))
    }
}

fn write_output(output: Option<&str>, content: &str) -> Result<(), String> {
    match output {
        Some(file) => fs::write(file, content)
            .map_err(|e| format!("Failed to write file '{}': {}", file, e)),
        None => {
            print!("{}", content);
            io::stdout()
                .flush()
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Render the slot manifest of a deferred unit, one slot per line
fn render_manifest(path: &Path) -> Result<String, String> {
    let manifest = analyze_unit(path).map_err(|e| e.to_string())?;
    let mut out = String::new();
    for (index, slot) in manifest.slots().iter().enumerate() {
        let detail = match &slot.kind {
            SlotKind::Stateful { initial, .. } => format!("initial = {}", decode(initial)),
            SlotKind::WithDeps {
                arity: DependencyArity::Count(count),
                ..
            } => format!("deps = {}", count),
            SlotKind::WithDeps {
                arity: DependencyArity::EveryPass,
                ..
            } => "deps = every pass".to_string(),
            SlotKind::ImperativeHandle | SlotKind::DebugOnly => String::new(),
        };
        out.push_str(&format!(
            "{:>3}  {:<20} {:<22} {}\n",
            index,
            slot.primitive_name(),
            detail,
            slot.span
        ));
    }
    Ok(out)
}

fn run(options: &Options) -> Result<(), String> {
    let input = options
        .input
        .as_deref()
        .ok_or_else(|| "No input file specified".to_string())?;

    if options.show_manifest {
        if input == "-" {
            return Err("--manifest requires a file path".to_string());
        }
        let rendered = render_manifest(Path::new(input))?;
        return write_output(options.output.as_deref(), &rendered);
    }

    let source = read_input(input)?;
    let path = if input == "-" {
        PathBuf::from(".")
    } else {
        PathBuf::from(input)
    };

    let mut context = TransformContext::new();
    let rewritten = transform_consumer(&source, &path, &mut context)
        .map_err(|e| e.to_string())?;
    let result = match rewritten {
        Some(rewritten) => Some(rewritten),
        None => transform_unit(&source, &path).map_err(|e| e.to_string())?,
    };

    // A file on neither side of the contract passes through unchanged.
    write_output(options.output.as_deref(), result.as_deref().unwrap_or(&source))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(err) = run(&options) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
