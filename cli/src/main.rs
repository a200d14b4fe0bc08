use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use mjc::{CompileOptions, Register, TargetConfig, compile_with_options, render_error};
use tracing::debug;

/// mjc - generate stack-machine assembly from an annotated program tree
#[derive(Parser, Debug)]
#[command(name = "mjc")]
#[command(about = "Generate assembly from an annotated program tree", long_about = None)]
struct Args {
    /// Tree dump to compile (if not provided, reads from stdin)
    input: Option<PathBuf>,

    /// Write the assembly here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append the source span of every line as a comment
    #[arg(long)]
    annotate: bool,

    /// Register holding the receiver (e.g. `s2` or `$s2`)
    #[arg(long, value_name = "REGISTER")]
    this_register: Option<Register>,

    /// Register holding the integer tag word
    #[arg(long, value_name = "REGISTER")]
    tag_register: Option<Register>,

    /// Print the frame offset of every local to stderr
    #[arg(long)]
    dump_offsets: bool,
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display())),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .into_diagnostic()
                .wrap_err("failed to read stdin")?;
            Ok(source)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use MJC_LOG or RUST_LOG environment variable to control log level
    // Default to WARN if not set
    let filter = EnvFilter::try_from_env("MJC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = TargetConfig::default();
    if let Some(register) = args.this_register {
        config.this_pointer = register;
    }
    if let Some(register) = args.tag_register {
        config.int_tag = register;
    }

    let source = read_input(args.input.as_ref())?;
    debug!(bytes = source.len(), "read input");

    let options = CompileOptions {
        source_positions: args.annotate,
    };
    let compilation = match compile_with_options(&source, &config, options) {
        Ok(compilation) => compilation,
        Err(e) => {
            render_error(&e);
            std::process::exit(1);
        }
    };

    match &args.output {
        Some(path) => fs::write(path, &compilation.assembly)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", path.display()))?,
        None => io::stdout()
            .write_all(compilation.assembly.as_bytes())
            .into_diagnostic()?,
    }

    if args.dump_offsets {
        let mut stderr = io::stderr().lock();
        for local in &compilation.offsets {
            writeln!(stderr, "{}{}\t{}", local.name, local.id, local.offset).into_diagnostic()?;
        }
    }

    Ok(())
}
