//! DMXP protoc plugin.
//!
//! With no subcommand the binary speaks the protoc plugin protocol: a
//! `CodeGeneratorRequest` on stdin, a `CodeGeneratorResponse` on stdout.
//! The subcommands run the same pipeline outside protoc.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dmxp_compiler::host::{self, HostAdapter, EXIT_MALFORMED_REQUEST, EXIT_SUCCESS};
use dmxp_compiler::options::OPTIONS_PROTO;
use dmxp_compiler::{Compiler, CompilerError, GeneratedFile, GenerationResponse};

mod ui;

#[derive(Parser)]
#[command(name = "protoc-gen-dmxp", version)]
#[command(about = "Generates shared-memory IPC client stubs from DMXP channel options")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate stubs from a serialized FileDescriptorSet
    Generate {
        /// Descriptor set produced by `protoc --include_imports -o <path>`
        #[arg(short, long)]
        descriptor_set: PathBuf,

        /// Files to generate (defaults to every non-library file in the set)
        #[arg(short, long = "file")]
        files: Vec<String>,

        /// Raw parameter string, as passed through `--dmxp_opt`
        #[arg(short, long, default_value = "")]
        param: String,

        /// Target language, appended to the parameter (repeatable)
        #[arg(short, long = "target")]
        targets: Vec<String>,

        /// Output root for generated files
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Print the response as JSON instead of writing files
        #[arg(long)]
        json: bool,
    },

    /// Print dmxp/options.proto, the channel option vocabulary
    OptionsProto,
}

fn main() -> miette::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        None => run_plugin()?,
        Some(Commands::Generate {
            descriptor_set,
            files,
            param,
            targets,
            out,
            json,
        }) => run_generate(&descriptor_set, &files, &build_parameter(&param, &targets), &out, json)?,
        Some(Commands::OptionsProto) => {
            print!("{}", OPTIONS_PROTO);
            EXIT_SUCCESS
        }
    };

    if code != EXIT_SUCCESS {
        std::process::exit(code);
    }
    Ok(())
}

/// Logs go to stderr, filtered by `DMXP_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("DMXP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_plugin() -> miette::Result<i32> {
    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .map_err(|e| CompilerError::io("<stdin>", e.to_string()))?;

    let mut adapter = HostAdapter::default();
    let (envelope, code) = match adapter.handle(&input) {
        Ok(response) => {
            // protoc prints the error field itself
            ui::diagnostics(&response.diagnostics, false);
            (response.encode(), response.exit_code())
        }
        Err(err) => {
            let envelope = host::failure_response(&err.to_string());
            eprintln!("{:?}", miette::Report::new(err));
            (envelope, EXIT_MALFORMED_REQUEST)
        }
    };

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&envelope)
        .and_then(|()| stdout.flush())
        .map_err(|e| CompilerError::io("<stdout>", e.to_string()))?;
    Ok(code)
}

fn run_generate(
    descriptor_set: &Path,
    files: &[String],
    parameter: &str,
    out: &Path,
    json: bool,
) -> miette::Result<i32> {
    let start = Instant::now();
    let bytes = std::fs::read(descriptor_set).map_err(|e| CompilerError::io(descriptor_set, e.to_string()))?;
    let response = Compiler::new().compile_descriptor_set(descriptor_set, &bytes, files, parameter)?;

    if json {
        let rendered = serde_json::to_string_pretty(&response)
            .map_err(|e| miette::miette!("failed to serialize response: {}", e))?;
        println!("{}", rendered);
        return Ok(response.exit_code());
    }

    write_files(out, &response.files)?;
    report(out, &response, start.elapsed().as_millis());
    Ok(response.exit_code())
}

fn report(out: &Path, response: &GenerationResponse, elapsed_ms: u128) {
    eprintln!();
    ui::diagnostics(&response.diagnostics, true);
    if !response.diagnostics.is_empty() {
        eprintln!();
    }

    if !response.files.is_empty() {
        ui::summary(out, &response.files);
    }

    let errors = response.errors().count();
    if errors > 0 {
        ui::error(&format!(
            "{} error{} reported",
            errors,
            if errors == 1 { "" } else { "s" }
        ));
    } else {
        ui::success(&format!("Generated {} files", response.files.len()));
    }
    ui::timing("Completed", elapsed_ms);
    eprintln!();
}

/// Joins the raw parameter string with one `target=` entry per target.
fn build_parameter(param: &str, targets: &[String]) -> String {
    let mut entries: Vec<String> = Vec::new();
    if !param.trim().is_empty() {
        entries.push(param.trim().to_string());
    }
    entries.extend(targets.iter().map(|t| format!("target={}", t)));
    entries.join(",")
}

/// Writes every generated file under `out`, creating directories as needed.
fn write_files(out: &Path, files: &[GeneratedFile]) -> Result<(), CompilerError> {
    for file in files {
        let path = file.path.split('/').fold(out.to_path_buf(), |p, segment| p.join(segment));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CompilerError::io(parent, e.to_string()))?;
        }
        std::fs::write(&path, &file.content).map_err(|e| CompilerError::io(&path, e.to_string()))?;
        tracing::info!(path = %path.display(), target = %file.target, "wrote file");
    }
    Ok(())
}
