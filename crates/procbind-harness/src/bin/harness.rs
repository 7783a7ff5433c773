//! CLI entrypoint for the procbind harness.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use procbind::trace;
use procbind_core::config::{TraceLevel, set_trace_level};
use procbind_harness::codegen::{self, CodegenOptions, FieldStyle};
use procbind_harness::structured_log::{self, LogEmitter, LogEntry, LogLevel, Outcome};

/// Probe, export listing and code generation for procbind.
#[derive(Debug, Parser)]
#[command(name = "procbind-harness")]
#[command(about = "Probe libraries and generate procbind symbol tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bind a library against symbol requests and report what resolved.
    Probe {
        /// Library path, bare name or explicit path.
        #[arg(long)]
        library: String,
        /// `NAME`, `NAME@ORDINAL` or `@ORDINAL`; repeatable.
        #[arg(long = "symbol", required = true)]
        symbols: Vec<String>,
        /// Write bind events as structured JSONL to this file.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Run id used in log trace ids.
        #[arg(long, default_value = "probe")]
        run_id: String,
        /// Output report path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the functions an ELF shared object exports.
    Exports {
        /// Shared object file to read; a bare name is looked up in the
        /// system directory on Windows.
        #[arg(long)]
        library: PathBuf,
        /// Output JSON path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate a `symbol_table!` declaration from a library's exports.
    Generate {
        /// Shared object file to read.
        #[arg(long)]
        library: PathBuf,
        /// Struct name (defaults to one derived from the file name).
        #[arg(long)]
        name: Option<String>,
        /// Prefix removed from export names before forming field names.
        #[arg(long, default_value = "")]
        trim_prefix: String,
        /// Keep export casing for field names instead of snake_case.
        #[arg(long)]
        pascal_case: bool,
        /// Output Rust source path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a structured JSONL log file.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
}

fn write_output(output: Option<&Path>, body: &str) -> std::io::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, body)
        }
        None => {
            print!("{body}");
            Ok(())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Probe {
            library,
            symbols,
            log,
            run_id,
            output,
        } => {
            if log.is_some() {
                set_trace_level(TraceLevel::All);
            }
            let report = procbind_harness::probe(procbind::global_binder(), &library, &symbols)?;
            let events = trace::drain();

            if let Some(path) = &log {
                let mut emitter = LogEmitter::to_file(path, "probe", &run_id)?;
                emitter.emit_entry(
                    LogEntry::new(String::new(), LogLevel::Info, "probe_start")
                        .with_library(&library)
                        .with_details(serde_json::json!({ "requests": symbols })),
                )?;
                emitter.emit_bind_events(&events)?;
                let (level, outcome) = if report.ok {
                    (LogLevel::Info, Outcome::Pass)
                } else {
                    (LogLevel::Warn, Outcome::Fail)
                };
                emitter.emit_entry(
                    LogEntry::new(String::new(), level, "probe_end")
                        .with_library(&library)
                        .with_outcome(outcome)
                        .with_details(serde_json::json!({
                            "resolved": report.resolved,
                            "failed": report.failures.len(),
                            "dropped_events": trace::dropped(),
                        })),
                )?;
                emitter.flush()?;
                eprintln!("Wrote {} bind events to {}", events.len(), path.display());
            }

            let mut body = serde_json::to_string_pretty(&report)?;
            body.push('\n');
            write_output(output.as_deref(), &body)?;
            if !report.ok {
                eprintln!(
                    "{} of {} symbols failed to bind",
                    report.failures.len(),
                    report.symbols.len()
                );
                std::process::exit(1);
            }
        }
        Command::Exports { library, output } => {
            let library = codegen::library_file(&library);
            let bytes = std::fs::read(&library)?;
            let exports = procbind_core::elf::exported_symbols(&bytes)?;
            let names: Vec<&str> = exports.iter().filter_map(|e| e.name.as_deref()).collect();
            let mut body = serde_json::to_string_pretty(&serde_json::json!({
                "library": library.display().to_string(),
                "count": names.len(),
                "exports": names,
            }))?;
            body.push('\n');
            write_output(output.as_deref(), &body)?;
        }
        Command::Generate {
            library,
            name,
            trim_prefix,
            pascal_case,
            output,
        } => {
            let library = codegen::library_file(&library);
            let library_name = library.display().to_string();
            let options = CodegenOptions {
                struct_name: name.unwrap_or_else(|| codegen::struct_name_for(&library_name)),
                library: library
                    .file_name()
                    .map_or_else(|| library_name.clone(), |f| f.to_string_lossy().into_owned()),
                trim_prefix,
                style: if pascal_case {
                    FieldStyle::Pascal
                } else {
                    FieldStyle::Snake
                },
            };
            let code = codegen::generate_from_file(&library, &options)?;
            write_output(output.as_deref(), &code)?;
            if let Some(path) = &output {
                eprintln!("Wrote {} to {}", options.struct_name, path.display());
            }
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = structured_log::validate_log_file(&log)?;
            for error in &errors {
                eprintln!("{error}");
            }
            if !errors.is_empty() {
                return Err(format!(
                    "{} validation errors in {lines} lines of {}",
                    errors.len(),
                    log.display()
                )
                .into());
            }
            println!("{}: {lines} valid entries", log.display());
        }
    }

    Ok(())
}
