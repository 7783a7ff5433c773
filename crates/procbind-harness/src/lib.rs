//! Tooling around procbind.
//!
//! This crate provides:
//! - Probe: bind a library against names given at run time and report
//! - Code generation: `symbol_table!` declarations from an export table
//! - Structured logging: bind trace events as validated JSONL records

#![forbid(unsafe_code)]

pub mod codegen;
pub mod probe;
pub mod structured_log;

pub use codegen::{CodegenError, CodegenOptions, FieldStyle, generate_from_file, render_table};
pub use probe::{ProbeError, ProbeReport, SymbolReport, probe};
pub use structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
