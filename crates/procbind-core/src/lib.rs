//! Platform-independent logic for procbind.
//!
//! Everything here is safe Rust: classifying library paths, deriving the
//! symbol identifier and ordinal for a slot, the error taxonomy returned by
//! a bind, runtime configuration, and reading export tables for tooling.
//! The OS-facing loader lives in the `procbind` crate.

pub mod config;
pub mod elf;
pub mod error;
pub mod ident;
pub mod path;
pub mod slot;

pub use config::{TraceLevel, trace_level};
pub use error::{BindError, BindFailure};
pub use ident::{ExportEntry, format_public_type};
pub use path::{LibraryPath, PathClass, SearchStrategy, classify};
pub use slot::{SlotKind, SymbolRef, SymbolSpec};
