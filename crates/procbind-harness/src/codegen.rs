//! Generate `symbol_table!` declarations from a library's export table.
//!
//! One `Option<Proc>` slot per named export; exports that carry an ordinal
//! get an `Option<OrdinalProc>` slot with an `ordinal` override instead.
//! Field names are folded into valid identifiers and the real export name
//! is kept as a `name` override whenever the two differ.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use procbind_core::elf::{ElfError, exported_symbols};
use procbind_core::ident::{field_identifier, slot_identifier};
use procbind_core::{ExportEntry, PathClass, classify, format_public_type};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot read export table: {0}")]
    Elf(#[from] ElfError),
    #[error("`{0}` exports no functions")]
    NoExports(String),
}

/// How generated field identifiers are spelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldStyle {
    /// `message_box_w`
    #[default]
    Snake,
    /// `MessageBoxW`, matching the export's own casing.
    Pascal,
}

#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    /// Generated struct name.
    pub struct_name: String,
    /// Library path recorded in the header comment.
    pub library: String,
    /// Prefix removed from export names before forming identifiers.
    pub trim_prefix: String,
    pub style: FieldStyle,
}

/// Default struct name for a library path: its file name up to the first
/// dot, as a public type name (`libc.so.6` → `Libc`).
#[must_use]
pub fn struct_name_for(library: &str) -> String {
    let file = Path::new(library)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(library);
    let stem = file.split('.').next().unwrap_or(file);
    format_public_type(stem)
}

struct Field {
    ident: String,
    ty: &'static str,
    export_name: Option<String>,
    ordinal: Option<u32>,
}

impl Field {
    fn new(entry: &ExportEntry, options: &CodegenOptions) -> Self {
        let mut ident = match options.style {
            FieldStyle::Snake => field_identifier(entry, &options.trim_prefix),
            FieldStyle::Pascal => slot_identifier(entry, &options.trim_prefix),
        };
        if ident == "Self" {
            ident.push('_');
        }
        Self {
            ident,
            ty: if entry.ordinal.is_some() {
                "OrdinalProc"
            } else {
                "Proc"
            },
            export_name: entry.name.clone().filter(|name| !name.is_empty()),
            ordinal: entry.ordinal,
        }
    }

    /// `name` override, needed whenever the identifier differs from the export.
    fn name_override(&self) -> Option<&str> {
        self.export_name
            .as_deref()
            .filter(|name| *name != self.ident)
    }
}

/// Render a `symbol_table!` declaration for `exports`.
#[must_use]
pub fn render_table(options: &CodegenOptions, exports: &[ExportEntry]) -> String {
    let mut taken: HashSet<String> = HashSet::new();
    let fields: Vec<Field> = exports
        .iter()
        .map(|entry| {
            let mut field = Field::new(entry, options);
            let mut suffix = 2;
            let base = field.ident.clone();
            while taken.contains(&field.ident) {
                field.ident = format!("{base}_{suffix}");
                suffix += 1;
            }
            taken.insert(field.ident.clone());
            field
        })
        .collect();

    let mut types: Vec<&str> = fields.iter().map(|f| f.ty).collect();
    types.sort_unstable();
    types.dedup();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "// Generated by procbind-harness from `{}`. Do not edit.",
        options.library
    );
    out.push('\n');
    let _ = writeln!(out, "use procbind::{{{}, symbol_table}};", types.join(", "));
    out.push('\n');
    out.push_str("symbol_table! {\n");
    out.push_str("    #[derive(Default)]\n");
    if options.style == FieldStyle::Pascal {
        out.push_str("    #[allow(non_snake_case)]\n");
    }
    let _ = writeln!(out, "    pub struct {} {{", options.struct_name);
    for field in &fields {
        let _ = write!(out, "        pub {}: Option<{}>", field.ident, field.ty);
        let mut overrides = Vec::new();
        if let Some(name) = field.name_override() {
            overrides.push(format!("name = {name:?}"));
        }
        if let Some(ordinal) = field.ordinal {
            overrides.push(format!("ordinal = \"{ordinal}\""));
        }
        if !overrides.is_empty() {
            let _ = write!(out, " => {{ {} }}", overrides.join(", "));
        }
        out.push_str(",\n");
    }
    out.push_str("    }\n}\n");
    out
}

/// File to read for `library`.
///
/// A bare file name names a library in the trusted system directory, the
/// same place the loader would take it from. Off Windows there is no such
/// directory and the path is used as given.
#[must_use]
pub fn library_file(library: &Path) -> PathBuf {
    library_file_in(library, procbind::system_directory().ok().as_deref())
}

fn library_file_in(library: &Path, system_dir: Option<&Path>) -> PathBuf {
    match (library.to_str().map(classify), system_dir) {
        (Some(PathClass::Implicit), Some(dir)) => dir.join(library),
        _ => library.to_path_buf(),
    }
}

/// Read the shared object at `path` and render a declaration for its exports.
pub fn generate_from_file(path: &Path, options: &CodegenOptions) -> Result<String, CodegenError> {
    let bytes = std::fs::read(path)?;
    let exports = exported_symbols(&bytes)?;
    if exports.is_empty() {
        return Err(CodegenError::NoExports(path.display().to_string()));
    }
    Ok(render_table(options, &exports))
}
