//! Identifiers for generated bindings.
//!
//! The code generator reads a library's export table as a list of
//! [`ExportEntry`] values and emits one slot per export. Export names are
//! arbitrary byte strings, so they are folded into valid Rust identifiers
//! here; the original name is kept as the slot's `name` override.

/// One entry of a library's export table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExportEntry {
    /// Exported name. `None` for ordinal-only exports.
    pub name: Option<String>,
    /// Export ordinal, on platforms that have them.
    pub ordinal: Option<u32>,
}

impl ExportEntry {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal: None,
        }
    }

    #[must_use]
    pub fn ordinal_only(ordinal: u32) -> Self {
        Self {
            name: None,
            ordinal: Some(ordinal),
        }
    }
}

/// Strict and reserved keywords that cannot be used as plain field names.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Derive a public type name from an arbitrary non-empty string.
///
/// Every character outside `[A-Za-z0-9]` is dropped. A leading digit gets a
/// `T` prefix; otherwise the first letter is upper-cased.
#[must_use]
pub fn format_public_type(name: &str) -> String {
    let cleaned: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
    let mut chars = cleaned.chars();
    match chars.next() {
        None => "T".to_string(),
        Some(first) if first.is_ascii_digit() => format!("T{cleaned}"),
        Some(first) => {
            let mut out = String::with_capacity(cleaned.len());
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
            out
        }
    }
}

/// Public type name for an export, after removing `trim_prefix` from its name.
///
/// Ordinal-only exports become `Ord<n>`.
#[must_use]
pub fn slot_identifier(entry: &ExportEntry, trim_prefix: &str) -> String {
    match (&entry.name, entry.ordinal) {
        (Some(name), _) if !name.is_empty() => {
            let trimmed = name.strip_prefix(trim_prefix).unwrap_or(name);
            if trimmed.is_empty() {
                format_public_type(name)
            } else {
                format_public_type(trimmed)
            }
        }
        (_, Some(ordinal)) => format!("Ord{ordinal}"),
        _ => "T".to_string(),
    }
}

/// snake_case field name for an export, safe to use as a Rust identifier.
#[must_use]
pub fn field_identifier(entry: &ExportEntry, trim_prefix: &str) -> String {
    let name = match (&entry.name, entry.ordinal) {
        (Some(name), _) if !name.is_empty() => {
            let trimmed = name.strip_prefix(trim_prefix).unwrap_or(name);
            if trimmed.is_empty() { name.as_str() } else { trimmed }
        }
        (_, Some(ordinal)) => return format!("ord{ordinal}"),
        _ => return "export".to_string(),
    };

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            push_separator(&mut out);
            continue;
        }
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower)
            {
                push_separator(&mut out);
            }
        }
        out.push(c.to_ascii_lowercase());
    }

    let out = out.trim_matches('_').to_string();
    if out.is_empty() {
        "export".to_string()
    } else if out.starts_with(|c: char| c.is_ascii_digit()) {
        format!("f_{out}")
    } else if RUST_KEYWORDS.contains(&out.as_str()) {
        format!("{out}_")
    } else {
        out
    }
}

fn push_separator(out: &mut String) {
    if !out.is_empty() && !out.ends_with('_') {
        out.push('_');
    }
}
