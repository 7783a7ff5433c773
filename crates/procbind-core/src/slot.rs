//! Slot metadata: which symbol a field asks for.
//!
//! A slot names its symbol either through an explicit `name` override or,
//! failing that, through its own field identifier. An `ordinal` override is
//! only honored when it is well-formed decimal text; anything else counts as
//! absent rather than as an error.

use std::fmt;

/// Capability category of a slot. Decides which lookup the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Receives only the resolved address. Name lookup.
    Address,
    /// Callable trampoline. Name lookup.
    Callable,
    /// Callable trampoline. Ordinal lookup when an ordinal override is present.
    Ordinal,
    /// Abstract function-pointer interface. Name lookup.
    Dynamic,
}

impl SlotKind {
    /// Returns true when the slot may be resolved by ordinal.
    #[must_use]
    pub const fn accepts_ordinal(self) -> bool {
        matches!(self, Self::Ordinal)
    }
}

/// The export a lookup targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    Name(String),
    Ordinal(u64),
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Ordinal(ordinal) => write!(f, "#{ordinal}"),
        }
    }
}

/// Out-of-band metadata attached to one field of a destination record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSpec<'a> {
    /// Declared field identifier.
    pub field: &'a str,
    /// Explicit symbol name override.
    pub name: Option<&'a str>,
    /// Explicit ordinal override, as written.
    pub ordinal: Option<&'a str>,
}

impl<'a> SymbolSpec<'a> {
    #[must_use]
    pub const fn new(field: &'a str) -> Self {
        Self {
            field,
            name: None,
            ordinal: None,
        }
    }

    #[must_use]
    pub const fn with_name(mut self, name: Option<&'a str>) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub const fn with_ordinal(mut self, ordinal: Option<&'a str>) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Symbol identifier: a non-empty name override, else the field name verbatim.
    #[must_use]
    pub fn symbol_name(&self) -> &'a str {
        match self.name {
            Some(name) if !name.is_empty() => name,
            _ => self.field,
        }
    }

    /// Ordinal override, if present and a valid non-negative integer.
    #[must_use]
    pub fn ordinal(&self) -> Option<u64> {
        self.ordinal.and_then(parse_ordinal)
    }

    /// The lookup a slot of `kind` performs, given whether the backend can
    /// resolve ordinals at all.
    ///
    /// A valid ordinal wins over any name override. When ordinals are not
    /// available the ordinal text is never examined.
    #[must_use]
    pub fn target(&self, kind: SlotKind, ordinals_supported: bool) -> SymbolRef {
        if kind.accepts_ordinal()
            && ordinals_supported
            && let Some(ordinal) = self.ordinal()
        {
            return SymbolRef::Ordinal(ordinal);
        }
        SymbolRef::Name(self.symbol_name().to_string())
    }
}

/// Parse ordinal text as a base-10 non-negative integer.
#[must_use]
pub fn parse_ordinal(text: &str) -> Option<u64> {
    text.parse::<u64>().ok()
}
