//! Bind failures and their aggregate.
//!
//! A bind never stops at the first problem. Every independent failure is
//! collected into one [`BindError`]; an empty aggregate means success.

use std::fmt;

use thiserror::Error;

use crate::slot::SymbolRef;

/// One elementary failure from a bind call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindFailure {
    #[error("failed to load library `{path}`: {reason}")]
    LibraryLoadFailed { path: String, reason: String },
    #[error("symbol `{symbol}` not found in `{library}` (slot `{slot}`)")]
    SymbolNotFound {
        library: String,
        slot: String,
        symbol: String,
    },
    #[error("ordinal {ordinal} out of range in `{library}` (slot `{slot}`)")]
    OrdinalOutOfRange {
        library: String,
        slot: String,
        ordinal: u64,
    },
}

impl BindFailure {
    /// Failure for a lookup of `symbol` that found nothing.
    #[must_use]
    pub fn unresolved(library: &str, slot: &str, symbol: &SymbolRef) -> Self {
        match symbol {
            SymbolRef::Name(name) => Self::SymbolNotFound {
                library: library.to_string(),
                slot: slot.to_string(),
                symbol: name.clone(),
            },
            SymbolRef::Ordinal(ordinal) => Self::OrdinalOutOfRange {
                library: library.to_string(),
                slot: slot.to_string(),
                ordinal: *ordinal,
            },
        }
    }

    /// Returns true for a library load failure.
    #[must_use]
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::LibraryLoadFailed { .. })
    }

    /// Slot the failure belongs to, if it is a per-slot failure.
    #[must_use]
    pub fn slot(&self) -> Option<&str> {
        match self {
            Self::LibraryLoadFailed { .. } => None,
            Self::SymbolNotFound { slot, .. } | Self::OrdinalOutOfRange { slot, .. } => {
                Some(slot)
            }
        }
    }
}

/// Aggregate of every failure from one bind call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindError {
    failures: Vec<BindFailure>,
}

impl BindError {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: BindFailure) {
        self.failures.push(failure);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn failures(&self) -> &[BindFailure] {
        &self.failures
    }

    /// `Ok(())` when nothing failed, else the aggregate itself.
    pub fn into_result(self) -> Result<(), Self> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Number of `SymbolNotFound` entries.
    #[must_use]
    pub fn missing_symbols(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f, BindFailure::SymbolNotFound { .. }))
            .count()
    }
}

impl From<BindFailure> for BindError {
    fn from(failure: BindFailure) -> Self {
        Self {
            failures: vec![failure],
        }
    }
}

impl FromIterator<BindFailure> for BindError {
    fn from_iter<I: IntoIterator<Item = BindFailure>>(iter: I) -> Self {
        Self {
            failures: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for BindError {
    type Item = BindFailure;
    type IntoIter = std::vec::IntoIter<BindFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.len() {
            0 => f.write_str("bind failed: no errors recorded"),
            1 => write!(f, "bind failed: {}", self.failures[0]),
            n => {
                write!(f, "bind failed: {n} errors occurred:")?;
                for failure in &self.failures {
                    write!(f, "\n\t* {failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for BindError {}
