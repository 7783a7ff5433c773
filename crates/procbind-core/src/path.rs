//! Library path classification.
//!
//! A bare file name ("kernel32.dll", "libc.so.6") is *implicit*: the loader
//! must only look in the OS's trusted system locations. Anything absolute or
//! carrying a directory component ("./local.so", "/usr/lib/libz.so") is
//! *explicit* and goes to the loader unmodified.

use std::fmt;
use std::path::Path;

/// Classification of a library path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathClass {
    /// Bare file name with no directory component.
    Implicit,
    /// Absolute path, or relative path with a directory component.
    Explicit,
}

/// Loader search strategy selected for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
    /// Search the trusted system directory only.
    SystemDirectory,
    /// Hand the path to the general-purpose loader search.
    Unrestricted,
}

impl PathClass {
    /// Search strategy the loader must use for this class.
    #[must_use]
    pub const fn strategy(self) -> SearchStrategy {
        match self {
            Self::Implicit => SearchStrategy::SystemDirectory,
            Self::Explicit => SearchStrategy::Unrestricted,
        }
    }
}

impl SearchStrategy {
    /// Returns true for the restricted, system-directory-only search.
    #[must_use]
    pub const fn is_system(self) -> bool {
        matches!(self, Self::SystemDirectory)
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemDirectory => f.write_str("system-directory"),
            Self::Unrestricted => f.write_str("unrestricted"),
        }
    }
}

/// Classify `path` as implicit or explicit.
///
/// Separators are the platform's: `/` everywhere, plus `\` on Windows.
#[must_use]
pub fn classify(path: &str) -> PathClass {
    if Path::new(path).is_absolute() || path.chars().any(std::path::is_separator) {
        PathClass::Explicit
    } else {
        PathClass::Implicit
    }
}

/// A library path together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryPath {
    raw: String,
    class: PathClass,
}

impl LibraryPath {
    /// Classify and wrap `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let raw = path.into();
        let class = classify(&raw);
        Self { raw, class }
    }

    /// The path exactly as the caller supplied it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn class(&self) -> PathClass {
        self.class
    }

    #[must_use]
    pub fn strategy(&self) -> SearchStrategy {
        self.class.strategy()
    }
}

impl fmt::Display for LibraryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
