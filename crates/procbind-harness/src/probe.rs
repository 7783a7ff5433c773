//! Probe a library for symbols named on the command line.
//!
//! Each request is `NAME`, `NAME@ORDINAL` or `@ORDINAL`. Requests become a
//! [`SymbolList`] that is bound in one call, so the report shows every
//! resolved and failed symbol together.

use procbind::{Addressable, Backend, Binder, LibraryPath, SymbolEntry, SymbolList};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("no symbols requested")]
    NoSymbols,
    #[error("invalid symbol request `{0}`: expected NAME, NAME@ORDINAL or @ORDINAL")]
    InvalidRequest(String),
}

/// Outcome for one requested symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolReport {
    pub field: String,
    /// What was looked up: the name, or `#<ordinal>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<u64>,
}

/// Machine-readable result of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub library: String,
    /// `system-directory` or `unrestricted`.
    pub strategy: String,
    pub ok: bool,
    pub resolved: usize,
    pub symbols: Vec<SymbolReport>,
    /// Display form of every bind failure.
    pub failures: Vec<String>,
}

/// Parse one `NAME`, `NAME@ORDINAL` or `@ORDINAL` request.
pub fn parse_request(text: &str) -> Result<SymbolEntry, ProbeError> {
    let invalid = || ProbeError::InvalidRequest(text.to_string());
    match text.split_once('@') {
        None if !text.is_empty() => Ok(SymbolEntry::new(text)),
        None => Err(invalid()),
        Some((_, "")) => Err(invalid()),
        Some(("", ordinal)) => Ok(SymbolEntry::new(format!("ord{ordinal}")).with_ordinal(ordinal)),
        Some((name, ordinal)) => Ok(SymbolEntry::new(name).with_ordinal(ordinal)),
    }
}

/// Bind `requests` against `library` through `binder`.
///
/// Bind failures are part of the report, not errors.
pub fn probe<B: Backend>(
    binder: &Binder<B>,
    library: &str,
    requests: &[String],
) -> Result<ProbeReport, ProbeError> {
    let mut list = SymbolList::new();
    for request in requests {
        list.push_entry(parse_request(request)?);
    }
    if list.is_empty() {
        return Err(ProbeError::NoSymbols);
    }

    let failures = match binder.bind(library, &mut list) {
        Ok(()) => Vec::new(),
        Err(err) => err.failures().iter().map(ToString::to_string).collect(),
    };

    let symbols: Vec<SymbolReport> = list
        .entries()
        .iter()
        .map(|entry| SymbolReport {
            field: entry.field.clone(),
            lookup: entry.resolved.as_ref().map(|p| p.symbol().to_string()),
            addr: entry.resolved.as_ref().map(|p| format!("{:#x}", p.addr())),
            ordinal: entry.resolved.as_ref().and_then(|p| p.ordinal()),
        })
        .collect();

    Ok(ProbeReport {
        library: library.to_string(),
        strategy: LibraryPath::new(library).strategy().to_string(),
        ok: failures.is_empty(),
        resolved: list.resolved_count(),
        symbols,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use procbind::RawHandle;
    use std::ffi::c_void;
    use std::ptr::NonNull;

    struct TwoExports;

    impl Backend for TwoExports {
        fn open(&self, path: &LibraryPath) -> Result<RawHandle, String> {
            if path.as_str().starts_with("missing") {
                return Err("image not found".to_string());
            }
            RawHandle::from_addr(0x10).ok_or_else(|| "null handle".to_string())
        }

        fn lookup_name(&self, _handle: RawHandle, name: &str) -> Option<NonNull<c_void>> {
            match name {
                "first" => NonNull::new(0x1100 as *mut c_void),
                "second" => NonNull::new(0x2200 as *mut c_void),
                _ => None,
            }
        }

        fn lookup_ordinal(&self, _handle: RawHandle, ordinal: u64) -> Option<NonNull<c_void>> {
            (ordinal == 2)
                .then(|| NonNull::new(0x2200 as *mut c_void))
                .flatten()
        }

        fn supports_ordinals(&self) -> bool {
            true
        }
    }

    fn requests(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn request_syntax() {
        assert_eq!(parse_request("puts").unwrap(), SymbolEntry::new("puts"));
        assert_eq!(
            parse_request("Foo@12").unwrap(),
            SymbolEntry::new("Foo").with_ordinal("12")
        );
        assert_eq!(
            parse_request("@12").unwrap(),
            SymbolEntry::new("ord12").with_ordinal("12")
        );
        for bad in ["", "@", "Foo@"] {
            assert_eq!(
                parse_request(bad),
                Err(ProbeError::InvalidRequest(bad.to_string()))
            );
        }
    }

    #[test]
    fn report_lists_resolved_and_failed() {
        let binder = Binder::new(TwoExports);
        let report = probe(&binder, "libtwo.so", &requests(&["first", "third", "@2"])).unwrap();

        assert!(!report.ok);
        assert_eq!(report.resolved, 2);
        assert_eq!(report.strategy, "system-directory");
        assert_eq!(report.symbols[0].addr.as_deref(), Some("0x1100"));
        assert_eq!(report.symbols[1].addr, None);
        assert_eq!(report.symbols[2].lookup.as_deref(), Some("#2"));
        assert_eq!(report.symbols[2].ordinal, Some(2));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("third"));
    }

    #[test]
    fn load_failure_is_reported() {
        let binder = Binder::new(TwoExports);
        let report = probe(&binder, "missing/libtwo.so", &requests(&["first"])).unwrap();
        assert!(!report.ok);
        assert_eq!(report.resolved, 0);
        assert_eq!(report.strategy, "unrestricted");
        assert!(report.failures[0].contains("image not found"));
    }

    #[test]
    fn empty_request_list_is_an_error() {
        let binder = Binder::new(TwoExports);
        assert_eq!(probe(&binder, "libtwo.so", &[]), Err(ProbeError::NoSymbols));
    }
}
