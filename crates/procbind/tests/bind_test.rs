//! Integration test: binding real C library exports through the
//! process-wide binder.
//!
//! Covers name resolution, name overrides, every capability slot type,
//! partial success, missing libraries, the untouched-field rule and cache
//! sharing across threads. Runs on glibc Linux and macOS.
//!
//! Run: cargo test -p procbind --test bind_test

#![cfg(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos"))]

use std::ffi::CString;
use std::sync::Arc;

use procbind::{
    Addressable, BindFailure, FunctionPointer, OrdinalProc, Proc, SearchStrategy, SymbolAddr,
    SymbolList, bind, global_binder, symbol_table,
};

#[cfg(target_os = "linux")]
const LIBC: &str = "libc.so.6";
#[cfg(target_os = "macos")]
const LIBC: &str = "/usr/lib/libSystem.B.dylib";

const EBADF: i32 = 9;

symbol_table! {
    #[derive(Default)]
    struct Libc {
        pub strlen: Option<Proc>,
        pub compare: Option<Proc> => { name = "strcmp" },
        pub getpid: Option<SymbolAddr>,
        pub absolute: Option<Box<dyn FunctionPointer>> => { name = "abs" },
        pub labs: Option<OrdinalProc> => { ordinal = "1" },
        pub close: Option<Proc>,
        shadow: Option<Proc> => { name = "strlen" },
        pub calls: u32,
    }
}

symbol_table! {
    #[derive(Default)]
    struct PartlyMissing {
        pub strlen: Option<Proc>,
        pub procbind_no_such_symbol: Option<Proc>,
        pub strcmp: Option<Proc>,
    }
}

symbol_table! {
    #[derive(Default)]
    struct RawFields {
        pub r#abs: Option<Proc>,
    }
}

#[test]
fn resolves_every_slot_type() {
    let mut libc = Libc {
        calls: 3,
        ..Libc::default()
    };
    bind(LIBC, &mut libc).unwrap();

    assert!(libc.strlen.is_some());
    assert!(libc.compare.is_some());
    assert!(libc.getpid.as_ref().is_some_and(|p| p.addr() != 0));
    assert!(libc.absolute.is_some());
    assert!(libc.close.is_some());
    // no ordinals on ELF/Mach-O: resolved by its own name
    let labs = libc.labs.as_ref().unwrap();
    assert_eq!(labs.ordinal(), None);

    assert!(libc.shadow.is_none());
    assert_eq!(libc.calls, 3);
}

#[test]
fn name_override_changes_the_symbol() {
    let mut libc = Libc::default();
    bind(LIBC, &mut libc).unwrap();
    let compare = libc.compare.as_ref().unwrap();
    assert_eq!(compare.name(), "strcmp");
    assert_ne!(compare.addr(), libc.strlen.as_ref().unwrap().addr());
}

#[test]
fn raw_identifier_field_binds_under_its_plain_name() {
    let mut table = RawFields::default();
    bind(LIBC, &mut table).unwrap();
    let abs = table.r#abs.as_ref().unwrap();
    assert_eq!(abs.name(), "abs");
    let (ret, _) = unsafe { abs.call(&[(-7i32) as usize]) };
    assert_eq!(ret as u32 as i32, 7);
}

#[test]
fn trampoline_calls_into_libc() {
    let mut libc = Libc::default();
    bind(LIBC, &mut libc).unwrap();

    let text = CString::new("procbind").unwrap();
    let strlen = libc.strlen.as_ref().unwrap();
    let (len, _) = unsafe { strlen.call(&[text.as_ptr() as usize]) };
    assert_eq!(len, 8);

    let a = CString::new("apple").unwrap();
    let b = CString::new("banana").unwrap();
    let compare = libc.compare.as_ref().unwrap();
    let (ret, _) = unsafe { compare.call(&[a.as_ptr() as usize, b.as_ptr() as usize]) };
    assert!((ret as u32 as i32) < 0);

    let absolute = libc.absolute.as_ref().unwrap();
    let (ret, _) = unsafe { absolute.call(&[(-5i32) as usize]) };
    assert_eq!(ret as u32 as i32, 5);
}

#[test]
fn trampoline_reports_errno() {
    let mut libc = Libc::default();
    bind(LIBC, &mut libc).unwrap();

    let close = libc.close.as_ref().unwrap();
    let (ret, err) = unsafe { close.call(&[(-1i32) as usize]) };
    assert_eq!(ret as u32 as i32, -1);
    assert_eq!(err.code(), EBADF);
    assert!(!err.is_success());
}

#[test]
fn typed_cast_matches_trampoline() {
    let mut libc = Libc::default();
    bind(LIBC, &mut libc).unwrap();

    let strlen: unsafe extern "C" fn(*const std::ffi::c_char) -> usize =
        unsafe { libc.strlen.as_ref().unwrap().cast() };
    let text = CString::new("four").unwrap();
    assert_eq!(unsafe { strlen(text.as_ptr()) }, 4);
}

#[test]
fn missing_symbol_is_reported_and_others_still_bind() {
    let mut table = PartlyMissing::default();
    let err = bind(LIBC, &mut table).unwrap_err();

    assert_eq!(err.len(), 1);
    assert_eq!(err.missing_symbols(), 1);
    match &err.failures()[0] {
        BindFailure::SymbolNotFound { slot, symbol, .. } => {
            assert_eq!(slot, "procbind_no_such_symbol");
            assert_eq!(symbol, "procbind_no_such_symbol");
        }
        other => panic!("unexpected failure: {other}"),
    }
    assert!(table.strlen.is_some());
    assert!(table.strcmp.is_some());
    assert!(table.procbind_no_such_symbol.is_none());
    assert!(err.to_string().starts_with("bind failed"));
}

#[test]
fn missing_library_leaves_slots_empty() {
    let mut libc = Libc::default();
    let path = "/nonexistent/procbind/libmissing.so";
    let err = bind(path, &mut libc).unwrap_err();

    assert_eq!(err.len(), 1);
    assert!(err.failures()[0].is_load_failure());
    assert!(err.to_string().contains(path));
    assert!(libc.strlen.is_none());
    assert!(libc.getpid.is_none());
    assert!(libc.absolute.is_none());
    assert!(global_binder().cache().get(path).is_none());
}

#[test]
fn concurrent_binds_share_one_library() {
    let libraries: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let mut libc = Libc::default();
                    bind(LIBC, &mut libc).unwrap();
                    global_binder().cache().get(LIBC).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(libraries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    let library = &libraries[0];
    assert_eq!(library.path(), LIBC);
    #[cfg(target_os = "linux")]
    assert_eq!(library.strategy(), SearchStrategy::SystemDirectory);
    #[cfg(target_os = "macos")]
    assert_eq!(library.strategy(), SearchStrategy::Unrestricted);
}

#[test]
fn symbol_list_binds_runtime_names() {
    let mut list: SymbolList = ["strlen", "strcmp", "procbind_missing_fn"].into_iter().collect();
    let err = bind(LIBC, &mut list).unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(list.resolved_count(), 2);
    assert!(list.get("strlen").is_some());
    assert!(list.get("procbind_missing_fn").is_none());
}
