//! Integration test: binding real Windows system DLLs.
//!
//! Checks the secure search mode for bare DLL names, unrestricted loading of
//! absolute paths, ordinal resolution in shlwapi and `GetLastError` capture.
//!
//! Run: cargo test -p procbind --test windows_test

#![cfg(windows)]

use procbind::{
    Addressable, OrdinalProc, Proc, SearchStrategy, SymbolAddr, bind, global_binder,
    symbol_table, system_directory,
};

const ERROR_INVALID_HANDLE: i32 = 6;

symbol_table! {
    #[derive(Default)]
    #[allow(non_snake_case)]
    struct Kernel32 {
        pub GetTickCount: Option<Proc>,
        pub GetCurrentProcessId: Option<Proc>,
        pub close: Option<Proc> => { name = "CloseHandle" },
    }
}

symbol_table! {
    #[derive(Default)]
    #[allow(non_snake_case)]
    struct User32 {
        pub MessageBoxW: Option<SymbolAddr>,
        pub message_box: Option<SymbolAddr> => { name = "MessageBoxA" },
        gks: Option<Proc> => { name = "GetKeyState" },
        pub random_field: u32,
    }
}

symbol_table! {
    #[derive(Default)]
    #[allow(non_snake_case)]
    struct Shlwapi {
        pub SHCreateMemStream: Option<OrdinalProc>,
        pub by_ordinal: Option<OrdinalProc> => { ordinal = "12" },
        pub override_missing: Option<OrdinalProc> => { name = "FunctionThatDoesNotExistAtAll", ordinal = "12" },
    }
}

#[test]
fn bare_dll_name_uses_system_directory() {
    let mut kernel32 = Kernel32::default();
    bind("kernel32.dll", &mut kernel32).unwrap();

    let library = global_binder().cache().get("kernel32.dll").unwrap();
    assert_eq!(library.strategy(), SearchStrategy::SystemDirectory);

    let tick = kernel32.GetTickCount.as_ref().unwrap();
    let (ret, _) = unsafe { tick.call(&[]) };
    assert_ne!(ret, 0);

    let pid = kernel32.GetCurrentProcessId.as_ref().unwrap();
    let (ret, _) = unsafe { pid.call(&[]) };
    assert_eq!(ret as u32, std::process::id());
}

#[test]
fn last_error_is_captured() {
    let mut kernel32 = Kernel32::default();
    bind("kernel32.dll", &mut kernel32).unwrap();

    let close = kernel32.close.as_ref().unwrap();
    let (ret, err) = unsafe { close.call(&[0xdead_beef]) };
    assert_eq!(ret as u32, 0);
    assert_eq!(err.code(), ERROR_INVALID_HANDLE);
}

#[test]
fn absolute_path_is_unrestricted() {
    let path = system_directory().unwrap().join("user32.dll");
    let path = path.to_str().unwrap();
    let mut user32 = User32::default();
    bind(path, &mut user32).unwrap();

    let library = global_binder().cache().get(path).unwrap();
    assert_eq!(library.strategy(), SearchStrategy::Unrestricted);
    assert!(user32.MessageBoxW.is_some());
    assert_ne!(
        user32.MessageBoxW.as_ref().map(Addressable::addr),
        user32.message_box.as_ref().map(Addressable::addr)
    );
    assert!(user32.gks.is_none());
    assert_eq!(user32.random_field, 0);
}

#[test]
fn shlwapi_ordinal_12_is_shcreatememstream() {
    let mut shlwapi = Shlwapi::default();
    bind("shlwapi.dll", &mut shlwapi).unwrap();

    let by_name = shlwapi.SHCreateMemStream.as_ref().unwrap().addr();
    assert_eq!(shlwapi.by_ordinal.as_ref().map(Addressable::addr), Some(by_name));
    assert_eq!(shlwapi.override_missing.as_ref().map(Addressable::addr), Some(by_name));
}

#[test]
fn missing_dll_fails_once() {
    let mut user32 = User32::default();
    let err = bind("do_not_exist.dll", &mut user32).unwrap_err();
    assert_eq!(err.len(), 1);
    assert!(err.failures()[0].is_load_failure());
    assert!(user32.MessageBoxW.is_none());
}
