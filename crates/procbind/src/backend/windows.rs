//! `LoadLibraryExW`/`GetProcAddress` backend for PE systems.
//!
//! Implicit paths load with `LOAD_LIBRARY_SEARCH_SYSTEM32`, so a bare
//! `kernel32.dll` can only ever come from the system directory. Explicit
//! paths use the default search order. Exports resolve by name or by 16-bit
//! ordinal.

use std::ffi::{CString, OsStr, c_void};
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;
use std::ptr::{NonNull, null_mut};

use procbind_core::{LibraryPath, SearchStrategy};
use windows_sys::Win32::Foundation::{GetLastError, SetLastError};
use windows_sys::Win32::System::LibraryLoader::{
    GetProcAddress, LOAD_LIBRARY_FLAGS, LOAD_LIBRARY_SEARCH_SYSTEM32, LoadLibraryExW,
};
use windows_sys::Win32::System::SystemInformation::GetSystemDirectoryW;

use super::{Backend, RawHandle};

/// Name-or-ordinal backend over the Windows loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsBackend;

fn load_flags(strategy: SearchStrategy) -> LOAD_LIBRARY_FLAGS {
    match strategy {
        SearchStrategy::SystemDirectory => LOAD_LIBRARY_SEARCH_SYSTEM32,
        SearchStrategy::Unrestricted => 0,
    }
}

impl Backend for WindowsBackend {
    fn open(&self, path: &LibraryPath) -> Result<RawHandle, String> {
        let mut wide: Vec<u16> = OsStr::new(path.as_str()).encode_wide().collect();
        if wide.contains(&0) {
            return Err("library path contains an interior NUL character".to_string());
        }
        wide.push(0);

        // SAFETY: `wide` is NUL-terminated and outlives the call; no file
        // handle is passed.
        let module = unsafe { LoadLibraryExW(wide.as_ptr(), null_mut(), load_flags(path.strategy())) };
        match NonNull::new(module) {
            Some(ptr) => Ok(RawHandle::new(ptr)),
            None => Err(std::io::Error::last_os_error().to_string()),
        }
    }

    fn lookup_name(&self, handle: RawHandle, name: &str) -> Option<NonNull<c_void>> {
        let c_name = CString::new(name).ok()?;
        // SAFETY: `handle` is a live module; `c_name` is NUL-terminated.
        let proc = unsafe { GetProcAddress(handle.as_ptr(), c_name.as_ptr().cast()) };
        proc.and_then(|f| NonNull::new(f as *mut c_void))
    }

    fn lookup_ordinal(&self, handle: RawHandle, ordinal: u64) -> Option<NonNull<c_void>> {
        // MAKEINTRESOURCEA: an ordinal travels in the low word of the name
        // pointer, so anything wider cannot name an export.
        let ordinal = u16::try_from(ordinal).ok()?;
        // SAFETY: `handle` is a live module; a pointer below 0x10000 is read
        // by the loader as an ordinal, never dereferenced.
        let proc = unsafe { GetProcAddress(handle.as_ptr(), usize::from(ordinal) as *const u8) };
        proc.and_then(|f| NonNull::new(f as *mut c_void))
    }

    fn supports_ordinals(&self) -> bool {
        true
    }
}

pub(super) fn system_directory() -> std::io::Result<PathBuf> {
    let mut buf = vec![0u16; 260];
    loop {
        let capacity = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        // SAFETY: `buf` holds `capacity` writable UTF-16 units.
        let len = unsafe { GetSystemDirectoryW(buf.as_mut_ptr(), capacity) } as usize;
        if len == 0 {
            return Err(std::io::Error::last_os_error());
        }
        if len < buf.len() {
            buf.truncate(len);
            return Ok(PathBuf::from(std::ffi::OsString::from_wide(&buf)));
        }
        // Too small; `len` is the required size including the terminator.
        buf.resize(len, 0);
    }
}

/// Zero the thread's last-error value before a foreign call.
pub(crate) fn clear_last_error() {
    // SAFETY: SetLastError only touches thread-local state.
    unsafe { SetLastError(0) };
}

/// `GetLastError()` as left by the most recent foreign call.
pub(crate) fn last_error() -> i32 {
    // SAFETY: GetLastError only reads thread-local state.
    unsafe { GetLastError() as i32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_paths_are_confined_to_system32() {
        assert_eq!(load_flags(SearchStrategy::SystemDirectory), LOAD_LIBRARY_SEARCH_SYSTEM32);
        assert_eq!(load_flags(SearchStrategy::Unrestricted), 0);
    }

    #[test]
    fn kernel32_resolves_by_name() {
        let handle = WindowsBackend.open(&LibraryPath::new("kernel32.dll")).unwrap();
        assert!(WindowsBackend.lookup_name(handle, "GetTickCount").is_some());
        assert!(WindowsBackend.lookup_name(handle, "NoSuchExportProcbind").is_none());
    }

    #[test]
    fn oversized_ordinal_is_never_looked_up() {
        let handle = WindowsBackend.open(&LibraryPath::new("kernel32.dll")).unwrap();
        assert!(WindowsBackend.lookup_ordinal(handle, 0x1_0000).is_none());
    }
}
