//! `dlopen`/`dlsym` backend for ELF and Mach-O systems.
//!
//! There is no ordinal lookup here. An implicit path is handed to `dlopen`
//! as a bare name, which the dynamic linker resolves only through its
//! configured library directories (`DT_RUNPATH`, `LD_LIBRARY_PATH`, the
//! `ld.so` cache, the default system paths) and never through the working
//! directory.

use std::ffi::{CStr, CString, c_int, c_void};
use std::ptr::NonNull;

use procbind_core::LibraryPath;

use super::{Backend, RawHandle};

/// Resolve every symbol at load time and keep the library's symbols out of
/// the global namespace.
const OPEN_FLAGS: c_int = libc::RTLD_NOW | libc::RTLD_LOCAL;

/// Name-only backend over the platform dynamic linker.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixBackend;

impl Backend for UnixBackend {
    fn open(&self, path: &LibraryPath) -> Result<RawHandle, String> {
        let c_path = CString::new(path.as_str())
            .map_err(|_| "library path contains an interior NUL byte".to_string())?;

        // Drop any stale message so a failure below reports its own cause.
        take_dlerror();
        // SAFETY: `c_path` is a valid NUL-terminated string for the call.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), OPEN_FLAGS) };
        match NonNull::new(handle) {
            Some(ptr) => Ok(RawHandle::new(ptr)),
            None => Err(take_dlerror().unwrap_or_else(|| "dlopen failed".to_string())),
        }
    }

    fn lookup_name(&self, handle: RawHandle, name: &str) -> Option<NonNull<c_void>> {
        let c_name = CString::new(name).ok()?;
        // SAFETY: `handle` came from a successful dlopen that was never closed.
        let sym = unsafe { libc::dlsym(handle.as_ptr(), c_name.as_ptr()) };
        NonNull::new(sym)
    }
}

/// Fetch and clear the dynamic linker's pending error message.
fn take_dlerror() -> Option<String> {
    // SAFETY: dlerror returns null or a string valid until the next dl* call
    // on this thread; it is copied out immediately.
    unsafe {
        let msg = libc::dlerror();
        if msg.is_null() {
            None
        } else {
            Some(CStr::from_ptr(msg).to_string_lossy().into_owned())
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "hurd"))]
fn errno_location() -> *mut c_int {
    // SAFETY: always returns this thread's errno slot.
    unsafe { libc::__errno_location() }
}

#[cfg(any(target_os = "android", target_os = "openbsd", target_os = "netbsd"))]
fn errno_location() -> *mut c_int {
    // SAFETY: always returns this thread's errno slot.
    unsafe { libc::__errno() }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "tvos",
    target_os = "watchos",
    target_os = "visionos",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
fn errno_location() -> *mut c_int {
    // SAFETY: always returns this thread's errno slot.
    unsafe { libc::__error() }
}

/// Zero `errno` before a foreign call.
pub(crate) fn clear_last_error() {
    // SAFETY: the slot is thread-local and always writable.
    unsafe { *errno_location() = 0 };
}

/// `errno` as left by the most recent foreign call.
pub(crate) fn last_error() -> i32 {
    // SAFETY: the slot is thread-local and always readable.
    unsafe { *errno_location() }
}
