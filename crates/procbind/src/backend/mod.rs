//! Platform symbol backends.
//!
//! Two lookup models exist. ELF and Mach-O systems resolve exports by name
//! only (`dlopen`/`dlsym`). PE systems resolve by name or by numeric ordinal
//! (`LoadLibraryExW`/`GetProcAddress`). Both sit behind [`Backend`] so the
//! cache and the engine never touch OS primitives directly.

use std::ffi::c_void;
use std::ptr::NonNull;

use procbind_core::LibraryPath;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UnixBackend;
#[cfg(unix)]
pub(crate) use unix::{clear_last_error, last_error};
/// Backend for the current target.
#[cfg(unix)]
pub type NativeBackend = UnixBackend;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsBackend;
#[cfg(windows)]
pub(crate) use windows::{clear_last_error, last_error};
/// Backend for the current target.
#[cfg(windows)]
pub type NativeBackend = WindowsBackend;

/// Opaque OS token for a loaded library (`dlopen` handle or `HMODULE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonNull<c_void>);

// SAFETY: the token is only ever handed back to the loader that produced it;
// both dlsym and GetProcAddress are thread-safe for a live handle, and
// handles are never closed.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    #[must_use]
    pub const fn new(ptr: NonNull<c_void>) -> Self {
        Self(ptr)
    }

    /// Handle from a plain address; `None` for zero.
    #[must_use]
    pub fn from_addr(addr: usize) -> Option<Self> {
        NonNull::new(addr as *mut c_void).map(Self)
    }

    #[must_use]
    pub const fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    #[must_use]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// OS load and lookup primitives for one family of platforms.
pub trait Backend: Send + Sync {
    /// Load the library at `path` with the search strategy its
    /// classification selects. The error string is the loader's diagnostic.
    fn open(&self, path: &LibraryPath) -> Result<RawHandle, String>;

    /// Resolve an export by name.
    fn lookup_name(&self, handle: RawHandle, name: &str) -> Option<NonNull<c_void>>;

    /// Resolve an export by ordinal. Backends without ordinals never get here.
    fn lookup_ordinal(&self, _handle: RawHandle, _ordinal: u64) -> Option<NonNull<c_void>> {
        None
    }

    /// Whether this backend's export tables carry ordinals.
    fn supports_ordinals(&self) -> bool {
        false
    }
}

/// Absolute path of the OS's trusted system directory (`System32`).
///
/// # Errors
///
/// Always fails outside Windows, where no single such directory exists.
pub fn system_directory() -> std::io::Result<std::path::PathBuf> {
    #[cfg(windows)]
    {
        windows::system_directory()
    }
    #[cfg(not(windows))]
    {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "a trusted system library directory is only defined on Windows",
        ))
    }
}
