//! Process-wide library cache.
//!
//! Each distinct path string is loaded at most once. Entries are created on
//! the first successful load, keyed by the path exactly as the caller wrote
//! it, and never removed; libraries stay mapped until the process exits. A
//! failed load leaves no entry, so the next request tries again.

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};
use procbind_core::{BindFailure, LibraryPath, SearchStrategy, SymbolRef};

use crate::backend::{Backend, NativeBackend, RawHandle};
use crate::trace::{self, BindEvent, EventKind};

/// One loaded dynamic library.
pub struct Library {
    path: LibraryPath,
    raw: RawHandle,
}

impl Library {
    /// Path string the library was loaded with.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    #[must_use]
    pub fn strategy(&self) -> SearchStrategy {
        self.path.strategy()
    }

    /// OS load token. On PE platforms this is also the export table handle.
    #[must_use]
    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Look `symbol` up in this library through `backend`.
    pub(crate) fn resolve<B: Backend + ?Sized>(
        &self,
        backend: &B,
        symbol: &SymbolRef,
    ) -> Option<NonNull<c_void>> {
        match symbol {
            SymbolRef::Name(name) => backend.lookup_name(self.raw, name),
            SymbolRef::Ordinal(ordinal) => backend.lookup_ordinal(self.raw, *ordinal),
        }
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("path", &self.path())
            .field("strategy", &self.strategy())
            .field("raw", &format_args!("{:#x}", self.raw.addr()))
            .finish()
    }
}

/// Path-keyed map of loaded libraries behind one exclusive lock.
pub struct LibraryCache<B: Backend = NativeBackend> {
    backend: B,
    libraries: Mutex<HashMap<String, Arc<Library>>>,
    loads: AtomicUsize,
}

impl<B: Backend> LibraryCache<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            libraries: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Take the cache lock. Loads go through the returned guard, and the
    /// lock is held until it drops.
    pub fn lock(&self) -> CacheGuard<'_, B> {
        CacheGuard {
            cache: self,
            libraries: self.libraries.lock(),
        }
    }

    /// Fetch `path`, loading it first if this is its first use.
    ///
    /// # Errors
    ///
    /// [`BindFailure::LibraryLoadFailed`] with the loader's diagnostic.
    pub fn get_or_load(&self, path: &str) -> Result<Arc<Library>, BindFailure> {
        self.lock().get_or_load(path)
    }

    /// Already-loaded entry for `path`, without loading.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Arc<Library>> {
        self.libraries.lock().get(path).cloned()
    }

    /// Number of cached libraries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.libraries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Successful OS loads performed so far.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl<B: Backend + Default> Default for LibraryCache<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: Backend> fmt::Debug for LibraryCache<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryCache")
            .field("loads", &self.loads())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a [`LibraryCache`].
pub struct CacheGuard<'a, B: Backend> {
    cache: &'a LibraryCache<B>,
    libraries: MutexGuard<'a, HashMap<String, Arc<Library>>>,
}

impl<B: Backend> CacheGuard<'_, B> {
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.cache.backend
    }

    /// Fetch `path`, loading it first if this is its first use.
    ///
    /// # Errors
    ///
    /// [`BindFailure::LibraryLoadFailed`] with the loader's diagnostic. No
    /// entry is created.
    pub fn get_or_load(&mut self, path: &str) -> Result<Arc<Library>, BindFailure> {
        if let Some(library) = self.libraries.get(path) {
            trace::emit(EventKind::LibraryReused, || {
                BindEvent::new(EventKind::LibraryReused, path).with_strategy(library.strategy())
            });
            return Ok(Arc::clone(library));
        }

        let library_path = LibraryPath::new(path);
        let strategy = library_path.strategy();
        let raw = match self.cache.backend.open(&library_path) {
            Ok(raw) => raw,
            Err(reason) => {
                trace::emit(EventKind::LibraryLoadFailed, || {
                    BindEvent::new(EventKind::LibraryLoadFailed, path)
                        .with_strategy(strategy)
                        .with_detail(&reason)
                });
                return Err(BindFailure::LibraryLoadFailed {
                    path: path.to_string(),
                    reason,
                });
            }
        };
        self.cache.loads.fetch_add(1, Ordering::Relaxed);
        trace::emit(EventKind::LibraryLoaded, || {
            BindEvent::new(EventKind::LibraryLoaded, path)
                .with_strategy(strategy)
                .with_addr(raw.addr())
        });

        let library = Arc::new(Library {
            path: library_path,
            raw,
        });
        self.libraries
            .insert(path.to_string(), Arc::clone(&library));
        Ok(library)
    }
}
