//! The binding engine.
//!
//! A bind call takes the cache lock, fetches or loads the library, then
//! walks the record's slots in declaration order. Each eligible slot is
//! resolved independently; failures are collected and returned together,
//! and slots that did resolve keep their value even when the call fails.

use std::sync::OnceLock;

use procbind_core::{BindError, BindFailure};

use crate::backend::{Backend, NativeBackend};
use crate::cache::LibraryCache;
use crate::capability::Resolved;
use crate::table::SymbolTable;
use crate::trace::{self, BindEvent, EventKind};

/// Binds records against libraries loaded through one [`LibraryCache`].
#[derive(Debug)]
pub struct Binder<B: Backend = NativeBackend> {
    cache: LibraryCache<B>,
}

impl Binder<NativeBackend> {
    /// Binder over the current platform's loader.
    #[must_use]
    pub fn native() -> Self {
        Self::new(NativeBackend::default())
    }
}

impl<B: Backend> Binder<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            cache: LibraryCache::new(backend),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &LibraryCache<B> {
        &self.cache
    }

    /// Resolve every exported capability slot of `table` against the
    /// library at `path`.
    ///
    /// # Errors
    ///
    /// A [`BindError`] holding either the single load failure (no slot is
    /// touched) or one entry per slot that did not resolve.
    pub fn bind<T: SymbolTable + ?Sized>(&self, path: &str, table: &mut T) -> Result<(), BindError> {
        let mut cache = self.cache.lock();
        let library = cache.get_or_load(path)?;
        let backend = cache.backend();
        let ordinals = backend.supports_ordinals();

        let mut errors = BindError::new();
        for descriptor in table.slots() {
            let Some(slot) = descriptor.slot else {
                continue;
            };
            let spec = descriptor.spec;
            if !descriptor.exported {
                trace::emit(EventKind::SlotSkipped, || {
                    BindEvent::new(EventKind::SlotSkipped, path)
                        .with_slot(spec.field)
                        .with_detail("field is not public")
                });
                continue;
            }

            let target = spec.target(slot.kind(), ordinals);
            match library.resolve(backend, &target) {
                Some(addr) => {
                    trace::emit(EventKind::SlotResolved, || {
                        BindEvent::new(EventKind::SlotResolved, path)
                            .with_slot(spec.field)
                            .with_symbol(&target)
                            .with_addr(addr.as_ptr() as usize)
                    });
                    slot.fill(Resolved::new(target, addr));
                }
                None => {
                    let failure = BindFailure::unresolved(path, spec.field, &target);
                    trace::emit(EventKind::SlotFailed, || {
                        BindEvent::new(EventKind::SlotFailed, path)
                            .with_slot(spec.field)
                            .with_symbol(&target)
                            .with_detail(&failure)
                    });
                    errors.push(failure);
                }
            }
        }
        drop(cache);

        errors.into_result()
    }
}

impl<B: Backend + Default> Default for Binder<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

static GLOBAL_BINDER: OnceLock<Binder<NativeBackend>> = OnceLock::new();

/// Process-wide binder used by [`bind`]. Created on first use and kept
/// until the process exits.
#[must_use]
pub fn global_binder() -> &'static Binder<NativeBackend> {
    GLOBAL_BINDER.get_or_init(Binder::native)
}

/// Bind `table` against `path` through the process-wide library cache.
///
/// # Errors
///
/// See [`Binder::bind`].
pub fn bind<T: SymbolTable + ?Sized>(path: &str, table: &mut T) -> Result<(), BindError> {
    global_binder().bind(path, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawHandle;
    use crate::capability::{Addressable, OrdinalProc, Proc, SymbolAddr};
    use procbind_core::{LibraryPath, SymbolRef};
    use std::ffi::c_void;
    use std::ptr::NonNull;

    /// Exports `alpha` at 0x1000, `beta` at 0x2000, ordinal 12 at 0x3000.
    #[derive(Default)]
    struct TableBackend {
        ordinals: bool,
    }

    impl Backend for TableBackend {
        fn open(&self, path: &LibraryPath) -> Result<RawHandle, String> {
            if path.as_str() == "libabsent.so" {
                Err("not found".to_string())
            } else {
                RawHandle::from_addr(0x10).ok_or_else(|| "null handle".to_string())
            }
        }

        fn lookup_name(&self, _handle: RawHandle, name: &str) -> Option<NonNull<c_void>> {
            let addr = match name {
                "alpha" => 0x1000,
                "beta" => 0x2000,
                _ => return None,
            };
            NonNull::new(addr as *mut c_void)
        }

        fn lookup_ordinal(&self, _handle: RawHandle, ordinal: u64) -> Option<NonNull<c_void>> {
            (ordinal == 12).then(|| NonNull::new(0x3000 as *mut c_void)).flatten()
        }

        fn supports_ordinals(&self) -> bool {
            self.ordinals
        }
    }

    crate::symbol_table! {
        #[derive(Default)]
        struct Record {
            pub alpha: Option<Proc>,
            pub second: Option<SymbolAddr> => { name = "beta" },
            pub gamma: Option<Proc>,
            beta: Option<Proc>,
            pub plain: u64,
        }
    }

    crate::symbol_table! {
        #[derive(Default)]
        struct OrdinalRecord {
            pub by_ordinal: Option<OrdinalProc> => { name = "alpha", ordinal = "12" },
            pub bad_ordinal: Option<OrdinalProc> => { name = "beta", ordinal = "0x0c" },
            pub named_proc: Option<Proc> => { name = "alpha", ordinal = "12" },
        }
    }

    #[test]
    fn partial_success_keeps_resolved_slots() {
        let binder = Binder::new(TableBackend::default());
        let mut record = Record {
            plain: 7,
            ..Record::default()
        };
        let err = binder.bind("libtable.so", &mut record).unwrap_err();

        assert_eq!(err.len(), 1);
        assert_eq!(
            err.failures()[0],
            BindFailure::SymbolNotFound {
                library: "libtable.so".into(),
                slot: "gamma".into(),
                symbol: "gamma".into(),
            }
        );
        assert_eq!(record.alpha.as_ref().map(Addressable::addr), Some(0x1000));
        assert_eq!(record.second.as_ref().map(Addressable::addr), Some(0x2000));
        assert!(record.gamma.is_none());
        assert!(record.beta.is_none(), "private slot must stay untouched");
        assert_eq!(record.plain, 7);
    }

    #[test]
    fn load_failure_touches_nothing() {
        let binder = Binder::new(TableBackend::default());
        let mut record = Record::default();
        let err = binder.bind("libabsent.so", &mut record).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.failures()[0].is_load_failure());
        assert!(record.alpha.is_none());
        assert!(record.second.is_none());
        assert_eq!(binder.cache().loads(), 0);
    }

    #[test]
    fn ordinal_wins_when_backend_supports_it() {
        let binder = Binder::new(TableBackend { ordinals: true });
        let mut record = OrdinalRecord::default();
        binder.bind("libtable.so", &mut record).unwrap();

        let by_ordinal = record.by_ordinal.as_ref().unwrap();
        assert_eq!(by_ordinal.addr(), 0x3000);
        assert_eq!(by_ordinal.ordinal(), Some(12));
        // malformed ordinal text falls back to the name
        assert_eq!(record.bad_ordinal.as_ref().map(Addressable::addr), Some(0x2000));
        // plain callables never use ordinals
        assert_eq!(record.named_proc.as_ref().map(Addressable::addr), Some(0x1000));
    }

    #[test]
    fn ordinal_is_ignored_without_backend_support() {
        let binder = Binder::new(TableBackend { ordinals: false });
        let mut record = OrdinalRecord::default();
        binder.bind("libtable.so", &mut record).unwrap();
        let by_ordinal = record.by_ordinal.as_ref().unwrap();
        assert_eq!(by_ordinal.addr(), 0x1000);
        assert_eq!(by_ordinal.symbol(), &SymbolRef::Name("alpha".into()));
    }

    #[test]
    fn repeated_binds_reuse_the_library() {
        let binder = Binder::new(TableBackend::default());
        for _ in 0..3 {
            let mut record = Record::default();
            let _ = binder.bind("libtable.so", &mut record);
        }
        assert_eq!(binder.cache().loads(), 1);
    }
}
