//! Resolve exported routines from dynamic libraries into typed records.
//!
//! Declare a record with [`symbol_table!`], then [`bind`] it against a
//! library path:
//!
//! ```ignore
//! use procbind::{Proc, symbol_table};
//!
//! symbol_table! {
//!     #[derive(Default)]
//!     pub struct Libc {
//!         pub puts: Option<Proc>,
//!         pub compare: Option<Proc> => { name = "strcmp" },
//!     }
//! }
//!
//! let mut libc = Libc::default();
//! procbind::bind("libc.so.6", &mut libc)?;
//! ```
//!
//! Every library is loaded once per distinct path string and stays loaded.
//! A bare file name (no separator, not absolute) is only searched for in
//! trusted system locations; any other path goes to the loader unchanged.
//! All slot failures of one call are reported together in a [`BindError`].

pub mod backend;
pub mod cache;
pub mod capability;
pub mod engine;
pub mod table;
pub mod trace;

pub use backend::{Backend, NativeBackend, RawHandle, system_directory};
#[cfg(unix)]
pub use backend::UnixBackend;
#[cfg(windows)]
pub use backend::WindowsBackend;
pub use cache::{CacheGuard, Library, LibraryCache};
pub use capability::{
    Addressable, FunctionPointer, MAX_CALL_ARGS, NativeError, OrdinalProc, Proc, Resolved,
    SymbolAddr,
};
pub use engine::{Binder, bind, global_binder};
pub use table::{Slot, SlotDescriptor, SymbolEntry, SymbolList, SymbolTable};

pub use procbind_core::{
    BindError, BindFailure, LibraryPath, PathClass, SearchStrategy, SlotKind, SymbolRef,
    SymbolSpec, classify,
};
