//! Capability types: what a slot receives once its symbol resolves.
//!
//! [`SymbolAddr`] carries the address only. [`Proc`] and [`OrdinalProc`]
//! add a machine-word trampoline; they differ only in how they are resolved
//! (name vs. name-or-ordinal). `Box<dyn FunctionPointer>` is the abstract
//! form for callers that do not care which concrete type they hold.
//!
//! No argument marshalling happens here: every argument and the return value
//! are passed as `usize`, and the caller is responsible for matching the
//! foreign routine's real signature.

use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::ptr::NonNull;

use procbind_core::SymbolRef;

use crate::backend::{clear_last_error, last_error};

/// Most arguments [`FunctionPointer::call`] can pass.
pub const MAX_CALL_ARGS: usize = 15;

/// A successful lookup: the export that was asked for and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    symbol: SymbolRef,
    addr: NonNull<c_void>,
}

impl Resolved {
    #[must_use]
    pub fn new(symbol: SymbolRef, addr: NonNull<c_void>) -> Self {
        Self { symbol, addr }
    }

    #[must_use]
    pub fn symbol(&self) -> &SymbolRef {
        &self.symbol
    }

    #[must_use]
    pub fn addr(&self) -> usize {
        self.addr.as_ptr() as usize
    }
}

/// OS error state captured right after a foreign call: `errno` on Unix,
/// `GetLastError()` on Windows. Zero means the callee reported nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NativeError(i32);

impl NativeError {
    #[must_use]
    pub const fn from_raw(code: i32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            f.write_str("no error")
        } else {
            write!(f, "{}", std::io::Error::from_raw_os_error(self.0))
        }
    }
}

impl std::error::Error for NativeError {}

/// Anything with a resolved address.
pub trait Addressable {
    fn addr(&self) -> usize;
}

/// A resolved, callable export.
pub trait FunctionPointer: Addressable + fmt::Debug + Send + Sync {
    /// Call the routine with `args` as machine words.
    ///
    /// Returns the routine's return register and the OS error state it left
    /// behind. The error state is cleared before the call.
    ///
    /// # Safety
    ///
    /// The routine must take exactly `args.len()` word-sized integer or
    /// pointer arguments in the platform's C calling convention, every
    /// pointer argument must be valid for whatever the routine does with it,
    /// and the library must still be loaded.
    ///
    /// # Panics
    ///
    /// If `args.len()` exceeds [`MAX_CALL_ARGS`].
    unsafe fn call(&self, args: &[usize]) -> (usize, NativeError);
}

/// Address-only slot value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolAddr {
    symbol: SymbolRef,
    addr: NonNull<c_void>,
}

// SAFETY: an export address is immutable process-wide data.
unsafe impl Send for SymbolAddr {}
unsafe impl Sync for SymbolAddr {}

impl SymbolAddr {
    #[must_use]
    pub fn symbol(&self) -> &SymbolRef {
        &self.symbol
    }

    #[must_use]
    pub fn as_ptr(&self) -> *mut c_void {
        self.addr.as_ptr()
    }
}

impl Addressable for SymbolAddr {
    fn addr(&self) -> usize {
        self.addr.as_ptr() as usize
    }
}

impl From<Resolved> for SymbolAddr {
    fn from(resolved: Resolved) -> Self {
        Self {
            symbol: resolved.symbol,
            addr: resolved.addr,
        }
    }
}

/// Callable export resolved by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proc {
    name: String,
    addr: NonNull<c_void>,
}

// SAFETY: see `SymbolAddr`.
unsafe impl Send for Proc {}
unsafe impl Sync for Proc {}

impl Proc {
    /// Export name this procedure was resolved from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reinterpret the address as a typed function pointer.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the routine's real
    /// signature and calling convention.
    ///
    /// # Panics
    ///
    /// If `F` is not pointer-sized.
    #[must_use]
    pub unsafe fn cast<F: Copy>(&self) -> F {
        unsafe { cast_fn(self.addr) }
    }
}

impl Addressable for Proc {
    fn addr(&self) -> usize {
        self.addr.as_ptr() as usize
    }
}

impl FunctionPointer for Proc {
    unsafe fn call(&self, args: &[usize]) -> (usize, NativeError) {
        unsafe { invoke(self.addr, args) }
    }
}

impl From<Resolved> for Proc {
    fn from(resolved: Resolved) -> Self {
        Self {
            name: resolved.symbol.to_string(),
            addr: resolved.addr,
        }
    }
}

/// Callable export resolved by ordinal when one is given, else by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalProc {
    symbol: SymbolRef,
    addr: NonNull<c_void>,
}

// SAFETY: see `SymbolAddr`.
unsafe impl Send for OrdinalProc {}
unsafe impl Sync for OrdinalProc {}

impl OrdinalProc {
    /// The name or ordinal this procedure was resolved from.
    #[must_use]
    pub fn symbol(&self) -> &SymbolRef {
        &self.symbol
    }

    /// Ordinal used for resolution, if it was resolved by ordinal.
    #[must_use]
    pub fn ordinal(&self) -> Option<u64> {
        match self.symbol {
            SymbolRef::Ordinal(ordinal) => Some(ordinal),
            SymbolRef::Name(_) => None,
        }
    }

    /// See [`Proc::cast`].
    ///
    /// # Safety
    ///
    /// `F` must match the routine's real signature and calling convention.
    ///
    /// # Panics
    ///
    /// If `F` is not pointer-sized.
    #[must_use]
    pub unsafe fn cast<F: Copy>(&self) -> F {
        unsafe { cast_fn(self.addr) }
    }
}

impl Addressable for OrdinalProc {
    fn addr(&self) -> usize {
        self.addr.as_ptr() as usize
    }
}

impl FunctionPointer for OrdinalProc {
    unsafe fn call(&self, args: &[usize]) -> (usize, NativeError) {
        unsafe { invoke(self.addr, args) }
    }
}

impl From<Resolved> for OrdinalProc {
    fn from(resolved: Resolved) -> Self {
        Self {
            symbol: resolved.symbol,
            addr: resolved.addr,
        }
    }
}

unsafe fn cast_fn<F: Copy>(addr: NonNull<c_void>) -> F {
    assert_eq!(
        mem::size_of::<F>(),
        mem::size_of::<*mut c_void>(),
        "procbind: cast target must be a function pointer"
    );
    let ptr = addr.as_ptr();
    // SAFETY: sizes checked above; the caller vouches for the signature.
    unsafe { mem::transmute_copy::<*mut c_void, F>(&ptr) }
}

/// Clear the OS error state, call `addr` with `args`, and capture the state
/// the callee left.
unsafe fn invoke(addr: NonNull<c_void>, args: &[usize]) -> (usize, NativeError) {
    clear_last_error();
    // SAFETY: forwarded from `FunctionPointer::call`.
    let ret = unsafe { dispatch(addr.as_ptr(), args) };
    (ret, NativeError(last_error()))
}

/// Expands to `usize`; used to repeat the word type once per argument.
macro_rules! word {
    ($i:tt) => {
        usize
    };
}

/// One match arm per arity, each transmuting the address to an
/// `extern "system"` function of that many `usize` arguments.
macro_rules! trampoline {
    ($ptr:expr, $args:expr; $($n:literal => [$($i:tt)*]),* $(,)?) => {
        match $args.len() {
            $(
                $n => {
                    // SAFETY: the caller guarantees the routine's arity.
                    let f: unsafe extern "system" fn($(word!($i)),*) -> usize =
                        unsafe { mem::transmute::<*mut c_void, _>($ptr) };
                    unsafe { f($($args[$i]),*) }
                }
            )*
            n => panic!("procbind: {n} arguments exceeds the trampoline limit of {MAX_CALL_ARGS}"),
        }
    };
}

unsafe fn dispatch(ptr: *mut c_void, args: &[usize]) -> usize {
    trampoline!(ptr, args;
        0 => [],
        1 => [0],
        2 => [0 1],
        3 => [0 1 2],
        4 => [0 1 2 3],
        5 => [0 1 2 3 4],
        6 => [0 1 2 3 4 5],
        7 => [0 1 2 3 4 5 6],
        8 => [0 1 2 3 4 5 6 7],
        9 => [0 1 2 3 4 5 6 7 8],
        10 => [0 1 2 3 4 5 6 7 8 9],
        11 => [0 1 2 3 4 5 6 7 8 9 10],
        12 => [0 1 2 3 4 5 6 7 8 9 10 11],
        13 => [0 1 2 3 4 5 6 7 8 9 10 11 12],
        14 => [0 1 2 3 4 5 6 7 8 9 10 11 12 13],
        15 => [0 1 2 3 4 5 6 7 8 9 10 11 12 13 14],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "system" fn add3(a: usize, b: usize, c: usize) -> usize {
        a + b * 10 + c * 100
    }

    extern "system" fn sum15(
        a0: usize,
        a1: usize,
        a2: usize,
        a3: usize,
        a4: usize,
        a5: usize,
        a6: usize,
        a7: usize,
        a8: usize,
        a9: usize,
        a10: usize,
        a11: usize,
        a12: usize,
        a13: usize,
        a14: usize,
    ) -> usize {
        a0 + a1 + a2 + a3 + a4 + a5 + a6 + a7 + a8 + a9 + a10 + a11 + a12 + a13 + a14
    }

    extern "system" fn answer() -> usize {
        42
    }

    fn resolved(name: &str, f: usize) -> Resolved {
        Resolved::new(
            SymbolRef::Name(name.to_string()),
            NonNull::new(f as *mut c_void).unwrap(),
        )
    }

    #[test]
    fn trampoline_passes_words_in_order() {
        let proc = Proc::from(resolved("add3", add3 as usize));
        let (ret, err) = unsafe { proc.call(&[1, 2, 3]) };
        assert_eq!(ret, 321);
        assert!(err.is_success());
    }

    #[test]
    fn trampoline_handles_zero_and_max_arity() {
        let zero = Proc::from(resolved("answer", answer as usize));
        assert_eq!(unsafe { zero.call(&[]) }.0, 42);

        let max = Proc::from(resolved("sum15", sum15 as usize));
        let args: Vec<usize> = (1..=15).collect();
        assert_eq!(unsafe { max.call(&args) }.0, 120);
    }

    #[test]
    #[should_panic(expected = "trampoline limit")]
    fn too_many_arguments_panics() {
        let proc = Proc::from(resolved("answer", answer as usize));
        let args = [0usize; MAX_CALL_ARGS + 1];
        let _ = unsafe { proc.call(&args) };
    }

    #[test]
    fn cast_gives_typed_pointer() {
        let proc = Proc::from(resolved("add3", add3 as usize));
        let f: extern "system" fn(usize, usize, usize) -> usize = unsafe { proc.cast() };
        assert_eq!(f(3, 2, 1), 123);
    }

    #[test]
    fn ordinal_proc_reports_its_ordinal() {
        let by_ordinal = OrdinalProc::from(Resolved::new(
            SymbolRef::Ordinal(12),
            NonNull::new(answer as usize as *mut c_void).unwrap(),
        ));
        assert_eq!(by_ordinal.ordinal(), Some(12));
        assert_eq!(by_ordinal.symbol().to_string(), "#12");

        let by_name = OrdinalProc::from(resolved("answer", answer as usize));
        assert_eq!(by_name.ordinal(), None);
    }

    #[test]
    fn dyn_function_pointer_dispatches() {
        let boxed: Box<dyn FunctionPointer> = Box::new(Proc::from(resolved("answer", answer as usize)));
        assert_eq!(boxed.addr(), answer as usize);
        assert_eq!(unsafe { boxed.call(&[]) }.0, 42);
    }

    #[test]
    fn native_error_display() {
        assert_eq!(NativeError::default().to_string(), "no error");
        assert!(!NativeError::from_raw(2).is_success());
        assert!(!NativeError::from_raw(2).to_string().is_empty());
    }
}
