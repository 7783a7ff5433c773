//! Destination records: structs whose fields receive resolved symbols.
//!
//! A record implements [`SymbolTable`] by listing its fields in declaration
//! order as [`SlotDescriptor`]s. Only fields whose type implements [`Slot`]
//! hand the engine a mutable reference; every other field is described but
//! never touched. [`symbol_table!`](crate::symbol_table) writes the impl
//! for a plain struct declaration, and [`SymbolList`] is the run-time
//! equivalent for callers that only learn names while running.

use std::cell::Cell;
use std::fmt;

use procbind_core::{SlotKind, SymbolSpec};

use crate::capability::{FunctionPointer, OrdinalProc, Proc, Resolved, SymbolAddr};

/// A capability-typed field.
pub trait Slot {
    /// Which lookup the engine performs for this slot.
    fn kind(&self) -> SlotKind;

    /// Store a successful resolution.
    fn fill(&mut self, resolved: Resolved);

    fn is_filled(&self) -> bool;
}

impl Slot for Option<SymbolAddr> {
    fn kind(&self) -> SlotKind {
        SlotKind::Address
    }

    fn fill(&mut self, resolved: Resolved) {
        *self = Some(SymbolAddr::from(resolved));
    }

    fn is_filled(&self) -> bool {
        self.is_some()
    }
}

impl Slot for Option<Proc> {
    fn kind(&self) -> SlotKind {
        SlotKind::Callable
    }

    fn fill(&mut self, resolved: Resolved) {
        *self = Some(Proc::from(resolved));
    }

    fn is_filled(&self) -> bool {
        self.is_some()
    }
}

impl Slot for Option<OrdinalProc> {
    fn kind(&self) -> SlotKind {
        SlotKind::Ordinal
    }

    fn fill(&mut self, resolved: Resolved) {
        *self = Some(OrdinalProc::from(resolved));
    }

    fn is_filled(&self) -> bool {
        self.is_some()
    }
}

impl Slot for Option<Box<dyn FunctionPointer>> {
    fn kind(&self) -> SlotKind {
        SlotKind::Dynamic
    }

    fn fill(&mut self, resolved: Resolved) {
        *self = Some(Box::new(Proc::from(resolved)));
    }

    fn is_filled(&self) -> bool {
        self.is_some()
    }
}

/// One field of a destination record.
pub struct SlotDescriptor<'a> {
    /// Field identifier plus `name`/`ordinal` overrides.
    pub spec: SymbolSpec<'a>,
    /// Public field. Non-public fields are never bound.
    pub exported: bool,
    /// The field itself, present only for capability-typed fields.
    pub slot: Option<&'a mut dyn Slot>,
}

impl<'a> SlotDescriptor<'a> {
    /// Exported, non-capability field named `field`.
    ///
    /// A raw identifier (`r#abs`) is recorded without its `r#` prefix.
    #[must_use]
    pub fn new(field: &'a str) -> Self {
        Self {
            spec: SymbolSpec::new(field.strip_prefix("r#").unwrap_or(field)),
            exported: true,
            slot: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: Option<&'a str>) -> Self {
        self.spec = self.spec.with_name(name);
        self
    }

    #[must_use]
    pub fn with_ordinal(mut self, ordinal: Option<&'a str>) -> Self {
        self.spec = self.spec.with_ordinal(ordinal);
        self
    }

    #[must_use]
    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    #[must_use]
    pub fn with_slot(mut self, slot: Option<&'a mut dyn Slot>) -> Self {
        self.slot = slot;
        self
    }

    /// Field identifier.
    #[must_use]
    pub fn field(&self) -> &'a str {
        self.spec.field
    }

    /// Returns true if the engine will try to resolve this field.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.exported && self.slot.is_some()
    }
}

impl fmt::Debug for SlotDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotDescriptor")
            .field("spec", &self.spec)
            .field("exported", &self.exported)
            .field("kind", &self.slot.as_ref().map(|s| s.kind()))
            .finish()
    }
}

/// A destination record for `bind`.
pub trait SymbolTable {
    /// Every field, in declaration order.
    fn slots(&mut self) -> Vec<SlotDescriptor<'_>>;
}

/// Field wrapper used by [`symbol_table!`](crate::symbol_table) to decide at
/// compile time whether a field is capability-typed.
///
/// `(&Probe::new(&mut field)).eligible()` picks [`SlotProbe`] when the
/// field's type implements [`Slot`] and falls back to [`PlainProbe`]
/// otherwise, through method-resolution autoref order.
#[doc(hidden)]
pub struct Probe<'a, T>(Cell<Option<&'a mut T>>);

impl<'a, T> Probe<'a, T> {
    pub fn new(field: &'a mut T) -> Self {
        Self(Cell::new(Some(field)))
    }
}

#[doc(hidden)]
pub trait SlotProbe<'a> {
    fn eligible(&self) -> Option<&'a mut dyn Slot>;
}

impl<'a, T: Slot> SlotProbe<'a> for Probe<'a, T> {
    fn eligible(&self) -> Option<&'a mut dyn Slot> {
        self.0.take().map(|field| field as &'a mut dyn Slot)
    }
}

#[doc(hidden)]
pub trait PlainProbe<'a> {
    fn eligible(&self) -> Option<&'a mut dyn Slot>;
}

impl<'a, T> PlainProbe<'a> for &Probe<'a, T> {
    fn eligible(&self) -> Option<&'a mut dyn Slot> {
        None
    }
}

/// Declare a struct and implement [`SymbolTable`] for it.
///
/// Each field may carry `name = "..."` and `ordinal = "..."` overrides
/// after `=>`. Only `pub` fields of a capability type (`Option<SymbolAddr>`,
/// `Option<Proc>`, `Option<OrdinalProc>`, `Option<Box<dyn FunctionPointer>>`)
/// are bound; everything else is left alone.
///
/// ```ignore
/// procbind::symbol_table! {
///     #[derive(Default)]
///     pub struct User32 {
///         pub MessageBoxW: Option<Proc>,
///         pub message_box: Option<Proc> => { name = "MessageBoxA" },
///         pub by_ordinal: Option<OrdinalProc> => { ordinal = "12" },
///         calls: u32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! symbol_table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
                $( => { $($key:ident = $value:literal),* $(,)? } )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::SymbolTable for $name {
            fn slots(&mut self) -> ::std::vec::Vec<$crate::SlotDescriptor<'_>> {
                #[allow(unused_imports)]
                use $crate::table::{PlainProbe as _, SlotProbe as _};
                $( $( $crate::symbol_table!(@check $($key = $value),*); )? )*
                ::std::vec![
                    $(
                        $crate::SlotDescriptor::new(::core::stringify!($field))
                            .with_name($crate::symbol_table!(@name $($($key = $value),*)?))
                            .with_ordinal($crate::symbol_table!(@ordinal $($($key = $value),*)?))
                            .with_exported(!::core::stringify!($fvis).is_empty())
                            .with_slot((&$crate::table::Probe::new(&mut self.$field)).eligible()),
                    )*
                ]
            }
        }
    };

    (@check) => { () };
    (@check name = $value:literal $(, $($rest:tt)*)?) => {
        $crate::symbol_table!(@check $($($rest)*)?)
    };
    (@check ordinal = $value:literal $(, $($rest:tt)*)?) => {
        $crate::symbol_table!(@check $($($rest)*)?)
    };
    (@check $other:ident = $value:literal $(, $($rest:tt)*)?) => {
        ::core::compile_error!(::core::concat!(
            "unknown symbol_table key `", ::core::stringify!($other), "`; expected `name` or `ordinal`"
        ))
    };

    (@name) => { ::core::option::Option::None };
    (@name name = $value:literal $(, $($rest:tt)*)?) => { ::core::option::Option::Some($value) };
    (@name $other:ident = $value:literal $(, $($rest:tt)*)?) => {
        $crate::symbol_table!(@name $($($rest)*)?)
    };

    (@ordinal) => { ::core::option::Option::None };
    (@ordinal ordinal = $value:literal $(, $($rest:tt)*)?) => { ::core::option::Option::Some($value) };
    (@ordinal $other:ident = $value:literal $(, $($rest:tt)*)?) => {
        $crate::symbol_table!(@ordinal $($($rest)*)?)
    };
}

/// One requested symbol in a [`SymbolList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// Identifier used when no name override is given.
    pub field: String,
    pub name: Option<String>,
    pub ordinal: Option<String>,
    pub resolved: Option<OrdinalProc>,
}

impl SymbolEntry {
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            name: None,
            ordinal: None,
            resolved: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_ordinal(mut self, ordinal: impl Into<String>) -> Self {
        self.ordinal = Some(ordinal.into());
        self
    }
}

/// Symbol table built at run time. Every entry is an ordinal-capable
/// callable slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolList {
    entries: Vec<SymbolEntry>,
}

impl SymbolList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `name` by its own name.
    pub fn push(&mut self, name: impl Into<String>) -> &mut Self {
        self.entries.push(SymbolEntry::new(name));
        self
    }

    pub fn push_entry(&mut self, entry: SymbolEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    /// Resolution for the entry whose identifier is `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&OrdinalProc> {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .and_then(|e| e.resolved.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that resolved.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.resolved.is_some()).count()
    }
}

impl<S: Into<String>> FromIterator<S> for SymbolList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(SymbolEntry::new).collect(),
        }
    }
}

impl SymbolTable for SymbolList {
    fn slots(&mut self) -> Vec<SlotDescriptor<'_>> {
        self.entries
            .iter_mut()
            .map(|entry| {
                SlotDescriptor::new(&entry.field)
                    .with_name(entry.name.as_deref())
                    .with_ordinal(entry.ordinal.as_deref())
                    .with_slot(Some(&mut entry.resolved as &mut dyn Slot))
            })
            .collect()
    }
}
