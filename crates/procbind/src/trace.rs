//! Bind event trace.
//!
//! Loads, cache hits and per-slot outcomes are recorded into a bounded
//! in-process ring when `PROCBIND_TRACE` asks for them. Consumers (the
//! harness, tests) pull events out with [`drain`]. When the ring is full the
//! oldest event is evicted and counted in [`dropped`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use procbind_core::{SearchStrategy, trace_level};

/// Maximum number of buffered events.
pub const TRACE_CAPACITY: usize = 1024;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LibraryLoaded,
    LibraryReused,
    LibraryLoadFailed,
    SlotResolved,
    SlotFailed,
    /// Capability-typed but not exported.
    SlotSkipped,
}

impl EventKind {
    /// Returns true for events that report a failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::LibraryLoadFailed | Self::SlotFailed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LibraryLoaded => "library_loaded",
            Self::LibraryReused => "library_reused",
            Self::LibraryLoadFailed => "library_load_failed",
            Self::SlotResolved => "slot_resolved",
            Self::SlotFailed => "slot_failed",
            Self::SlotSkipped => "slot_skipped",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded bind event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindEvent {
    /// Process-wide sequence number, assigned on record.
    pub seq: u64,
    pub kind: EventKind,
    /// Library path as passed to bind.
    pub library: String,
    pub strategy: Option<SearchStrategy>,
    /// Field identifier of the slot.
    pub slot: Option<String>,
    /// Name or `#ordinal` that was looked up.
    pub symbol: Option<String>,
    /// Resolved address.
    pub addr: Option<usize>,
    /// Loader diagnostic or failure message.
    pub detail: Option<String>,
}

impl BindEvent {
    #[must_use]
    pub fn new(kind: EventKind, library: impl Into<String>) -> Self {
        Self {
            seq: 0,
            kind,
            library: library.into(),
            strategy: None,
            slot: None,
            symbol: None,
            addr: None,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl fmt::Display) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }

    #[must_use]
    pub fn with_addr(mut self, addr: usize) -> Self {
        self.addr = Some(addr);
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

struct EventRing {
    events: Mutex<VecDeque<BindEvent>>,
    next_seq: AtomicU64,
    dropped: AtomicU64,
}

impl EventRing {
    fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(TRACE_CAPACITY)),
            next_seq: AtomicU64::new(1),
            dropped: AtomicU64::new(0),
        }
    }

    fn push(&self, mut event: BindEvent) {
        event.seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut events = self.events.lock();
        if events.len() == TRACE_CAPACITY {
            events.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        events.push_back(event);
    }
}

static RING: OnceLock<EventRing> = OnceLock::new();

fn ring() -> &'static EventRing {
    RING.get_or_init(EventRing::new)
}

/// Returns true if events of `kind` are recorded at the current level.
#[must_use]
pub fn enabled(kind: EventKind) -> bool {
    trace_level().records(kind.is_failure())
}

/// Record the event built by `build` if the current level wants `kind`.
/// The closure is not called otherwise.
pub(crate) fn emit(kind: EventKind, build: impl FnOnce() -> BindEvent) {
    if enabled(kind) {
        ring().push(build());
    }
}

/// Take every buffered event, oldest first.
#[must_use]
pub fn drain() -> Vec<BindEvent> {
    ring().events.lock().drain(..).collect()
}

/// Number of events evicted because the ring was full.
#[must_use]
pub fn dropped() -> u64 {
    ring().dropped.load(Ordering::Relaxed)
}
