//! Runtime trace configuration.
//!
//! The trace level is set via the `PROCBIND_TRACE` environment variable:
//! - `off` (default): no bind events are recorded.
//! - `failures`: only load failures and unresolved slots are recorded.
//! - `all`: every load, cache hit, resolved, failed and skipped slot.
//!
//! The variable is read once, on first use, and cached for the process.

use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable holding the trace level.
pub const TRACE_ENV: &str = "PROCBIND_TRACE";

/// How much of a bind call is recorded in the event trace.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraceLevel {
    #[default]
    Off,
    Failures,
    All,
}

impl TraceLevel {
    /// Parse from string (case-insensitive). Unknown values mean `Off`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "failures" | "errors" | "error" => Self::Failures,
            "all" | "full" | "1" | "on" => Self::All,
            _ => Self::Off,
        }
    }

    /// Returns true if an event of this severity should be recorded.
    #[must_use]
    pub const fn records(self, failure: bool) -> bool {
        match self {
            Self::Off => false,
            Self::Failures => failure,
            Self::All => true,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Failures => "failures",
            Self::All => "all",
        }
    }
}

// 0=unresolved, 1=Off, 2=Failures, 3=All.
static CACHED_LEVEL: AtomicU8 = AtomicU8::new(0);

const LEVEL_UNRESOLVED: u8 = 0;
const LEVEL_OFF: u8 = 1;
const LEVEL_FAILURES: u8 = 2;
const LEVEL_ALL: u8 = 3;

fn level_to_u8(level: TraceLevel) -> u8 {
    match level {
        TraceLevel::Off => LEVEL_OFF,
        TraceLevel::Failures => LEVEL_FAILURES,
        TraceLevel::All => LEVEL_ALL,
    }
}

fn u8_to_level(v: u8) -> TraceLevel {
    match v {
        LEVEL_FAILURES => TraceLevel::Failures,
        LEVEL_ALL => TraceLevel::All,
        _ => TraceLevel::Off,
    }
}

/// Get the configured trace level (reads the env var on first call).
#[must_use]
pub fn trace_level() -> TraceLevel {
    let cached = CACHED_LEVEL.load(Ordering::Acquire);
    if cached != LEVEL_UNRESOLVED {
        return u8_to_level(cached);
    }

    let level = std::env::var(TRACE_ENV)
        .map(|v| TraceLevel::from_str_loose(&v))
        .unwrap_or_default();
    // A concurrent `set_trace_level` takes precedence over the env var.
    match CACHED_LEVEL.compare_exchange(
        LEVEL_UNRESOLVED,
        level_to_u8(level),
        Ordering::AcqRel,
        Ordering::Acquire,
    ) {
        Ok(_) => level,
        Err(actual) => u8_to_level(actual),
    }
}

/// Override the trace level for the rest of the process.
pub fn set_trace_level(level: TraceLevel) {
    CACHED_LEVEL.store(level_to_u8(level), Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(TraceLevel::from_str_loose("ALL"), TraceLevel::All);
        assert_eq!(TraceLevel::from_str_loose(" Failures "), TraceLevel::Failures);
        assert_eq!(TraceLevel::from_str_loose("off"), TraceLevel::Off);
        assert_eq!(TraceLevel::from_str_loose("bogus"), TraceLevel::Off);
    }

    #[test]
    fn records_respects_level() {
        assert!(!TraceLevel::Off.records(true));
        assert!(TraceLevel::Failures.records(true));
        assert!(!TraceLevel::Failures.records(false));
        assert!(TraceLevel::All.records(false));
    }

    #[test]
    fn level_round_trips_through_cache_encoding() {
        for level in [TraceLevel::Off, TraceLevel::Failures, TraceLevel::All] {
            assert_eq!(u8_to_level(level_to_u8(level)), level);
        }
    }

    #[test]
    fn override_is_visible() {
        set_trace_level(TraceLevel::All);
        assert_eq!(trace_level(), TraceLevel::All);
        set_trace_level(TraceLevel::Off);
        assert_eq!(trace_level(), TraceLevel::Off);
    }
}
