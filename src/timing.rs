//! Tick-based timing conversions
//!
//! Sequences author their sections in integer ticks at a per-sequence tick
//! rate (ticks per second), while trim windows are expressed in
//! milliseconds into the audio asset. All conversions use truncating
//! integer arithmetic; at the tick rates sequencers use (thousands to
//! millions of ticks per second) a truncated remainder is well below the
//! trimming tolerance.

/// Convert a tick count to milliseconds at the given tick rate.
///
/// Truncating division; negative inputs follow Rust integer semantics.
pub fn ticks_to_ms(ticks: i64, tick_rate: i64) -> i64 {
    debug_assert!(tick_rate > 0, "tick_rate must be positive");
    ticks * 1000 / tick_rate
}

/// Convert milliseconds to a tick count at the given tick rate.
pub fn ms_to_ticks(ms: i64, tick_rate: i64) -> i64 {
    debug_assert!(tick_rate > 0, "tick_rate must be positive");
    ms * tick_rate / 1000
}
