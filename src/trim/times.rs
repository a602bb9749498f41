//! Trim window value type
//!
//! A [`TrimTimes`] is the half-open `[start, end)` millisecond range into a
//! specific audio asset that one or more sections actually play. Equality
//! between windows is tolerance-based: endpoints that differ by at most the
//! configured `min_difference_ms` describe the same window, so
//! near-duplicate usages merge instead of fragmenting the map.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::model::AssetId;

/// Start and end times in milliseconds for trimming one audio asset.
///
/// `total_ms` is the asset's full duration captured at construction, which
/// keeps the derived queries (looping, already-trimmed, usage percentage)
/// free of store lookups. It does not participate in similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimTimes {
    /// Start time in milliseconds to trim from.
    pub start_ms: i64,
    /// End time in milliseconds to trim to.
    pub end_ms: i64,
    /// The asset these trim times belong to.
    pub asset: Option<AssetId>,
    /// Total duration of the asset in milliseconds.
    pub total_ms: i64,
}

/// Invalid trim times sentinel.
pub const INVALID_TRIM_TIMES: TrimTimes = TrimTimes {
    start_ms: -1,
    end_ms: -1,
    asset: None,
    total_ms: 0,
};

impl TrimTimes {
    pub fn new(start_ms: i64, end_ms: i64, asset: AssetId, total_ms: i64) -> Self {
        Self {
            start_ms,
            end_ms,
            asset: Some(asset),
            total_ms,
        }
    }

    /// True if both endpoints are non-negative and the asset is resolved.
    pub fn is_valid(&self) -> bool {
        self.start_ms >= 0 && self.end_ms >= 0 && self.asset.is_some()
    }

    /// Duration of actual usage in milliseconds.
    pub fn usage_duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Valid, and long enough that trimming to it is actionable.
    pub fn is_valid_length(&self, tolerance_ms: i64) -> bool {
        self.is_valid() && self.usage_duration_ms() >= tolerance_ms
    }

    /// True if the window wraps past the asset end by at least the
    /// tolerance, i.e. the section plays the asset more than once.
    pub fn is_looping(&self, tolerance_ms: i64) -> bool {
        self.end_ms > self.total_ms && self.end_ms - self.total_ms >= tolerance_ms
    }

    /// True if the asset is effectively already trimmed to this window:
    /// usage within tolerance of the full duration and start within
    /// tolerance of zero.
    pub fn is_trimmed(&self, tolerance_ms: i64) -> bool {
        self.total_ms - self.usage_duration_ms() < tolerance_ms && self.start_ms < tolerance_ms
    }

    /// Percentage of the asset duration covered by this window, 0-100.
    pub fn usage_percentage(&self, tolerance_ms: i64) -> f64 {
        if self.is_trimmed(tolerance_ms) {
            return 100.0;
        }
        if self.total_ms <= 0 {
            return 0.0;
        }
        self.usage_duration_ms() as f64 / self.total_ms as f64 * 100.0
    }

    /// True if both endpoints differ by at most `tolerance_ms` and the
    /// windows target the same asset.
    pub fn is_similar(&self, other: &TrimTimes, tolerance_ms: i64) -> bool {
        self.asset == other.asset
            && (self.start_ms - other.start_ms).abs() <= tolerance_ms
            && (self.end_ms - other.end_ms).abs() <= tolerance_ms
    }

    /// Widening merge of two tolerance-equal windows: component-wise max of
    /// both endpoints. The left operand's asset and total are kept.
    pub fn max_with(&self, other: &TrimTimes) -> TrimTimes {
        TrimTimes {
            start_ms: self.start_ms.max(other.start_ms),
            end_ms: self.end_ms.max(other.end_ms),
            asset: self.asset,
            total_ms: self.total_ms,
        }
    }

    /// Verbose diagnostic form: the window in milliseconds and in ticks at
    /// the given rate, plus the share of the asset it covers.
    pub fn describe(&self, tick_rate: i64, tolerance_ms: i64) -> String {
        format!(
            "{self} (ticks {}..{} at {tick_rate}/s, {:.1}% of asset used)",
            crate::timing::ms_to_ticks(self.start_ms, tick_rate),
            crate::timing::ms_to_ticks(self.end_ms, tick_rate),
            self.usage_percentage(tolerance_ms)
        )
    }

    /// Hash over tolerance buckets: endpoints are rounded down to the
    /// nearest multiple of `tolerance_ms` before hashing, so windows that
    /// fall in the same bucket collide and the value can key a
    /// bucket-aware hash map.
    pub fn tolerance_hash(&self, tolerance_ms: i64) -> u64 {
        let mut hasher = DefaultHasher::new();
        (self.start_ms / tolerance_ms * tolerance_ms).hash(&mut hasher);
        (self.end_ms / tolerance_ms * tolerance_ms).hash(&mut hasher);
        self.asset.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Display for TrimTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.asset {
            Some(asset) => write!(
                f,
                "asset #{} [{} ms, {} ms) of {} ms",
                asset.0, self.start_ms, self.end_ms, self.total_ms
            ),
            None => write!(f, "invalid trim times"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: i64 = 200;

    fn window(start: i64, end: i64) -> TrimTimes {
        TrimTimes::new(start, end, AssetId(1), 40_000)
    }

    #[test]
    fn invalid_sentinel() {
        assert!(!INVALID_TRIM_TIMES.is_valid());
        assert!(window(0, 1000).is_valid());
        // End before start is still "valid": validity is endpoint sanity.
        assert!(window(5000, 1000).is_valid());
        assert!(!window(5000, 1000).is_valid_length(TOL));
    }

    #[test]
    fn similarity_within_tolerance() {
        let a = window(1000, 5000);
        assert!(a.is_similar(&window(1200, 5200), TOL));
        assert!(a.is_similar(&window(800, 4800), TOL));
        assert!(!a.is_similar(&window(1201, 5000), TOL));
        assert!(!a.is_similar(&window(1000, 5201), TOL));
    }

    #[test]
    fn similarity_requires_same_asset() {
        let a = window(1000, 5000);
        let b = TrimTimes::new(1000, 5000, AssetId(2), 40_000);
        assert!(!a.is_similar(&b, TOL));
    }

    #[test]
    fn widening_merge_covers_both() {
        let merged = window(1000, 5000).max_with(&window(1150, 5150));
        assert_eq!(merged.start_ms, 1150);
        assert_eq!(merged.end_ms, 5150);
        assert_eq!(merged.asset, Some(AssetId(1)));
    }

    #[test]
    fn looping_boundary_is_inclusive() {
        // Ends exactly tolerance past the asset end: looping.
        assert!(window(0, 40_000 + TOL).is_looping(TOL));
        // One short of the tolerance: not looping.
        assert!(!window(0, 40_000 + TOL - 1).is_looping(TOL));
        assert!(!window(0, 40_000).is_looping(TOL));
    }

    #[test]
    fn trimmed_detection() {
        // Full-length usage from the start is already trimmed.
        assert!(window(0, 40_000).is_trimmed(TOL));
        assert!(window(100, 40_000).is_trimmed(TOL));
        // A real sub-range is not.
        assert!(!window(15_000, 30_000).is_trimmed(TOL));
        // Usage nearly full but starting late is not.
        assert!(!window(500, 40_000).is_trimmed(TOL));
    }

    #[test]
    fn usage_percentage() {
        assert_eq!(window(0, 40_000).usage_percentage(TOL), 100.0);
        let half = window(10_000, 30_000).usage_percentage(TOL);
        assert!((half - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn describe_includes_ticks_and_usage() {
        let text = window(10_000, 30_000).describe(1000, TOL);
        assert!(text.contains("ticks 10000..30000"));
        assert!(text.contains("50.0% of asset used"));
    }

    #[test]
    fn tolerance_hash_collides_for_same_bucket() {
        // Same tolerance bucket hashes identically.
        assert_eq!(
            window(1000, 5000).tolerance_hash(TOL),
            window(1150, 5150).tolerance_hash(TOL)
        );
        // A bucket apart differs.
        assert_ne!(
            window(1000, 5000).tolerance_hash(TOL),
            window(1400, 5400).tolerance_hash(TOL)
        );
    }
}
