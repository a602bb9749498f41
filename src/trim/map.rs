//! Per-asset map from trim windows to the sections sharing them
//!
//! Keys are pairwise non-similar under the tolerance: inserting a window
//! that is tolerance-equal to an existing key widens that key instead of
//! adding a duplicate. Entries keep insertion order until
//! [`TrimTimesMap::sort_keys`] orders them by `(start, end)` for
//! deterministic group processing.
//!
//! The map also carries the **rebuild protocol** used by policy passes
//! that mutate sections mid-iteration: see [`TrimTimesMap::rebuild_with`].

use crate::model::SectionId;
use crate::trim::sections::SectionsContainer;
use crate::trim::times::TrimTimes;

/// Map of trim windows to their sections for a single asset.
#[derive(Debug, Clone, Default)]
pub struct TrimTimesMap {
    entries: Vec<(TrimTimes, SectionsContainer)>,
}

impl TrimTimesMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(TrimTimes, SectionsContainer)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (TrimTimes, SectionsContainer)> {
        self.entries.iter_mut()
    }

    /// Insert a `(window, section)` pair, widening an existing
    /// tolerance-equal key instead of inserting a duplicate.
    ///
    /// Invalid windows are rejected.
    pub fn insert(&mut self, trim_times: TrimTimes, section: SectionId, tolerance_ms: i64) -> bool {
        if !trim_times.is_valid() {
            return false;
        }

        for (key, sections) in &mut self.entries {
            if key.is_similar(&trim_times, tolerance_ms) {
                // Endpoints may differ by up to the tolerance; keep the
                // larger window so it covers every merged usage.
                *key = key.max_with(&trim_times);
                return sections.add(section);
            }
        }

        let mut sections = SectionsContainer::new();
        sections.add(section);
        self.entries.push((trim_times, sections));
        true
    }

    /// Insert a whole `(window, sections)` group, merging into a
    /// tolerance-equal key if one exists.
    pub fn insert_group(
        &mut self,
        trim_times: TrimTimes,
        group: SectionsContainer,
        tolerance_ms: i64,
    ) {
        if !trim_times.is_valid() {
            return;
        }

        for (key, sections) in &mut self.entries {
            if key.is_similar(&trim_times, tolerance_ms) {
                *key = key.max_with(&trim_times);
                sections.append(&group);
                return;
            }
        }

        self.entries.push((trim_times, group));
    }

    /// Sort keys by `(start, end)` ascending.
    pub fn sort_keys(&mut self) {
        self.entries
            .sort_by_key(|(times, _)| (times.start_ms, times.end_ms));
    }

    /// Run `processor` once per `(section, window)` pair, letting it
    /// register replacement sections into the accumulator. Every key whose
    /// processing grew the accumulator is removed; the accumulated sections
    /// are returned so the caller can recompute their windows and re-insert
    /// them (the computation needs the timeline/store collaborators, which
    /// this container deliberately knows nothing about).
    ///
    /// Keys untouched by the processor keep their entries, so a pass only
    /// pays recomputation for what it actually mutated.
    pub fn rebuild_with<P>(&mut self, mut processor: P) -> SectionsContainer
    where
        P: FnMut(SectionId, &TrimTimes, &mut SectionsContainer),
    {
        let mut accumulated = SectionsContainer::new();
        let mut removed = Vec::new();

        for (index, (trim_times, sections)) in self.entries.iter().enumerate() {
            if !trim_times.is_valid() {
                continue;
            }

            let before = accumulated.len();
            for &section in sections.iter() {
                processor(section, trim_times, &mut accumulated);
            }
            if accumulated.len() > before {
                removed.push(index);
            }
        }

        for &index in removed.iter().rev() {
            self.entries.remove(index);
        }

        accumulated
    }

    /// Remove every entry, returning them in current order.
    pub fn drain(&mut self) -> Vec<(TrimTimes, SectionsContainer)> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetId;

    const TOL: i64 = 200;

    fn window(start: i64, end: i64) -> TrimTimes {
        TrimTimes::new(start, end, AssetId(1), 60_000)
    }

    #[test]
    fn insert_merges_similar_windows() {
        let mut map = TrimTimesMap::new();
        assert!(map.insert(window(1000, 5000), SectionId(0), TOL));
        assert!(map.insert(window(1150, 5100), SectionId(1), TOL));
        assert_eq!(map.len(), 1);

        let (key, sections) = map.iter().next().unwrap();
        // Widened to the component-wise max.
        assert_eq!(key.start_ms, 1150);
        assert_eq!(key.end_ms, 5100);
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn insert_keeps_distinct_windows_apart() {
        let mut map = TrimTimesMap::new();
        map.insert(window(0, 5000), SectionId(0), TOL);
        map.insert(window(10_000, 15_000), SectionId(1), TOL);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn insert_rejects_invalid() {
        let mut map = TrimTimesMap::new();
        assert!(!map.insert(crate::trim::times::INVALID_TRIM_TIMES, SectionId(0), TOL));
        assert!(map.is_empty());
    }

    #[test]
    fn duplicate_section_not_added_twice() {
        let mut map = TrimTimesMap::new();
        assert!(map.insert(window(0, 5000), SectionId(0), TOL));
        assert!(!map.insert(window(0, 5000), SectionId(0), TOL));

        let (_, sections) = map.iter().next().unwrap();
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn sort_keys_orders_by_start_then_end() {
        let mut map = TrimTimesMap::new();
        map.insert(window(10_000, 15_000), SectionId(0), TOL);
        map.insert(window(0, 9000), SectionId(1), TOL);
        map.insert(window(0, 5000), SectionId(2), TOL);
        map.sort_keys();

        let starts: Vec<(i64, i64)> = map.iter().map(|(t, _)| (t.start_ms, t.end_ms)).collect();
        assert_eq!(starts, vec![(0, 5000), (0, 9000), (10_000, 15_000)]);
    }

    #[test]
    fn rebuild_removes_only_touched_keys() {
        let mut map = TrimTimesMap::new();
        map.insert(window(0, 5000), SectionId(0), TOL);
        map.insert(window(10_000, 15_000), SectionId(1), TOL);

        // Processor replaces only sections of the first window.
        let moved = map.rebuild_with(|section, times, out| {
            if times.start_ms == 0 {
                out.add(section);
                out.add(SectionId(7));
            }
        });

        assert_eq!(moved.len(), 2);
        assert_eq!(map.len(), 1);
        let (kept, _) = map.iter().next().unwrap();
        assert_eq!(kept.start_ms, 10_000);
    }

    #[test]
    fn rebuild_with_untouched_map_is_noop() {
        let mut map = TrimTimesMap::new();
        map.insert(window(0, 5000), SectionId(0), TOL);

        let moved = map.rebuild_with(|_, _, _| {});
        assert!(moved.is_empty());
        assert_eq!(map.len(), 1);
    }
}
