//! Top-level mapping from audio assets to their trim windows
//!
//! Insertion-ordered so a whole run is deterministic. Supports the bulk
//! predicate queries and removals the policy passes are built on.

use crate::model::AssetId;
use crate::trim::map::TrimTimesMap;
use crate::trim::sections::SectionsContainer;
use crate::trim::times::TrimTimes;

/// Map of assets to their per-asset trim times maps.
#[derive(Debug, Clone, Default)]
pub struct TrimTimesMultiMap {
    entries: Vec<(AssetId, TrimTimesMap)>,
}

impl TrimTimesMultiMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(AssetId, TrimTimesMap)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (AssetId, TrimTimesMap)> {
        self.entries.iter_mut()
    }

    pub fn assets(&self) -> Vec<AssetId> {
        self.entries.iter().map(|(asset, _)| *asset).collect()
    }

    pub fn get(&self, asset: AssetId) -> Option<&TrimTimesMap> {
        self.entries
            .iter()
            .find(|(key, _)| *key == asset)
            .map(|(_, map)| map)
    }

    pub fn get_mut(&mut self, asset: AssetId) -> Option<&mut TrimTimesMap> {
        self.entries
            .iter_mut()
            .find(|(key, _)| *key == asset)
            .map(|(_, map)| map)
    }

    pub fn find_or_add(&mut self, asset: AssetId) -> &mut TrimTimesMap {
        if let Some(index) = self.entries.iter().position(|(key, _)| *key == asset) {
            return &mut self.entries[index].1;
        }
        self.entries.push((asset, TrimTimesMap::new()));
        &mut self.entries.last_mut().expect("just pushed").1
    }

    /// Assets having at least one `(window, sections)` pair matching the
    /// predicate, in map order.
    pub fn assets_matching<P>(&self, mut predicate: P) -> Vec<AssetId>
    where
        P: FnMut(&TrimTimes, &SectionsContainer) -> bool,
    {
        let mut matched = Vec::new();
        for (asset, map) in &self.entries {
            if map.iter().any(|(times, sections)| predicate(times, sections)) {
                matched.push(*asset);
            }
        }
        matched
    }

    /// Attach a whole per-asset map under `asset`. The caller must have
    /// retargeted the map's windows and sections beforehand.
    pub fn insert_map(&mut self, asset: AssetId, map: TrimTimesMap) {
        debug_assert!(
            self.get(asset).is_none(),
            "asset #{} already present in multimap",
            asset.0
        );
        self.entries.push((asset, map));
    }

    pub fn remove(&mut self, asset: AssetId) -> Option<TrimTimesMap> {
        let index = self.entries.iter().position(|(key, _)| *key == asset)?;
        Some(self.entries.remove(index).1)
    }

    pub fn remove_many(&mut self, assets: &[AssetId]) {
        self.entries.retain(|(key, _)| !assets.contains(key));
    }
}
