//! Ordered, duplicate-free collection of section references
//!
//! Sections are owned by the timeline model; the container only tracks
//! which sections share one trim window, in insertion order so the
//! executor processes them deterministically.

use crate::model::SectionId;

/// The sections sharing one trim window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionsContainer {
    sections: Vec<SectionId>,
}

impl SectionsContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section, ignoring duplicates. Returns true if it was added.
    pub fn add(&mut self, section: SectionId) -> bool {
        if self.sections.contains(&section) {
            return false;
        }
        self.sections.push(section);
        true
    }

    /// Merge-append another container, keeping uniqueness.
    pub fn append(&mut self, other: &SectionsContainer) {
        for &section in other.iter() {
            self.add(section);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionId> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl<'a> IntoIterator for &'a SectionsContainer {
    type Item = &'a SectionId;
    type IntoIter = std::slice::Iter<'a, SectionId>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter()
    }
}
