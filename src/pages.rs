use crate::error::{Result, SplitError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start_page: u32, // 1-based inclusive
    pub end_page: u32,   // 1-based inclusive
}

impl PageRange {
    pub fn new(start_page: u32, end_page: u32) -> Self {
        Self {
            start_page,
            end_page,
        }
    }

    /// Checks `1 <= start <= end <= total_pages`. Never clamps.
    pub fn validate(&self, total_pages: u32) -> Result<()> {
        if self.start_page < 1 {
            return Err(SplitError::InvalidRange(format!(
                "start page {} is below 1",
                self.start_page
            )));
        }
        if self.start_page > self.end_page {
            return Err(SplitError::InvalidRange(format!(
                "start page {} is after end page {}",
                self.start_page, self.end_page
            )));
        }
        if self.end_page > total_pages {
            return Err(SplitError::InvalidRange(format!(
                "end page {} exceeds page count {}",
                self.end_page, total_pages
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> u32 {
        self.end_page.saturating_sub(self.start_page) + 1
    }

    pub fn to_set(&self) -> PageSet {
        (self.start_page..=self.end_page).collect()
    }
}

/// Unordered set of 1-based page numbers, serialized as a sorted array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSet(BTreeSet<u32>);

impl PageSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Every page of an `n`-page document.
    pub fn full(n: u32) -> Self {
        (1..=n).collect()
    }

    pub fn insert(&mut self, page: u32) -> bool {
        self.0.insert(page)
    }

    pub fn contains(&self, page: u32) -> bool {
        self.0.contains(&page)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn min(&self) -> Option<u32> {
        self.0.first().copied()
    }

    pub fn max(&self) -> Option<u32> {
        self.0.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn extend_from(&mut self, other: &PageSet) {
        self.0.extend(other.iter());
    }

    pub fn difference(&self, other: &PageSet) -> PageSet {
        self.0.difference(&other.0).copied().collect()
    }

    /// The smallest range containing every page, if any.
    pub fn span(&self) -> Option<PageRange> {
        Some(PageRange::new(self.min()?, self.max()?))
    }

    pub fn is_contiguous(&self) -> bool {
        match self.span() {
            Some(r) => r.len() as usize == self.len(),
            None => true,
        }
    }

    /// Pages joined with dashes, e.g. `3-4-5`.
    pub fn dash_joined(&self) -> String {
        self.iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl FromIterator<u32> for PageSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PageSet {
    type Item = &'a u32;
    type IntoIter = std::collections::btree_set::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Union of the page sets yielded by `sets`.
pub fn union<'a>(sets: impl IntoIterator<Item = &'a PageSet>) -> PageSet {
    let mut out = PageSet::new();
    for s in sets {
        out.extend_from(s);
    }
    out
}
