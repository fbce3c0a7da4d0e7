//! Fragment extraction.
//!
//! The rest of the pipeline only sees pages as ordered lists of
//! [`RawFragment`]s through the [`FragmentSource`] trait. [`PdfDocument`]
//! implements it over real files; [`MemorySource`] serves prepared fragments
//! for tests and for callers that run their own extraction.
//!
//! [`PdfDocument`]: crate::pdf::PdfDocument

pub mod content;
pub mod layout;
mod options;

pub use options::{ExtractOptions, ExtractOrder};

use crate::error::{Error, Result};
use crate::model::RawFragment;

/// A paged document that yields fragments per page.
pub trait FragmentSource {
    /// Number of logical pages.
    fn page_count(&self) -> usize;

    /// Fragments of one page (0-indexed), in extraction order.
    fn fragments(&self, page_index: usize) -> Result<Vec<RawFragment>>;
}

impl<T: FragmentSource + ?Sized> FragmentSource for &T {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn fragments(&self, page_index: usize) -> Result<Vec<RawFragment>> {
        (**self).fragments(page_index)
    }
}

/// Fragments held in memory, one list per page.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: Vec<Vec<RawFragment>>,
}

impl MemorySource {
    pub fn new(pages: Vec<Vec<RawFragment>>) -> Self {
        Self { pages }
    }

    /// Append a page.
    pub fn push_page(&mut self, fragments: Vec<RawFragment>) {
        self.pages.push(fragments);
    }
}

impl FromIterator<Vec<RawFragment>> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Vec<RawFragment>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl FragmentSource for MemorySource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn fragments(&self, page_index: usize) -> Result<Vec<RawFragment>> {
        self.pages
            .get(page_index)
            .cloned()
            .ok_or(Error::PageOutOfRange(page_index, self.pages.len()))
    }
}
