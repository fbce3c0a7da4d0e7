//! Page-synchronized pairing of source and target paragraphs.
//!
//! [`PageAligner`] walks both documents page by page and yields one
//! [`PageRecord`] per logical page. It is an iterator of results, so callers
//! can report progress per page; once the last page is emitted or an error
//! occurs it is done, its records are final and both documents are dropped.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::FragmentSource;
use crate::model::{page_marker, PageRecord, RawFragment, Side};
use crate::noise::NoiseFilter;
use crate::reconstruct::{LanguageProfile, ParagraphReconstructor, DEFAULT_MERGE_THRESHOLD};

/// How to treat documents whose page counts differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Compare page counts before emitting anything
    #[default]
    Strict,
    /// Walk the source pages and fail at the first one the target lacks
    Lenient,
}

/// Reconstruction and noise filtering for one language stream.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    pub reconstructor: ParagraphReconstructor,
    pub noise: NoiseFilter,
}

impl StreamConfig {
    pub fn new(reconstructor: ParagraphReconstructor, noise: NoiseFilter) -> Self {
        Self {
            reconstructor,
            noise,
        }
    }

    /// Stream with the default threshold and noise pattern.
    pub fn with_profile(profile: LanguageProfile) -> Self {
        Self::new(
            ParagraphReconstructor::new(DEFAULT_MERGE_THRESHOLD, profile),
            NoiseFilter::default(),
        )
    }

    /// Paragraph texts of one page, noise removed.
    pub fn paragraphs(&self, fragments: &[RawFragment]) -> Vec<String> {
        let paragraphs = self.reconstructor.reconstruct(fragments);
        self.noise
            .filter(paragraphs)
            .into_iter()
            .map(|p| p.text)
            .collect()
    }
}

/// Options for a [`PageAligner`].
#[derive(Debug, Clone)]
pub struct AlignOptions {
    pub source: StreamConfig,
    pub target: StreamConfig,
    pub marker_prefix: String,
    pub error_mode: ErrorMode,
}

impl AlignOptions {
    pub fn new(source: StreamConfig, target: StreamConfig) -> Self {
        Self {
            source,
            target,
            ..Self::default()
        }
    }

    /// Set the page marker prefix.
    pub fn with_marker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.marker_prefix = prefix.into();
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient page-count handling.
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            source: StreamConfig::with_profile(LanguageProfile::japanese()),
            target: StreamConfig::with_profile(LanguageProfile::english()),
            marker_prefix: "P".to_string(),
            error_mode: ErrorMode::Strict,
        }
    }
}

/// Streams paired page records from two fragment sources.
pub struct PageAligner<S, T> {
    source: Option<S>,
    target: Option<T>,
    options: AlignOptions,
    source_pages: usize,
    target_pages: usize,
    next_page: usize,
    pending: Option<Error>,
    completed: Vec<PageRecord>,
    done: bool,
}

impl<S: FragmentSource, T: FragmentSource> PageAligner<S, T> {
    /// Create an aligner. Page counts are read once, here.
    pub fn new(source: S, target: T, options: AlignOptions) -> Self {
        let source_pages = source.page_count();
        let target_pages = target.page_count();

        let mut pending = None;
        if source_pages != target_pages {
            match options.error_mode {
                ErrorMode::Strict => {
                    pending = Some(Error::PageCountMismatch {
                        source_pages,
                        target_pages,
                        page: None,
                    });
                }
                ErrorMode::Lenient if target_pages > source_pages => {
                    log::warn!(
                        "target has {} extra pages, ignoring them",
                        target_pages - source_pages
                    );
                }
                ErrorMode::Lenient => {}
            }
        }

        Self {
            source: Some(source),
            target: Some(target),
            options,
            source_pages,
            target_pages,
            next_page: 0,
            pending,
            completed: Vec::new(),
            done: false,
        }
    }

    /// Logical pages the aligner walks (the source page count).
    pub fn page_count(&self) -> usize {
        self.source_pages
    }

    /// Check if the aligner has finished, by success or failure.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Records emitted so far, in page order.
    pub fn completed(&self) -> &[PageRecord] {
        &self.completed
    }

    /// Take the emitted records.
    pub fn into_records(self) -> Vec<PageRecord> {
        self.completed
    }

    /// Run the remaining pages sequentially.
    pub fn drain(&mut self) -> Result<()> {
        for result in self.by_ref() {
            result?;
        }
        Ok(())
    }

    /// Run the remaining pages on the rayon pool.
    ///
    /// Records are kept in page order; on failure the records of every page
    /// before the first failing one are retained.
    #[cfg(feature = "parallel")]
    pub fn drain_parallel(&mut self) -> Result<()>
    where
        S: Sync,
        T: Sync,
    {
        use rayon::prelude::*;

        if self.done {
            return Ok(());
        }
        if let Some(err) = self.pending.take() {
            self.finish();
            return Err(err);
        }

        let pages = self.next_page..self.source_pages;
        let results: Vec<Result<PageRecord>> = {
            let this = &*self;
            pages.into_par_iter().map(|page| this.align_page(page)).collect()
        };
        self.next_page = self.source_pages;

        let mut outcome = Ok(());
        for result in results {
            match result {
                Ok(record) => self.completed.push(record),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        self.finish();
        outcome
    }

    fn align_page(&self, page: usize) -> Result<PageRecord> {
        if page >= self.target_pages {
            return Err(Error::PageCountMismatch {
                source_pages: self.source_pages,
                target_pages: self.target_pages,
                page: Some(page),
            });
        }
        let (Some(source), Some(target)) = (self.source.as_ref(), self.target.as_ref()) else {
            return Err(Error::Config("aligner already finished".to_string()));
        };

        let source_fragments = source
            .fragments(page)
            .map_err(|e| extraction_error(Side::Source, page, e))?;
        let target_fragments = target
            .fragments(page)
            .map_err(|e| extraction_error(Side::Target, page, e))?;

        let marker = page_marker(&self.options.marker_prefix, page);
        let record = PageRecord::new(
            page,
            &marker,
            self.options.source.paragraphs(&source_fragments),
            self.options.target.paragraphs(&target_fragments),
        );

        log::debug!(
            "page {}: {} source / {} target paragraphs",
            page,
            record.source_paragraphs.len() - 1,
            record.target_paragraphs.len() - 1
        );
        Ok(record)
    }

    fn finish(&mut self) {
        self.done = true;
        self.source = None;
        self.target = None;
    }
}

impl<S: FragmentSource, T: FragmentSource> Iterator for PageAligner<S, T> {
    type Item = Result<PageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(err) = self.pending.take() {
            self.finish();
            return Some(Err(err));
        }
        if self.next_page >= self.source_pages {
            self.finish();
            return None;
        }

        let page = self.next_page;
        self.next_page += 1;

        match self.align_page(page) {
            Ok(record) => {
                self.completed.push(record.clone());
                if self.next_page >= self.source_pages {
                    self.finish();
                }
                Some(Ok(record))
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        (0, Some(self.source_pages - self.next_page + 1))
    }
}

/// Attach side and page to a per-page failure.
pub(crate) fn extraction_error(side: Side, page: usize, err: Error) -> Error {
    match err {
        Error::Extraction { .. } | Error::Io(_) => err,
        other => Error::Extraction {
            side,
            page,
            message: other.to_string(),
        },
    }
}
