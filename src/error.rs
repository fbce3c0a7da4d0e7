//! Error types for taiyaku.

use std::fmt;
use std::io;
use thiserror::Error;

use crate::model::Side;

/// Result type alias for taiyaku operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Cropping spreads into logical pages
    Splitting,
    /// Reading positioned text from a page
    Extraction,
    /// Pairing source and target pages
    Alignment,
    /// Building or serializing the output table
    Emission,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Splitting => "splitting",
            Stage::Extraction => "extraction",
            Stage::Alignment => "alignment",
            Stage::Emission => "emission",
        };
        f.write_str(name)
    }
}

/// Error types that can occur while building a bilingual table.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Low-level PDF parsing failure outside any particular stage.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The input cannot be treated as a valid paged document.
    #[error("not a valid paged document: {message}")]
    DocumentFormat {
        /// Stage that tried to open the document
        stage: Stage,
        /// Underlying reason
        message: String,
    },

    /// A page's content could not be read.
    #[error("cannot read {side} page {page}: {message}")]
    Extraction {
        /// Which document the page belongs to
        side: Side,
        /// Zero-based logical page index
        page: usize,
        /// Underlying reason
        message: String,
    },

    /// Source and target documents disagree on page count.
    #[error(
        "source has {source_pages} pages but target has {target_pages}{}",
        missing_page(.page)
    )]
    PageCountMismatch {
        /// Logical pages in the source document
        source_pages: usize,
        /// Logical pages in the target document
        target_pages: usize,
        /// First source page without a target counterpart, once alignment reached it
        page: Option<usize>,
    },

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// The noise pattern is not a valid regular expression.
    #[error("Invalid noise pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Invalid configuration value or file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error while rendering the output table.
    #[error("cannot emit table: {0}")]
    Render(String),
}

impl Error {
    /// Stage the error belongs to, if it is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::DocumentFormat { stage, .. } => Some(*stage),
            Error::Extraction { .. } | Error::PageOutOfRange(..) => Some(Stage::Extraction),
            Error::PageCountMismatch { .. } => Some(Stage::Alignment),
            Error::Render(_) => Some(Stage::Emission),
            _ => None,
        }
    }

    /// Zero-based page index the error refers to, where known.
    pub fn page(&self) -> Option<usize> {
        match self {
            Error::Extraction { page, .. } => Some(*page),
            Error::PageOutOfRange(page, _) => Some(*page),
            Error::PageCountMismatch { page, .. } => *page,
            _ => None,
        }
    }

    /// Re-label a document-level failure with the stage that hit it.
    pub(crate) fn in_stage(self, stage: Stage) -> Self {
        match self {
            Error::UnknownFormat
            | Error::UnsupportedVersion(_)
            | Error::Encrypted
            | Error::PdfParse(_) => Error::DocumentFormat {
                stage,
                message: self.to_string(),
            },
            Error::DocumentFormat { message, .. } => Error::DocumentFormat { stage, message },
            other => other,
        }
    }
}

fn missing_page(page: &Option<usize>) -> String {
    match page {
        Some(page) => format!(" (no target page {})", page),
        None => String::new(),
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Render(format!("CSV error: {}", err))
    }
}
