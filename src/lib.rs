//! # taiyaku
//!
//! Row-aligned bilingual paragraph tables from two parallel PDF editions.
//!
//! Given a source-language PDF and its translation with the same page
//! structure, taiyaku optionally splits two-page spreads into logical pages,
//! extracts positioned text fragments, rebuilds paragraphs broken by line
//! wraps and layout boxes, drops page-number noise, pairs the pages by index
//! and emits a two-column table.
//!
//! ## Quick Start
//!
//! ```no_run
//! use taiyaku::{align_files, render, OutputFormat};
//!
//! fn main() -> taiyaku::Result<()> {
//!     let alignment = align_files("source_ja.pdf", "target_en.pdf")?;
//!
//!     let options = render::EmitOptions::default();
//!     let csv = alignment.render(OutputFormat::Csv, &options)?;
//!     std::fs::write("table.csv", csv)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - [`spread`]: crop each physical page into left and right halves
//! - [`extract`]: positioned text fragments per page
//! - [`reconstruct`]: merge fragments into paragraphs
//! - [`noise`]: drop page numbers and numeric clusters
//! - [`align`]: pair pages by index into records
//! - [`render`]: flatten records into a sized two-column table

pub mod align;
pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod noise;
pub mod pdf;
pub mod pipeline;
pub mod reconstruct;
pub mod render;
pub mod script;
pub mod spread;

// Re-export commonly used types
pub use align::{AlignOptions, ErrorMode, PageAligner, StreamConfig};
pub use detect::{is_pdf_bytes, sniff_version, sniff_version_from_path};
pub use error::{Error, Result, Stage};
pub use extract::{ExtractOptions, ExtractOrder, FragmentSource, MemorySource};
pub use model::{
    page_marker, AlignedTable, BoundingBox, FragmentKind, PageRecord, Paragraph, RawFragment,
    Side, TableRow,
};
pub use noise::{NoiseFilter, DEFAULT_NOISE_PATTERN};
pub use pdf::PdfDocument;
pub use pipeline::{failing_stage, Alignment, PageParagraphs, Pipeline, PipelineOptions};
pub use reconstruct::{LanguageProfile, ParagraphReconstructor, DEFAULT_MERGE_THRESHOLD};
pub use render::{EmitOptions, JsonFormat, OutputFormat, TableLayout};
pub use spread::SpreadSplitter;

use std::path::Path;

/// Align two parallel PDF files with default options.
///
/// Spreads are split, the source is treated as Japanese and the target as
/// English, and a page-count mismatch is an error.
///
/// # Example
///
/// ```no_run
/// use taiyaku::align_files;
///
/// let alignment = align_files("source.pdf", "target.pdf").unwrap();
/// println!("Pages: {}", alignment.page_count());
/// ```
pub fn align_files<P: AsRef<Path>, Q: AsRef<Path>>(source: P, target: Q) -> Result<Alignment> {
    align_files_with_options(source, target, PipelineOptions::default())
}

/// Align two parallel PDF files with custom options.
///
/// # Example
///
/// ```no_run
/// use taiyaku::{align_files_with_options, PipelineOptions};
///
/// let options = PipelineOptions::new()
///     .with_spread(false)
///     .with_merge_threshold(5.0)
///     .lenient();
/// let alignment = align_files_with_options("source.pdf", "target.pdf", options).unwrap();
/// ```
pub fn align_files_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    target: Q,
    options: PipelineOptions,
) -> Result<Alignment> {
    Pipeline::new(options)?.run_files(source, target)
}

/// Align two PDFs held in memory with default options.
pub fn align_bytes(source: &[u8], target: &[u8]) -> Result<Alignment> {
    Pipeline::new(PipelineOptions::default())?.run_bytes(source, target)
}

/// Align two PDFs held in memory with custom options.
pub fn align_bytes_with_options(
    source: &[u8],
    target: &[u8],
    options: PipelineOptions,
) -> Result<Alignment> {
    Pipeline::new(options)?.run_bytes(source, target)
}

/// Align two PDF files and write the table to `output`.
///
/// The format follows the output extension, falling back to CSV.
///
/// # Example
///
/// ```no_run
/// use taiyaku::{convert_files, PipelineOptions};
///
/// convert_files("source.pdf", "target.pdf", "table.md", PipelineOptions::default()).unwrap();
/// ```
pub fn convert_files<P, Q, R>(
    source: P,
    target: Q,
    output: R,
    options: PipelineOptions,
) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let output = output.as_ref();
    let format = OutputFormat::from_extension(output).unwrap_or_default();
    let emit = options.emit.clone();
    let alignment = align_files_with_options(source, target, options)?;
    render::write_table(alignment.table(), output, format, &emit)
}

/// Split every two-page spread of `input` into logical pages, writing the
/// result to `output`. Returns the logical page count.
///
/// # Example
///
/// ```no_run
/// use taiyaku::split_spreads;
///
/// let pages = split_spreads("scan.pdf", "scan_split.pdf").unwrap();
/// println!("{} logical pages", pages);
/// ```
pub fn split_spreads<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<usize> {
    SpreadSplitter::new().split_file(input, output)
}
