//! Data model shared by the extraction, reconstruction and alignment stages.
//!
//! Fragments and paragraphs are page-scoped and short-lived; page records and
//! the aligned table are what leaves the core.

mod fragment;
mod paragraph;
mod record;
mod table;

pub use fragment::{BoundingBox, FragmentKind, RawFragment};
pub use paragraph::Paragraph;
pub use record::{page_marker, PageRecord, Side};
pub use table::{AlignedTable, TableRow};
