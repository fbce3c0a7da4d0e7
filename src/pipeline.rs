//! End-to-end runs: open, optionally split, extract, align, tabulate.
//!
//! A [`Pipeline`] holds nothing but validated configuration, so running it
//! twice on the same inputs gives the same result.

use std::path::Path;

use lopdf::Document as LopdfDocument;
use serde::{Deserialize, Serialize};

use crate::align::{extraction_error, AlignOptions, ErrorMode, PageAligner, StreamConfig};
use crate::error::{Error, Result, Stage};
use crate::extract::{ExtractOptions, ExtractOrder, FragmentSource};
use crate::model::{AlignedTable, PageRecord, Side};
use crate::noise::{NoiseFilter, DEFAULT_NOISE_PATTERN};
use crate::pdf::PdfDocument;
use crate::reconstruct::{LanguageProfile, ParagraphReconstructor, DEFAULT_MERGE_THRESHOLD};
use crate::render::{self, EmitOptions, OutputFormat};
use crate::spread::{load_bytes, SpreadSplitter};

/// Every knob of a run. Deserializes from JSON with missing fields taking
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Split each physical page into left and right halves first
    pub spread: bool,

    /// Vertical gap under which fragments may merge
    pub merge_threshold: f32,

    /// Terminators and item digits of the source document
    pub source_profile: LanguageProfile,

    /// Terminators and item digits of the target document
    pub target_profile: LanguageProfile,

    /// Regex for paragraphs to drop, matched against the whole text
    pub noise_pattern: String,

    /// Prefix of the per-page marker row
    pub page_marker_prefix: String,

    /// Fragment extraction settings
    pub extract: ExtractOptions,

    /// Page-count mismatch handling
    pub error_mode: ErrorMode,

    /// Process pages on the rayon pool
    pub parallel: bool,

    /// Output labels and layout
    pub emit: EmitOptions,
}

impl PipelineOptions {
    /// Create new pipeline options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid options: {}", e)))
    }

    /// Read options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Enable or disable spread splitting.
    pub fn with_spread(mut self, spread: bool) -> Self {
        self.spread = spread;
        self
    }

    /// Set the merge threshold.
    pub fn with_merge_threshold(mut self, threshold: f32) -> Self {
        self.merge_threshold = threshold;
        self
    }

    /// Set the source profile.
    pub fn with_source_profile(mut self, profile: LanguageProfile) -> Self {
        self.source_profile = profile;
        self
    }

    /// Set the target profile.
    pub fn with_target_profile(mut self, profile: LanguageProfile) -> Self {
        self.target_profile = profile;
        self
    }

    /// Set the noise pattern.
    pub fn with_noise_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.noise_pattern = pattern.into();
        self
    }

    /// Set the page marker prefix.
    pub fn with_marker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.page_marker_prefix = prefix.into();
        self
    }

    /// Set extraction options.
    pub fn with_extract(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    /// Read fragments in content-stream order.
    pub fn native_order(mut self) -> Self {
        self.extract.order = ExtractOrder::Native;
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

    /// Enable or disable parallel page processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set emit options.
    pub fn with_emit(mut self, emit: EmitOptions) -> Self {
        self.emit = emit;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.merge_threshold.is_finite() || self.merge_threshold < 0.0 {
            return Err(Error::Config(format!(
                "merge threshold must be a non-negative number, got {}",
                self.merge_threshold
            )));
        }
        if self.emit.font_size <= 0.0 {
            return Err(Error::Config("font size must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            spread: true,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            source_profile: LanguageProfile::japanese(),
            target_profile: LanguageProfile::english(),
            noise_pattern: DEFAULT_NOISE_PATTERN.to_string(),
            page_marker_prefix: "P".to_string(),
            extract: ExtractOptions::default(),
            error_mode: ErrorMode::Strict,
            parallel: false,
            emit: EmitOptions::default(),
        }
    }
}

/// Paragraphs of one page of a single document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageParagraphs {
    pub page_index: usize,
    pub paragraphs: Vec<String>,
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    records: Vec<PageRecord>,
    table: AlignedTable,
}

impl Alignment {
    /// Build the table from page records.
    pub fn from_records(records: Vec<PageRecord>) -> Self {
        let table = AlignedTable::from_records(&records);
        Self { records, table }
    }

    /// Page records in page order.
    pub fn records(&self) -> &[PageRecord] {
        &self.records
    }

    /// The flattened two-column table.
    pub fn table(&self) -> &AlignedTable {
        &self.table
    }

    /// Number of logical pages aligned.
    pub fn page_count(&self) -> usize {
        self.records.len()
    }

    /// Render the table.
    pub fn render(&self, format: OutputFormat, options: &EmitOptions) -> Result<String> {
        render::render(&self.table, format, options)
    }

    pub fn into_records(self) -> Vec<PageRecord> {
        self.records
    }
}

/// A configured run of the whole pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: PipelineOptions,
    align: AlignOptions,
}

impl Pipeline {
    /// Validate options and compile the noise pattern.
    pub fn new(options: PipelineOptions) -> Result<Self> {
        options.validate()?;
        let noise = NoiseFilter::new(&options.noise_pattern)?;

        let stream = |profile: &LanguageProfile| {
            StreamConfig::new(
                ParagraphReconstructor::new(options.merge_threshold, profile.clone()),
                noise.clone(),
            )
        };
        let align = AlignOptions::new(
            stream(&options.source_profile),
            stream(&options.target_profile),
        )
        .with_marker_prefix(options.page_marker_prefix.clone())
        .with_error_mode(options.error_mode);

        Ok(Self { options, align })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Open a PDF file, splitting spreads if configured.
    pub fn open_file<P: AsRef<Path>>(&self, path: P) -> Result<PdfDocument> {
        let path = path.as_ref();
        if self.options.spread {
            let data = std::fs::read(path)?;
            self.open_bytes(&data)
        } else {
            PdfDocument::open_with_options(path, self.options.extract.clone())
        }
    }

    /// Open a PDF from bytes, splitting spreads if configured.
    pub fn open_bytes(&self, data: &[u8]) -> Result<PdfDocument> {
        if self.options.spread {
            let doc = load_bytes(data)?;
            self.open_document(doc)
        } else {
            PdfDocument::from_bytes_with_options(data, self.options.extract.clone())
        }
    }

    /// Wrap a loaded document, splitting spreads if configured.
    pub fn open_document(&self, doc: LopdfDocument) -> Result<PdfDocument> {
        let doc = if self.options.spread {
            SpreadSplitter::new().split_document(&doc)?
        } else {
            doc
        };
        PdfDocument::from_document(doc, self.options.extract.clone())
    }

    /// A page-by-page aligner over two sources, for callers that report
    /// progress or need the records emitted before a failure.
    pub fn aligner<S, T>(&self, source: S, target: T) -> PageAligner<S, T>
    where
        S: FragmentSource,
        T: FragmentSource,
    {
        PageAligner::new(source, target, self.align.clone())
    }

    /// Align two sources completely.
    pub fn run<S, T>(&self, source: S, target: T) -> Result<Alignment>
    where
        S: FragmentSource + Sync,
        T: FragmentSource + Sync,
    {
        let mut aligner = self.aligner(source, target);
        self.drain(&mut aligner)?;
        Ok(Alignment::from_records(aligner.into_records()))
    }

    /// Open and align two PDF files.
    pub fn run_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        target: Q,
    ) -> Result<Alignment> {
        let source = self.open_file(source)?;
        let target = self.open_file(target)?;
        self.run(&source, &target)
    }

    /// Open and align two PDFs held in memory.
    pub fn run_bytes(&self, source: &[u8], target: &[u8]) -> Result<Alignment> {
        let source = self.open_bytes(source)?;
        let target = self.open_bytes(target)?;
        self.run(&source, &target)
    }

    /// Reconstructed, noise-filtered paragraphs of one document, per page.
    pub fn paragraphs<S: FragmentSource>(
        &self,
        doc: &S,
        side: Side,
    ) -> Result<Vec<PageParagraphs>> {
        let stream = match side {
            Side::Source => &self.align.source,
            Side::Target => &self.align.target,
        };

        (0..doc.page_count())
            .map(|page_index| {
                let fragments = doc
                    .fragments(page_index)
                    .map_err(|e| extraction_error(side, page_index, e))?;
                Ok(PageParagraphs {
                    page_index,
                    paragraphs: stream.paragraphs(&fragments),
                })
            })
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn drain<S, T>(&self, aligner: &mut PageAligner<S, T>) -> Result<()>
    where
        S: FragmentSource + Sync,
        T: FragmentSource + Sync,
    {
        if self.options.parallel {
            aligner.drain_parallel()
        } else {
            aligner.drain()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn drain<S, T>(&self, aligner: &mut PageAligner<S, T>) -> Result<()>
    where
        S: FragmentSource,
        T: FragmentSource,
    {
        if self.options.parallel {
            log::warn!("built without the parallel feature, processing pages sequentially");
        }
        aligner.drain()
    }
}

/// Stage label for an error surfaced by a run, falling back to the stage
/// implied by where it was raised.
pub fn failing_stage(err: &Error) -> Stage {
    err.stage().unwrap_or(match err {
        Error::Pattern(_) | Error::Config(_) => Stage::Alignment,
        _ => Stage::Extraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MemorySource;
    use crate::model::RawFragment;

    fn sources() -> (MemorySource, MemorySource) {
        let source = MemorySource::new(vec![
            vec![
                RawFragment::at("第一段落", 0.0, 10.0),
                RawFragment::at("の続き。", 10.0, 20.0),
                RawFragment::at("12", 30.0, 35.0),
            ],
            vec![RawFragment::at("次のページ。", 0.0, 10.0)],
        ]);
        let target = MemorySource::new(vec![
            vec![
                RawFragment::at("The first paragraph", 0.0, 10.0),
                RawFragment::at(" continues.", 10.0, 20.0),
            ],
            vec![RawFragment::at("Next page.", 0.0, 10.0)],
        ]);
        (source, target)
    }

    #[test]
    fn test_defaults() {
        let options = PipelineOptions::default();
        assert!(options.spread);
        assert_eq!(options.merge_threshold, 3.0);
        assert_eq!(options.page_marker_prefix, "P");
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert_eq!(options.source_profile, LanguageProfile::japanese());
        assert_eq!(options.target_profile, LanguageProfile::english());
    }

    #[test]
    fn test_options_from_json() {
        let options = PipelineOptions::from_json(
            r#"{"spread": false, "merge_threshold": 5.0, "error_mode": "lenient",
                "extract": {"order": "native"}}"#,
        )
        .unwrap();
        assert!(!options.spread);
        assert_eq!(options.merge_threshold, 5.0);
        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert_eq!(options.extract.order, ExtractOrder::Native);
        assert_eq!(options.noise_pattern, DEFAULT_NOISE_PATTERN);
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            PipelineOptions::from_json("{not json"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Pipeline::new(PipelineOptions::new().with_noise_pattern("(")),
            Err(Error::Pattern(_))
        ));
        assert!(matches!(
            Pipeline::new(PipelineOptions::new().with_merge_threshold(f32::NAN)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_run_memory_sources() {
        let (source, target) = sources();
        let pipeline = Pipeline::new(PipelineOptions::new().with_merge_threshold(5.0)).unwrap();
        let alignment = pipeline.run(&source, &target).unwrap();

        assert_eq!(alignment.page_count(), 2);
        assert_eq!(
            alignment.records()[0].source_paragraphs,
            vec!["P0", "第一段落の続き。"]
        );
        assert_eq!(
            alignment.records()[0].target_paragraphs,
            vec!["P0", "The first paragraphcontinues."]
        );
        assert_eq!(alignment.table().len(), 4);
    }

    #[test]
    fn test_run_is_idempotent() {
        let (source, target) = sources();
        let pipeline = Pipeline::new(PipelineOptions::new()).unwrap();
        let first = pipeline.run(&source, &target).unwrap();
        let second = pipeline.run(&source, &target).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_paragraphs_single_document() {
        let (source, _) = sources();
        let pipeline = Pipeline::new(PipelineOptions::new().with_merge_threshold(5.0)).unwrap();
        let pages = pipeline.paragraphs(&source, Side::Source).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].paragraphs, vec!["第一段落の続き。"]);
        assert_eq!(pages[1].page_index, 1);
    }

    #[test]
    fn test_failing_stage() {
        let err = Error::PageCountMismatch {
            source_pages: 1,
            target_pages: 2,
            page: None,
        };
        assert_eq!(failing_stage(&err), Stage::Alignment);
        assert_eq!(failing_stage(&Error::UnknownFormat), Stage::Extraction);
    }
}
