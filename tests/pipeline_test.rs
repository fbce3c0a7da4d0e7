//! Integration tests for the end-to-end pipeline over generated PDFs.

use lopdf::{dictionary, Document, Object, Stream};
use taiyaku::{
    align_bytes_with_options, convert_files, split_spreads, Error, ErrorMode, FragmentSource,
    LanguageProfile, OutputFormat, PdfDocument, Pipeline, PipelineOptions, Side, Stage,
};

/// Build a PDF whose pages share one Helvetica font and a media box.
fn build_pdf<S: AsRef<str>>(pages: &[S], width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let kids: Vec<Object> = pages
        .iter()
        .map(|content| {
            let bytes = content.as_ref().as_bytes().to_vec();
            let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "Resources" => resources_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), width.into(), height.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A letter page with two separated prose blocks and a page number.
fn letter_page(first: &str, second: &str) -> String {
    format!(
        "BT /F1 12 Tf 72 700 Td ({}) Tj ET \
         BT /F1 12 Tf 72 500 Td ({}) Tj ET \
         BT /F1 10 Tf 72 40 Td (12) Tj ET",
        first, second
    )
}

fn flat(options: PipelineOptions) -> PipelineOptions {
    options
        .with_spread(false)
        .with_source_profile(LanguageProfile::english())
        .with_target_profile(LanguageProfile::english())
}

#[test]
fn test_align_single_page_drops_page_number() {
    let source = build_pdf(&[letter_page("First one.", "Second one.")], 612, 792);
    let target = build_pdf(&[letter_page("Erster Satz.", "Zweiter Satz.")], 612, 792);

    let alignment =
        align_bytes_with_options(&source, &target, flat(PipelineOptions::new())).unwrap();

    assert_eq!(alignment.page_count(), 1);
    let record = &alignment.records()[0];
    assert_eq!(record.source_paragraphs, vec!["P0", "First one.", "Second one."]);
    assert_eq!(record.target_paragraphs, vec!["P0", "Erster Satz.", "Zweiter Satz."]);
}

#[test]
fn test_threshold_controls_cross_block_merge() {
    // Font size change splits the block; the vertical gap between the two
    // fragments is about 3.6 units.
    let content = "BT /F1 12 Tf 72 700 Td (The paragraph) Tj ET \
                   BT /F1 10 Tf 72 686 Td (continues here.) Tj ET";
    let pdf = build_pdf(&[content], 612, 792);

    let tight = align_bytes_with_options(&pdf, &pdf, flat(PipelineOptions::new())).unwrap();
    assert_eq!(
        tight.records()[0].target_paragraphs,
        vec!["P0", "The paragraph", "continues here."]
    );

    let loose = align_bytes_with_options(
        &pdf,
        &pdf,
        flat(PipelineOptions::new().with_merge_threshold(5.0)),
    )
    .unwrap();
    assert_eq!(
        loose.records()[0].target_paragraphs,
        vec!["P0", "The paragraphcontinues here."]
    );
}

#[test]
fn test_spread_split_doubles_pages() {
    let spread = "BT /F1 10 Tf 20 50 Td (Left page.) Tj ET \
                  BT /F1 10 Tf 120 50 Td (Right page.) Tj ET";
    let source = build_pdf(&[spread], 200, 100);
    let target = build_pdf(&[spread], 200, 100);

    let options = PipelineOptions::new()
        .with_source_profile(LanguageProfile::english())
        .with_target_profile(LanguageProfile::english());
    let alignment = align_bytes_with_options(&source, &target, options).unwrap();

    assert_eq!(alignment.page_count(), 2);
    assert_eq!(alignment.records()[0].source_paragraphs, vec!["P0", "Left page."]);
    assert_eq!(alignment.records()[1].source_paragraphs, vec!["P1", "Right page."]);
    assert_eq!(alignment.table().len(), 4);
}

#[test]
fn test_empty_page_yields_marker_only() {
    let source = build_pdf(&[String::new(), letter_page("Text.", "More.")], 612, 792);
    let target = build_pdf(&[String::new(), letter_page("Text.", "More.")], 612, 792);

    let alignment =
        align_bytes_with_options(&source, &target, flat(PipelineOptions::new())).unwrap();
    assert_eq!(alignment.records()[0].source_paragraphs, vec!["P0"]);
    assert_eq!(alignment.records()[1].source_paragraphs.len(), 3);
}

#[test]
fn test_strict_mismatch_fails_before_emitting() {
    let source = build_pdf(&[letter_page("A.", "B."), letter_page("C.", "D.")], 612, 792);
    let target = build_pdf(&[letter_page("A.", "B.")], 612, 792);

    let err = align_bytes_with_options(&source, &target, flat(PipelineOptions::new())).unwrap_err();
    assert!(matches!(
        err,
        Error::PageCountMismatch {
            source_pages: 2,
            target_pages: 1,
            page: None,
        }
    ));
    assert_eq!(err.stage(), Some(Stage::Alignment));
}

#[test]
fn test_lenient_mismatch_keeps_prior_records() {
    let source = build_pdf(&[letter_page("A.", "B."), letter_page("C.", "D.")], 612, 792);
    let target = build_pdf(&[letter_page("A.", "B.")], 612, 792);

    let pipeline = Pipeline::new(flat(PipelineOptions::new().lenient())).unwrap();
    let source = pipeline.open_bytes(&source).unwrap();
    let target = pipeline.open_bytes(&target).unwrap();

    let mut aligner = pipeline.aligner(&source, &target);
    let first = aligner.next().unwrap().unwrap();
    assert_eq!(first.page_index, 0);

    let second = aligner.next().unwrap();
    let err = second.unwrap_err();
    assert!(matches!(err, Error::PageCountMismatch { .. }));
    assert_eq!(err.page(), Some(1));
    assert!(aligner.is_done());
    assert!(aligner.next().is_none());
    assert_eq!(aligner.completed().len(), 1);
}

#[test]
fn test_parallel_matches_sequential() {
    let pages: Vec<String> = (0..6)
        .map(|i| letter_page(&format!("Page {} start.", i), "Tail."))
        .collect();
    let refs: Vec<&str> = pages.iter().map(String::as_str).collect();
    let pdf = build_pdf(&refs, 612, 792);

    let sequential = align_bytes_with_options(&pdf, &pdf, flat(PipelineOptions::new())).unwrap();
    let parallel =
        align_bytes_with_options(&pdf, &pdf, flat(PipelineOptions::new().with_parallel(true)))
            .unwrap();
    assert_eq!(sequential, parallel);
    assert_eq!(parallel.records()[5].source_paragraphs[1], "Page 5 start.");
}

#[test]
fn test_run_is_idempotent() {
    let pdf = build_pdf(&[letter_page("Same.", "Again.")], 612, 792);
    let pipeline = Pipeline::new(flat(PipelineOptions::new())).unwrap();

    let first = pipeline.run_bytes(&pdf, &pdf).unwrap();
    let second = pipeline.run_bytes(&pdf, &pdf).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_paragraphs_of_one_document() {
    let pdf = build_pdf(&[letter_page("Alpha.", "Beta.")], 612, 792);
    let pipeline = Pipeline::new(flat(PipelineOptions::new())).unwrap();
    let doc = pipeline.open_bytes(&pdf).unwrap();

    let pages = pipeline.paragraphs(&doc, Side::Target).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].paragraphs, vec!["Alpha.", "Beta."]);
}

#[test]
fn test_error_mode_from_json_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");
    std::fs::write(
        &path,
        r#"{"spread": false, "error_mode": "lenient", "page_marker_prefix": "Page "}"#,
    )
    .unwrap();

    let options = PipelineOptions::from_json_file(&path).unwrap();
    assert_eq!(options.error_mode, ErrorMode::Lenient);

    let pdf = build_pdf(&[letter_page("One.", "Two.")], 612, 792);
    let alignment = align_bytes_with_options(&pdf, &pdf, options).unwrap();
    assert_eq!(alignment.records()[0].source_paragraphs[0], "Page 0");
}

// ==================== Output Tests ====================

fn write_inputs(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let source = dir.join("source.pdf");
    let target = dir.join("target.pdf");
    std::fs::write(&source, build_pdf(&[letter_page("Hello, world.", "Bye.")], 612, 792)).unwrap();
    std::fs::write(&target, build_pdf(&[letter_page("Hallo, Welt.", "Tschuss.")], 612, 792))
        .unwrap();
    (source, target)
}

#[test]
fn test_convert_files_csv() {
    let dir = tempfile::tempdir().unwrap();
    let (source, target) = write_inputs(dir.path());
    let output = dir.path().join("table.csv");

    convert_files(&source, &target, &output, flat(PipelineOptions::new())).unwrap();

    let csv = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "source,target");
    assert_eq!(lines[1], "P0,P0");
    assert_eq!(lines[2], "\"Hello, world.\",\"Hallo, Welt.\"");
    assert_eq!(lines[3], "Bye.,Tschuss.");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_convert_files_json() {
    let dir = tempfile::tempdir().unwrap();
    let (source, target) = write_inputs(dir.path());
    let output = dir.path().join("table.json");

    convert_files(&source, &target, &output, flat(PipelineOptions::new())).unwrap();

    let json = std::fs::read_to_string(&output).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["header"][1], "target");
    assert_eq!(value["rows"].as_array().unwrap().len(), 3);
    assert_eq!(value["rows"][1]["target"], "Hallo, Welt.");
    assert_eq!(value["font_size"], 14.0);
}

#[test]
fn test_convert_files_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let (source, target) = write_inputs(dir.path());
    let output = dir.path().join("table.md");

    convert_files(&source, &target, &output, flat(PipelineOptions::new())).unwrap();

    let md = std::fs::read_to_string(&output).unwrap();
    assert!(md.starts_with("| source | target |\n| --- | --- |\n"));
    assert!(md.contains("| Hello, world. | Hallo, Welt. |"));
}

#[test]
fn test_render_with_labels() {
    let pdf = build_pdf(&[letter_page("One.", "Two.")], 612, 792);
    let mut options = flat(PipelineOptions::new());
    options.emit = options.emit.with_labels("ja", "en");
    let emit = options.emit.clone();

    let alignment = align_bytes_with_options(&pdf, &pdf, options).unwrap();
    let csv = alignment.render(OutputFormat::Csv, &emit).unwrap();
    assert!(csv.starts_with("ja,en\n"));
}

// ==================== Split Tests ====================

#[test]
fn test_split_spreads_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("spread.pdf");
    let output = dir.path().join("split.pdf");
    std::fs::write(
        &input,
        build_pdf(
            &[
                "BT /F1 10 Tf 20 50 Td (a) Tj ET BT /F1 10 Tf 120 50 Td (b) Tj ET",
                "BT /F1 10 Tf 20 50 Td (c) Tj ET",
            ],
            200,
            100,
        ),
    )
    .unwrap();

    let pages = split_spreads(&input, &output).unwrap();
    assert_eq!(pages, 4);

    let doc = PdfDocument::open(&output).unwrap();
    assert_eq!(doc.page_count(), 4);
    assert_eq!(doc.page_size(3).unwrap(), (100.0, 100.0));
    assert!(doc.fragments(3).unwrap().is_empty());
    assert_eq!(doc.fragments(1).unwrap()[0].text, "b");
}

#[test]
fn test_invalid_source_reports_stage() {
    let target = build_pdf(&[letter_page("A.", "B.")], 612, 792);
    let err = align_bytes_with_options(b"not a pdf at all", &target, PipelineOptions::new())
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Splitting));
}
