//! PDF documents as fragment sources.

use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::detect::{sniff_version, sniff_version_from_path};
use crate::error::{Error, Result, Stage};
use crate::extract::content::{decode_text_simple, get_number, resolve, ContentInterpreter, PageBox};
use crate::extract::layout::build_fragments;
use crate::extract::{ExtractOptions, FragmentSource};
use crate::model::RawFragment;

/// Letter size, used when a page has no usable box.
const DEFAULT_PAGE_BOX: PageBox = PageBox {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Maximum `/Parent` hops when resolving inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 32;

/// A loaded PDF whose pages are read as fragments.
pub struct PdfDocument {
    doc: LopdfDocument,
    pages: Vec<ObjectId>,
    options: ExtractOptions,
}

impl PdfDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ExtractOptions::default())
    }

    /// Open a PDF file with custom extraction options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ExtractOptions) -> Result<Self> {
        let path = path.as_ref();
        sniff_version_from_path(path).map_err(|e| e.in_stage(Stage::Extraction))?;
        let doc = LopdfDocument::load(path)
            .map_err(|e| Error::from(e).in_stage(Stage::Extraction))?;
        Self::from_document(doc, options)
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ExtractOptions::default())
    }

    /// Load a PDF from bytes with custom extraction options.
    pub fn from_bytes_with_options(data: &[u8], options: ExtractOptions) -> Result<Self> {
        sniff_version(data).map_err(|e| e.in_stage(Stage::Extraction))?;
        let doc = LopdfDocument::load_mem(data)
            .map_err(|e| Error::from(e).in_stage(Stage::Extraction))?;
        Self::from_document(doc, options)
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: LopdfDocument, options: ExtractOptions) -> Result<Self> {
        if doc.is_encrypted() {
            log::warn!("document is encrypted; extracted text may be unreadable");
        }

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(Error::DocumentFormat {
                stage: Stage::Extraction,
                message: "document has no pages".to_string(),
            });
        }

        Ok(Self {
            doc,
            pages,
            options,
        })
    }

    /// Extraction options in use.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// PDF version from the header.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// `/Title` from the document info dictionary.
    pub fn title(&self) -> Option<String> {
        let info = self.doc.trailer.get(b"Info").ok()?;
        let info = resolve(&self.doc, info)?.as_dict().ok()?;
        match info.get(b"Title").ok()? {
            Object::String(bytes, _) => Some(decode_text_simple(bytes)),
            _ => None,
        }
    }

    /// Width and height of a page's visible area.
    pub fn page_size(&self, page_index: usize) -> Result<(f32, f32)> {
        let id = self.page_id(page_index)?;
        let page_box = page_box(&self.doc, id);
        Ok((page_box.width(), page_box.height()))
    }

    /// Underlying lopdf document.
    pub fn raw(&self) -> &LopdfDocument {
        &self.doc
    }

    fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        self.pages
            .get(page_index)
            .copied()
            .ok_or(Error::PageOutOfRange(page_index, self.pages.len()))
    }
}

impl FragmentSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn fragments(&self, page_index: usize) -> Result<Vec<RawFragment>> {
        let id = self.page_id(page_index)?;
        let content = page_content(&self.doc, id)?;
        let items = ContentInterpreter::new(&self.doc, page_box(&self.doc, id), &self.options)
            .run(&content, resources(&self.doc, id))?;
        let fragments = build_fragments(items, &self.options);

        log::debug!("page {}: {} fragments", page_index, fragments.len());
        Ok(fragments)
    }
}

/// Look up a page attribute, walking up the page tree for inherited ones.
pub(crate) fn inherited<'d>(
    doc: &'d LopdfDocument,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'d Object> {
    let mut id = page_id;
    for _ in 0..MAX_INHERIT_DEPTH {
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Visible box of a page: CropBox if present, else MediaBox.
pub(crate) fn page_box(doc: &LopdfDocument, page_id: ObjectId) -> PageBox {
    [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .into_iter()
        .find_map(|key| inherited(doc, page_id, key).and_then(|obj| rect(doc, obj)))
        .unwrap_or(DEFAULT_PAGE_BOX)
}

fn rect(doc: &LopdfDocument, obj: &Object) -> Option<PageBox> {
    let array = obj.as_array().ok()?;
    let n: Vec<f32> = array
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(get_number))
        .collect();
    match n.as_slice() {
        [x0, y0, x1, y1] => {
            let page_box = PageBox::new(*x0, *y0, *x1, *y1);
            (page_box.width() > 0.0 && page_box.height() > 0.0).then_some(page_box)
        }
        _ => None,
    }
}

/// Page resources dictionary, resolved and inherited.
pub(crate) fn resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    inherited(doc, page_id, b"Resources").and_then(|r| r.as_dict().ok())
}

/// Concatenated, decompressed content of a page. A page without
/// `/Contents` is blank.
fn page_content(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc.get_dictionary(page_id)?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };

    let stream_bytes = |obj: &Object| -> Result<Vec<u8>> {
        match resolve(doc, obj) {
            Some(Object::Stream(s)) => Ok(s
                .decompressed_content()
                .unwrap_or_else(|_| s.content.clone())),
            _ => Err(Error::PdfParse("invalid content stream".to_string())),
        }
    };

    match resolve(doc, contents) {
        Some(Object::Array(parts)) => {
            let mut content = Vec::new();
            for part in parts {
                content.extend_from_slice(&stream_bytes(part)?);
                content.push(b'\n');
            }
            Ok(content)
        }
        Some(_) => stream_bytes(contents),
        None => Err(Error::PdfParse("dangling /Contents reference".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn build(content: &str, media_box: [i64; 4]) -> LopdfDocument {
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        };
        build_with_font(content, media_box, font)
    }

    fn build_with_font(content: &str, media_box: [i64; 4], font: Dictionary) -> LopdfDocument {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(font);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
                "Resources" => resources_id,
                "MediaBox" => media_box
                    .iter()
                    .map(|&v| Object::Integer(v))
                    .collect::<Vec<Object>>(),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_inherited_attributes() {
        let doc = build("", [0, 0, 300, 400]);
        let page = *doc.get_pages().values().next().unwrap();
        assert_eq!(page_box(&doc, page), PageBox::new(0.0, 0.0, 300.0, 400.0));
        assert!(resources(&doc, page).is_some());
    }

    #[test]
    fn test_fragments_from_page() {
        let doc = build(
            "BT /F1 12 Tf 72 700 Td (Hello PDF.) Tj ET",
            [0, 0, 612, 792],
        );
        let pdf = PdfDocument::from_document(doc, ExtractOptions::default()).unwrap();
        assert_eq!(pdf.page_count(), 1);

        let fragments = pdf.fragments(0).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "Hello PDF.");
        // baseline 700 up from the bottom is 92 down from the top
        assert!(fragments[0].bbox.y0 < 92.0 && fragments[0].bbox.y1 > 92.0);
        assert!((fragments[0].bbox.x0 - 72.0).abs() < 0.01);
    }

    #[test]
    fn test_off_page_text_is_dropped() {
        let doc = build(
            "BT /F1 12 Tf 50 50 Td (inside) Tj 300 0 Td (outside) Tj ET",
            [0, 0, 200, 100],
        );
        let pdf = PdfDocument::from_document(doc, ExtractOptions::default()).unwrap();
        let texts: Vec<String> = pdf.fragments(0).unwrap().into_iter().map(|f| f.text).collect();
        assert_eq!(texts, vec!["inside"]);
    }

    #[test]
    fn test_huge_kerning_is_clamped_to_page() {
        let doc = build(
            "BT /F1 10 Tf 20 50 Td [(a) -1000000000000 (b)] TJ ET",
            [0, 0, 200, 100],
        );
        let pdf = PdfDocument::from_document(doc, ExtractOptions::default()).unwrap();

        let fragments = pdf.fragments(0).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].text.starts_with('a'));
        assert!(fragments[0].bbox.x1 <= 200.0 + 0.01);
    }

    #[test]
    fn test_font_without_type_entry() {
        let font = dictionary! {
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        };
        let content = "BT /F1 12 Tf 72 700 Td (Untyped) Tj ET";
        let doc = build_with_font(content, [0, 0, 612, 792], font);
        let pdf = PdfDocument::from_document(doc, ExtractOptions::default()).unwrap();

        let fragments = pdf.fragments(0).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "Untyped");
    }

    #[test]
    fn test_page_out_of_range() {
        let pdf = PdfDocument::from_document(build("", [0, 0, 10, 10]), ExtractOptions::default())
            .unwrap();
        assert!(matches!(pdf.fragments(3), Err(Error::PageOutOfRange(3, 1))));
        assert_eq!(pdf.page_size(0).unwrap(), (10.0, 10.0));
    }

    #[test]
    fn test_not_a_pdf() {
        let result = PdfDocument::from_bytes(b"plain text, not a document");
        assert!(matches!(
            result,
            Err(Error::DocumentFormat {
                stage: Stage::Extraction,
                ..
            })
        ));
    }
}
