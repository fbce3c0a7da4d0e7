//! Splitting double-page spreads into single logical pages.
//!
//! Each physical page becomes two pages half as wide. The halves reuse the
//! original content streams and resources; a small prefix stream clips to the
//! half and shifts it to the new origin, and a suffix restores the graphics
//! state. Nothing is re-rendered or re-flowed.

use std::path::Path;

use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::detect::sniff_version;
use crate::error::{Error, Result, Stage};
use crate::extract::content::{get_number, resolve, PageBox};
use crate::pdf::{inherited, page_box};

/// Crops every page of a document into left and right halves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadSplitter;

/// Which half of a spread a logical page holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Left,
    Right,
}

impl SpreadSplitter {
    pub fn new() -> Self {
        Self
    }

    /// Split a loaded document, returning a new one with twice the pages.
    ///
    /// Output order is page 1 left, page 1 right, page 2 left, and so on.
    pub fn split_document(&self, doc: &LopdfDocument) -> Result<LopdfDocument> {
        let mut out = doc.clone();

        let physical: Vec<ObjectId> = out.get_pages().into_values().collect();
        if physical.is_empty() {
            return Err(format_error("document has no pages"));
        }

        let catalog_id = out
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| format_error(&format!("missing catalog: {}", e)))?;

        let pages_root = out.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(physical.len() * 2);

        for (number, page_id) in physical.into_iter().enumerate() {
            let page = PhysicalPage::read(&out, page_id)?;
            if page.rotate != 0 {
                log::warn!(
                    "page {} has /Rotate {}; splitting along the unrotated box",
                    number + 1,
                    page.rotate
                );
            }

            let resources_id = page.resources.clone().map(|r| out.add_object(r));
            for half in [Half::Left, Half::Right] {
                let id = add_half(&mut out, &page, half, pages_root, resources_id);
                kids.push(id.into());
            }
        }

        let count = kids.len() as i64;
        out.objects.insert(
            pages_root,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog = out
            .get_object_mut(catalog_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| format_error(&format!("invalid catalog: {}", e)))?;
        catalog.set("Pages", pages_root);
        // Both point at physical pages that no longer exist
        catalog.remove(b"Outlines");
        catalog.remove(b"PageLabels");

        out.prune_objects();
        log::debug!("split into {} logical pages", count);
        Ok(out)
    }

    /// Split a PDF held in memory and serialize the result.
    pub fn split_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let doc = load_bytes(data)?;
        let mut split = self.split_document(&doc)?;
        let mut buffer = Vec::new();
        split
            .save_to(&mut buffer)
            .map_err(|e| Error::from(e).in_stage(Stage::Splitting))?;
        Ok(buffer)
    }

    /// Split a PDF file into a new file. The output is written only once the
    /// whole split has succeeded. Returns the number of logical pages.
    pub fn split_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<usize> {
        let data = std::fs::read(input)?;
        let doc = load_bytes(&data)?;
        let mut split = self.split_document(&doc)?;
        let pages = split.get_pages().len();

        let mut buffer = Vec::new();
        split
            .save_to(&mut buffer)
            .map_err(|e| Error::from(e).in_stage(Stage::Splitting))?;
        std::fs::write(output, buffer)?;
        Ok(pages)
    }
}

/// What a split half needs from its physical page.
struct PhysicalPage {
    page_box: PageBox,
    rotate: i64,
    resources: Option<Dictionary>,
    contents: Vec<Object>,
}

impl PhysicalPage {
    fn read(doc: &LopdfDocument, page_id: ObjectId) -> Result<Self> {
        let dict = doc
            .get_dictionary(page_id)
            .map_err(|e| format_error(&format!("invalid page object: {}", e)))?;

        let rotate = inherited(doc, page_id, b"Rotate")
            .and_then(get_number)
            .map(|r| r as i64)
            .unwrap_or(0);

        let resources = inherited(doc, page_id, b"Resources")
            .and_then(|r| r.as_dict().ok())
            .cloned();

        let contents = match dict.get(b"Contents") {
            Err(_) => Vec::new(),
            Ok(obj) => match (obj, resolve(doc, obj)) {
                (_, Some(Object::Array(parts))) => parts.clone(),
                (Object::Reference(_), Some(Object::Stream(_))) => vec![obj.clone()],
                _ => return Err(format_error("page /Contents is not a stream")),
            },
        };

        Ok(Self {
            page_box: page_box(doc, page_id),
            rotate,
            resources,
            contents,
        })
    }
}

fn add_half(
    doc: &mut LopdfDocument,
    page: &PhysicalPage,
    half: Half,
    parent: ObjectId,
    resources: Option<ObjectId>,
) -> ObjectId {
    let width = page.page_box.width() / 2.0;
    let height = page.page_box.height();
    let offset = match half {
        Half::Left => 0.0,
        Half::Right => width,
    };
    let tx = -(page.page_box.x0 + offset);
    let ty = -page.page_box.y0;

    let prefix = format!("q 0 0 {} {} re W n 1 0 0 1 {} {} cm\n", width, height, tx, ty);
    let prefix_id = doc.add_object(Stream::new(dictionary! {}, prefix.into_bytes()));
    let suffix_id = doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));

    let mut contents: Vec<Object> = Vec::with_capacity(page.contents.len() + 2);
    contents.push(prefix_id.into());
    contents.extend(page.contents.iter().cloned());
    contents.push(suffix_id.into());

    let mut dict = dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width),
            Object::Real(height),
        ],
        "Contents" => contents,
    };
    if let Some(id) = resources {
        dict.set("Resources", id);
    }
    doc.add_object(dict)
}

pub(crate) fn load_bytes(data: &[u8]) -> Result<LopdfDocument> {
    sniff_version(data).map_err(|e| e.in_stage(Stage::Splitting))?;
    LopdfDocument::load_mem(data).map_err(|e| Error::from(e).in_stage(Stage::Splitting))
}

fn format_error(message: &str) -> Error {
    Error::DocumentFormat {
        stage: Stage::Splitting,
        message: message.to_string(),
    }
}
