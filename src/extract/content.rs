//! Content stream interpretation.
//!
//! Walks a page's content stream and records every text show operation as a
//! positioned [`TextSpan`] and every image XObject as an image box. Positions
//! go through the full text rendering matrix (text matrix times CTM), so
//! pages produced by cropping and translating existing content extract
//! correctly. Spans whose origin lies outside the visible page box are
//! dropped.

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use crate::error::{Error, Result};
use crate::model::BoundingBox;
use crate::script::{estimate_em_width, is_spaceless_script_char};

use super::options::ExtractOptions;

/// 2D affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6].iter().filter_map(get_number).collect();
        if n.len() < 6 {
            return None;
        }
        Some(Matrix::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Visible area of a page in PDF user space (bottom-up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Convert a user-space point to top-down page coordinates.
    pub fn to_page(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.x0, self.y1 - y)
    }

    /// Check if a user-space point lies on the page. The right edge is
    /// exclusive so that text starting exactly on a crop line belongs to the
    /// right-hand neighbour.
    fn contains(&self, x: f32, y: f32) -> bool {
        const TOLERANCE: f32 = 0.5;
        x >= self.x0 - TOLERANCE
            && x < self.x1
            && y >= self.y0 - TOLERANCE
            && y <= self.y1 + TOLERANCE
    }
}

/// A text span in top-down page coordinates.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// Left edge
    pub x: f32,
    /// Baseline, measured down from the top of the page
    pub baseline: f32,
    /// Estimated advance width
    pub width: f32,
    /// Effective font size in page units
    pub font_size: f32,
}

impl TextSpan {
    /// Top edge (approximate ascender).
    pub fn top(&self) -> f32 {
        self.baseline - self.font_size * 0.8
    }

    /// Bottom edge (approximate descender).
    pub fn bottom(&self) -> f32 {
        self.baseline + self.font_size * 0.2
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.top(), self.right(), self.bottom())
    }
}

/// Something drawn on the page, in drawing order.
#[derive(Debug, Clone)]
pub enum PageItem {
    Span(TextSpan),
    Image(BoundingBox),
}

/// Text state inside a `BT`/`ET` pair.
#[derive(Debug, Clone)]
struct TextState {
    tm: Matrix,
    tlm: Matrix,
    leading: f32,
    font_size: f32,
    font: Vec<u8>,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            leading: 0.0,
            font_size: 12.0,
            font: Vec::new(),
        }
    }
}

impl TextState {
    fn begin(&mut self) {
        self.tm = Matrix::IDENTITY;
        self.tlm = Matrix::IDENTITY;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).concat(&self.tlm);
        self.tm = self.tlm;
    }

    fn set_matrix(&mut self, m: Matrix) {
        self.tm = m;
        self.tlm = m;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.tm = Matrix::translation(tx, 0.0).concat(&self.tm);
    }
}

/// Interprets content streams for one page.
pub struct ContentInterpreter<'a> {
    doc: &'a LopdfDocument,
    page_box: PageBox,
    include_images: bool,
    max_depth: u8,
    items: Vec<PageItem>,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a LopdfDocument, page_box: PageBox, options: &ExtractOptions) -> Self {
        Self {
            doc,
            page_box,
            include_images: options.include_images,
            max_depth: options.max_form_depth,
            items: Vec::new(),
        }
    }

    /// Interpret a page's content and return what it draws, in order.
    pub fn run(
        mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
    ) -> Result<Vec<PageItem>> {
        self.interpret(content, resources, Matrix::IDENTITY, 0)?;
        Ok(self.items)
    }

    fn interpret(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        base_ctm: Matrix,
        depth: u8,
    ) -> Result<()> {
        let content =
            lopdf::content::Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut ctm = base_ctm;
        let mut saved: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => {
                    if let Some(m) = saved.pop() {
                        ctm = m;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        ctm = m.concat(&ctm);
                    }
                }
                "BT" => text.begin(),
                "Tf" => {
                    if operands.len() >= 2 {
                        if let Object::Name(name) = &operands[0] {
                            text.font = name.clone();
                        }
                        text.font_size = get_number(&operands[1]).unwrap_or(12.0);
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(get_number) {
                        text.leading = leading;
                    }
                }
                "Td" | "TD" => {
                    if operands.len() >= 2 {
                        let tx = get_number(&operands[0]).unwrap_or(0.0);
                        let ty = get_number(&operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            text.leading = -ty;
                        }
                        text.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        text.set_matrix(m);
                    }
                }
                "T*" => text.next_line(),
                "Tj" => {
                    if let Some(s @ Object::String(..)) = operands.first() {
                        self.show(&mut text, &ctm, resources, std::slice::from_ref(s));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(arr)) = operands.first() {
                        self.show(&mut text, &ctm, resources, arr);
                    }
                }
                "'" | "\"" => {
                    text.next_line();
                    let idx = if op.operator == "\"" { 2 } else { 0 };
                    if let Some(s @ Object::String(..)) = operands.get(idx) {
                        self.show(&mut text, &ctm, resources, std::slice::from_ref(s));
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name, resources, &ctm, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Show a run of strings and kerning adjustments (a `TJ` array, or a
    /// single string for `Tj`).
    fn show(
        &mut self,
        text: &mut TextState,
        ctm: &Matrix,
        resources: Option<&'a Dictionary>,
        pieces: &[Object],
    ) {
        // Adjustments beyond 200/1000 em usually stand for a word space
        const SPACE_THRESHOLD: f32 = 200.0;

        let trm = text.tm.concat(ctm);
        let mut combined = String::new();
        let mut advance = 0.0f32;

        for piece in pieces {
            match piece {
                Object::String(bytes, _) => {
                    let decoded = self.decode(resources, &text.font, bytes);
                    advance += estimate_em_width(&decoded) * text.font_size;
                    combined.push_str(&decoded);
                }
                other => {
                    if let Some(n) = get_number(other) {
                        let adjustment = -n;
                        advance += adjustment / 1000.0 * text.font_size;
                        if adjustment > SPACE_THRESHOLD
                            && !combined.is_empty()
                            && !combined.ends_with(' ')
                            && !combined.ends_with('\u{00A0}')
                            && !combined.chars().last().is_some_and(is_spaceless_script_char)
                        {
                            combined.push(' ');
                        }
                    }
                }
            }
        }

        text.advance(advance);

        if combined.trim().is_empty() {
            return;
        }

        let (ux, uy) = (trm.e, trm.f);
        if !self.page_box.contains(ux, uy) {
            log::trace!("dropping off-page span at ({:.1}, {:.1})", ux, uy);
            return;
        }

        let (x, baseline) = self.page_box.to_page(ux, uy);
        let font_size = (text.font_size * trm.vertical_scale()).abs().max(0.1);
        // Kerning or scaling can push the advance far past the page edge
        let width = (advance.abs() * trm.horizontal_scale()).min(self.page_box.width() - x);

        self.items.push(PageItem::Span(TextSpan {
            text: combined,
            x,
            baseline,
            width,
            font_size,
        }));
    }

    fn decode(&self, resources: Option<&'a Dictionary>, font_name: &[u8], bytes: &[u8]) -> String {
        let font = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| resolve_dict(self.doc, f))
            .and_then(|fonts| fonts.get(font_name).ok())
            .and_then(|f| resolve_dict(self.doc, f));

        font.and_then(|font| decode_with_font(self.doc, font, bytes))
            .unwrap_or_else(|| decode_text_simple(bytes))
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: &Matrix,
        depth: u8,
    ) -> Result<()> {
        let doc = self.doc;
        let stream = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve_dict(doc, x))
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_stream().ok());

        let Some(stream) = stream else {
            log::debug!("missing XObject /{}", String::from_utf8_lossy(name));
            return Ok(());
        };

        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name().ok())
            .unwrap_or(b"");

        match subtype {
            b"Image" => {
                if self.include_images {
                    if let Some(bbox) = self.image_box(ctm) {
                        self.items.push(PageItem::Image(bbox));
                    }
                }
            }
            b"Form" => {
                if depth >= self.max_depth {
                    log::warn!("form XObject nesting deeper than {}, skipped", self.max_depth);
                    return Ok(());
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| m.as_array().ok())
                    .and_then(|arr| Matrix::from_operands(arr))
                    .unwrap_or(Matrix::IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(doc, r))
                    .or(resources);
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                self.interpret(&content, form_resources, matrix.concat(ctm), depth + 1)?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Page-space box of the unit square under `ctm`, if it touches the page.
    fn image_box(&self, ctm: &Matrix) -> Option<BoundingBox> {
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(x, y)| {
            let (ux, uy) = ctm.apply(x, y);
            self.page_box.to_page(ux, uy)
        });
        let x0 = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let x1 = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let y0 = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let y1 = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

        let visible =
            x1 > 0.0 && x0 < self.page_box.width() && y1 > 0.0 && y0 < self.page_box.height();
        visible.then(|| {
            BoundingBox::new(
                x0.max(0.0),
                y0.max(0.0),
                x1.min(self.page_box.width()),
                y1.min(self.page_box.height()),
            )
        })
    }
}

/// Follow a reference, if `obj` is one.
pub(crate) fn resolve<'d>(doc: &'d LopdfDocument, obj: &'d Object) -> Option<&'d Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Follow a reference and expect a dictionary.
pub(crate) fn resolve_dict<'d>(doc: &'d LopdfDocument, obj: &'d Object) -> Option<&'d Dictionary> {
    resolve(doc, obj).and_then(|o| o.as_dict().ok())
}

/// Helper to extract number from PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Simple text decoding fallback when no encoding is available.
pub(crate) fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode `bytes` through the font's encoding.
///
/// Font dictionaries without `/Type` are common; lopdf expects one, so
/// those are tagged on a copy first. Other `/Type` values are not fonts.
fn decode_with_font(doc: &LopdfDocument, font: &Dictionary, bytes: &[u8]) -> Option<String> {
    if font.type_is(b"Font") {
        let encoding = font.get_font_encoding(doc).ok()?;
        return LopdfDocument::decode_text(&encoding, bytes).ok();
    }
    if font.has(b"Type") {
        return None;
    }
    let mut typed = font.clone();
    typed.set("Type", Object::Name(b"Font".to_vec()));
    let encoding = typed.get_font_encoding(doc).ok()?;
    LopdfDocument::decode_text(&encoding, bytes).ok()
}
