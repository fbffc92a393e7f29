//! PDF backend
//!
//! Lays a [`Document`] out on US-letter pages with the builtin PDF fonts.
//! Layout is a single top-down cursor; an element that does not fit on the
//! current page starts a new one. Widths are estimated from average glyph
//! widths, which is good enough for wrapping log text.

use std::fs;
use std::path::{Path, PathBuf};

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point, Polygon, Pt, Rgb as PdfRgb,
};
use thiserror::Error;
use tracing::debug;

use crate::document::{palette, Document, Element, Rgb, Table, TableStyle};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN_SIDE: f32 = 54.0;
const MARGIN_TOP: f32 = 54.0;
const MARGIN_BOTTOM: f32 = 36.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_SIDE;

const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.0;
const NOTE_SIZE: f32 = 8.0;
const CODE_SIZE: f32 = 7.0;
const CELL_PADDING: f32 = 4.0;

const NOTE_COLOR: Rgb = Rgb::hex(0x7f8c8d);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF encoding failed: {0}")]
    Pdf(String),
}

/// Render `document` to a PDF file at `path`, creating parent directories
pub fn write_pdf(document: &Document, path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| RenderError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let bytes = render_pdf(document)?;
    fs::write(path, bytes).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Wrote PDF {}", path.display());
    Ok(())
}

/// Render `document` to PDF bytes
pub fn render_pdf(document: &Document) -> Result<Vec<u8>, RenderError> {
    let (doc, page, layer) = PdfDocument::new(
        sanitize(&document.title),
        mm(PAGE_WIDTH),
        mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let fonts = Fonts {
        regular: builtin(&doc, BuiltinFont::Helvetica)?,
        bold: builtin(&doc, BuiltinFont::HelveticaBold)?,
        italic: builtin(&doc, BuiltinFont::HelveticaOblique)?,
        mono: builtin(&doc, BuiltinFont::Courier)?,
    };

    let layer = doc.get_page(page).get_layer(layer);
    let mut writer = PageWriter {
        doc: &doc,
        fonts,
        layer,
        y: PAGE_HEIGHT - MARGIN_TOP,
        pages: 1,
    };

    for element in &document.elements {
        writer.element(element);
    }
    debug!("Laid out {} page(s)", writer.pages);

    doc.save_to_bytes()
        .map_err(|e| RenderError::Pdf(format!("{:?}", e)))
}

fn builtin(doc: &PdfDocumentReference, font: BuiltinFont) -> Result<IndirectFontRef, RenderError> {
    doc.add_builtin_font(font)
        .map_err(|e| RenderError::Pdf(format!("{:?}", e)))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    mono: IndirectFontRef,
}

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
    Italic,
    Mono,
}

impl Face {
    /// Average glyph width as a fraction of the font size
    fn width_factor(self) -> f32 {
        match self {
            Face::Regular | Face::Italic => 0.52,
            Face::Bold => 0.56,
            Face::Mono => 0.6,
        }
    }
}

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    fonts: Fonts,
    layer: PdfLayerReference,
    /// Top of the free area, in points from the page bottom
    y: f32,
    pages: usize,
}

impl PageWriter<'_> {
    fn element(&mut self, element: &Element) {
        match element {
            Element::Title(lines) => self.title(lines),
            Element::Heading(text) => self.heading(text),
            Element::Table(table) => self.table(table),
            Element::Banner { text, fill } => self.banner(text, *fill),
            Element::Paragraph(text) => {
                self.wrapped(text, Face::Regular, BODY_SIZE, palette::BODY, MARGIN_SIDE, CONTENT_WIDTH)
            }
            Element::Bullet(text) => self.bullet(text),
            Element::Note(text) => {
                self.wrapped(text, Face::Italic, NOTE_SIZE, NOTE_COLOR, MARGIN_SIDE, CONTENT_WIDTH)
            }
            Element::Code(text) => {
                self.wrapped(text, Face::Mono, CODE_SIZE, palette::CODE, MARGIN_SIDE, CONTENT_WIDTH)
            }
            Element::Spacer(height) => self.y = (self.y - height).max(MARGIN_BOTTOM),
        }
    }

    fn title(&mut self, lines: &[String]) {
        for (index, line) in lines.iter().enumerate() {
            let (face, size) = if index == 0 {
                (Face::Bold, 20.0)
            } else {
                (Face::Regular, 14.0)
            };
            let line_height = size * 1.3;
            self.ensure_space(line_height);

            let text = sanitize(line);
            let width = text_width(&text, face, size);
            let x = MARGIN_SIDE + ((CONTENT_WIDTH - width) / 2.0).max(0.0);
            self.text(&text, face, size, palette::TITLE, x, self.y - size);
            self.y -= line_height;
        }
    }

    fn heading(&mut self, text: &str) {
        let size = 13.0;
        // Room for the heading and the first lines of its section
        self.ensure_space(size * 2.0 + 40.0);
        self.y -= 8.0;
        self.text(&sanitize(text), Face::Bold, size, palette::HEADING, MARGIN_SIDE, self.y - size);
        self.y -= size + 6.0;
    }

    fn banner(&mut self, text: &str, fill: Rgb) {
        let height = 22.0;
        let size = 11.0;
        self.ensure_space(height);

        self.fill_rect(MARGIN_SIDE, self.y, CONTENT_WIDTH, height, fill);
        let text = sanitize(text);
        let width = text_width(&text, Face::Bold, size);
        let x = MARGIN_SIDE + ((CONTENT_WIDTH - width) / 2.0).max(0.0);
        self.text(&text, Face::Bold, size, Rgb::WHITE, x, self.y - height / 2.0 - size * 0.35);
        self.y -= height;
    }

    fn bullet(&mut self, text: &str) {
        let indent = 12.0;
        let line_height = BODY_SIZE * 1.3;
        self.ensure_space(line_height);
        self.text("-", Face::Regular, BODY_SIZE, palette::BODY, MARGIN_SIDE + 2.0, self.y - BODY_SIZE);
        self.wrapped(
            text,
            Face::Regular,
            BODY_SIZE,
            palette::BODY,
            MARGIN_SIDE + indent,
            CONTENT_WIDTH - indent,
        );
    }

    fn wrapped(&mut self, text: &str, face: Face, size: f32, color: Rgb, x: f32, width: f32) {
        let line_height = size * 1.3;
        for line in wrap(&sanitize(text), face, size, width) {
            self.ensure_space(line_height);
            self.text(&line, face, size, color, x, self.y - size);
            self.y -= line_height;
        }
    }

    fn table(&mut self, table: &Table) {
        let line_height = TABLE_SIZE * 1.25;

        for (row_index, row) in table.rows.iter().enumerate() {
            let cells: Vec<(Vec<String>, Face, Option<Rgb>, Rgb)> = row
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    let (face, fill, color) = cell_style(table.style, row_index, col);
                    let width = table.widths.get(col).copied().unwrap_or(CONTENT_WIDTH);
                    let lines = wrap(&sanitize(cell), face, TABLE_SIZE, width - 2.0 * CELL_PADDING);
                    (lines, face, fill, color)
                })
                .collect();

            let max_lines = cells.iter().map(|c| c.0.len()).max().unwrap_or(1).max(1);
            let height = max_lines as f32 * line_height + 2.0 * CELL_PADDING;
            self.ensure_space(height);

            let mut x = MARGIN_SIDE;
            for (col, (lines, face, fill, color)) in cells.iter().enumerate() {
                let width = table.widths.get(col).copied().unwrap_or(CONTENT_WIDTH);
                if let Some(fill) = fill {
                    self.fill_rect(x, self.y, width, height, *fill);
                }
                self.stroke_rect(x, self.y, width, height, palette::GRID);

                let mut baseline = self.y - CELL_PADDING - TABLE_SIZE;
                for line in lines {
                    self.text(line, *face, TABLE_SIZE, *color, x + CELL_PADDING, baseline);
                    baseline -= line_height;
                }
                x += width;
            }

            self.y -= height;
        }
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height >= MARGIN_BOTTOM {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            mm(PAGE_WIDTH),
            mm(PAGE_HEIGHT),
            format!("Page {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN_TOP;
    }

    fn text(&self, text: &str, face: Face, size: f32, color: Rgb, x: f32, baseline: f32) {
        if text.is_empty() {
            return;
        }
        let font = match face {
            Face::Regular => &self.fonts.regular,
            Face::Bold => &self.fonts.bold,
            Face::Italic => &self.fonts.italic,
            Face::Mono => &self.fonts.mono,
        };
        self.layer.set_fill_color(pdf_color(color));
        self.layer.use_text(text, size, mm(x), mm(baseline), font);
    }

    fn fill_rect(&self, x: f32, top: f32, width: f32, height: f32, color: Rgb) {
        self.layer.set_fill_color(pdf_color(color));
        self.layer.add_polygon(rect(x, top, width, height, PaintMode::Fill));
    }

    fn stroke_rect(&self, x: f32, top: f32, width: f32, height: f32, color: Rgb) {
        self.layer.set_outline_color(pdf_color(color));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_polygon(rect(x, top, width, height, PaintMode::Stroke));
    }
}

/// Font, fill and text colour for one table cell
fn cell_style(style: TableStyle, row: usize, col: usize) -> (Face, Option<Rgb>, Rgb) {
    match style {
        TableStyle::KeyValue if col == 0 => (Face::Bold, Some(palette::LABEL_FILL), Rgb::WHITE),
        TableStyle::Pairs if col % 2 == 0 => (Face::Bold, Some(palette::TIMING_FILL), Rgb::WHITE),
        TableStyle::Header if row == 0 => (Face::Bold, Some(palette::HEADER_FILL), Rgb::WHITE),
        TableStyle::Header if row % 2 == 0 => (Face::Regular, Some(palette::STRIPE_FILL), palette::BODY),
        _ => (Face::Regular, None, palette::BODY),
    }
}

fn rect(x: f32, top: f32, width: f32, height: f32, mode: PaintMode) -> Polygon {
    let bottom = top - height;
    let corners = [(x, top), (x + width, top), (x + width, bottom), (x, bottom)];
    Polygon {
        rings: vec![corners
            .iter()
            .map(|&(px, py)| (Point::new(mm(px), mm(py)), false))
            .collect()],
        mode,
        winding_order: WindingOrder::NonZero,
    }
}

fn mm(points: f32) -> Mm {
    Mm::from(Pt(points))
}

fn pdf_color(color: Rgb) -> Color {
    Color::Rgb(PdfRgb::new(
        f32::from(color.r) / 255.0,
        f32::from(color.g) / 255.0,
        f32::from(color.b) / 255.0,
        None,
    ))
}

fn text_width(text: &str, face: Face, size: f32) -> f32 {
    text.chars().count() as f32 * size * face.width_factor()
}

/// Builtin fonts only cover Latin-1; keep printable ASCII and expand tabs
fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push_str("    "),
            ' '..='~' => out.push(c),
            c if c.is_control() => {}
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &str, face: Face, size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (size * face.width_factor())).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(' ') {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() {
            word.len()
        } else {
            current.chars().count() + 1 + word.len()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a\tb"), "a    b");
        assert_eq!(sanitize("caf\u{e9} \u{1f512}"), "caf? ?");
        assert_eq!(sanitize("bell\u{7}"), "bell");
    }

    #[test]
    fn test_wrap_short_text() {
        assert_eq!(wrap("hello world", Face::Mono, 10.0, 500.0), vec!["hello world"]);
        assert_eq!(wrap("", Face::Mono, 10.0, 500.0), vec![""]);
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        // 6pt per glyph at size 10 => 5 chars in 31pt
        assert_eq!(wrap("ab cd ef", Face::Mono, 10.0, 31.0), vec!["ab cd", "ef"]);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        assert_eq!(
            wrap("abcdefghijkl", Face::Mono, 10.0, 31.0),
            vec!["abcde", "fghij", "kl"]
        );
    }

    #[test]
    fn test_cell_styles() {
        assert!(cell_style(TableStyle::KeyValue, 0, 0).1.is_some());
        assert!(cell_style(TableStyle::KeyValue, 0, 1).1.is_none());
        assert_eq!(cell_style(TableStyle::Header, 0, 1).1, Some(palette::HEADER_FILL));
        assert_eq!(cell_style(TableStyle::Header, 2, 0).1, Some(palette::STRIPE_FILL));
        assert!(cell_style(TableStyle::Header, 1, 0).1.is_none());
    }

    #[test]
    fn test_write_pdf_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/reports/out.pdf");

        let mut doc = Document::new("Test");
        doc.push(Element::Title(vec!["Monthly Security Report".into(), "web-01".into()]));
        doc.push(Element::Banner {
            text: "SUCCESS".into(),
            fill: palette::SUCCESS,
        });
        doc.push(Element::Table(Table {
            rows: vec![vec!["Total Updates".into(), "1".into()]],
            widths: vec![129.6, 302.4],
            style: TableStyle::KeyValue,
        }));
        write_pdf(&doc, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_document_spans_pages() {
        let mut doc = Document::new("Long");
        for i in 0..400 {
            doc.push(Element::Code(format!("line {}", i)));
        }
        let bytes = render_pdf(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
