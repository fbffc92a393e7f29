//! Report document model
//!
//! A flat, ordered list of layout elements. The renderer decides *what* goes
//! into the report; backends (see [`crate::pdf`]) decide how it looks on a
//! page. Widths are in PDF points.

use std::fmt::Write as _;

/// RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// From `0xRRGGBB`
    pub const fn hex(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: (value & 0xff) as u8,
        }
    }

    pub const WHITE: Rgb = Rgb::hex(0xffffff);
}

/// Report palette
pub mod palette {
    use super::Rgb;

    pub const SUCCESS: Rgb = Rgb::hex(0x27ae60);
    pub const FAILURE: Rgb = Rgb::hex(0xc0392b);
    pub const WARNING: Rgb = Rgb::hex(0xe67e22);
    pub const TITLE: Rgb = Rgb::hex(0x1a1a1a);
    pub const HEADING: Rgb = Rgb::hex(0x2c3e50);
    pub const BODY: Rgb = Rgb::hex(0x333333);
    pub const CODE: Rgb = Rgb::hex(0x222222);
    pub const LABEL_FILL: Rgb = Rgb::hex(0x2c3e50);
    pub const TIMING_FILL: Rgb = Rgb::hex(0x34495e);
    pub const HEADER_FILL: Rgb = Rgb::hex(0x3498db);
    pub const STRIPE_FILL: Rgb = Rgb::hex(0xf0f3f4);
    pub const GRID: Rgb = Rgb::hex(0xbdc3c7);
}

/// How a table paints its cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStyle {
    /// First column is a dark label column
    KeyValue,
    /// Label/value pairs on one row; even columns are labels
    Pairs,
    /// First row is a header; body rows are striped
    Header,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    pub widths: Vec<f32>,
    pub style: TableStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Centred title block, one entry per line
    Title(Vec<String>),
    Heading(String),
    Table(Table),
    /// Full-width coloured status bar
    Banner { text: String, fill: Rgb },
    Paragraph(String),
    Bullet(String),
    /// Small italic remark
    Note(String),
    /// One monospaced line
    Code(String),
    /// Vertical gap in points
    Spacer(f32),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Document metadata title
    pub title: String,
    pub elements: Vec<Element>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Headings in document order
    pub fn headings(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::Heading(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Plain-text rendering, for logs and tests
    pub fn plain_text(&self) -> String {
        let mut out = String::new();

        for element in &self.elements {
            match element {
                Element::Title(lines) => {
                    for line in lines {
                        let _ = writeln!(out, "{}", line);
                    }
                }
                Element::Heading(text) => {
                    let _ = writeln!(out, "\n## {}", text);
                }
                Element::Table(table) => write_table(&mut out, table),
                Element::Banner { text, .. } => {
                    let _ = writeln!(out, "[{}]", text);
                }
                Element::Paragraph(text) | Element::Note(text) | Element::Code(text) => {
                    let _ = writeln!(out, "{}", text);
                }
                Element::Bullet(text) => {
                    let _ = writeln!(out, "- {}", text);
                }
                Element::Spacer(_) => {}
            }
        }

        out
    }
}

fn write_table(out: &mut String, table: &Table) {
    for row in &table.rows {
        let line = match table.style {
            TableStyle::KeyValue | TableStyle::Pairs => row
                .chunks(2)
                .map(|pair| pair.join(": "))
                .collect::<Vec<_>>()
                .join(" | "),
            TableStyle::Header => row.join(" | "),
        };
        let _ = writeln!(out, "{}", line);
    }
}
