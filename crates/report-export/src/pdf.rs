//! Paginated landscape PDF report
//!
//! Each table becomes a titled section drawn as a ruled grid. The header row
//! repeats on every page a section spans, body rows alternate shading and
//! cell text is truncated to the column width. Only the standard Helvetica
//! faces are used, so no font data is embedded.

use crate::error::ExportError;
use crate::{ExportOptions, NamedTable};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use permit_types::RecordTable;
use tracing::debug;

const PAGE_WIDTH: f32 = 792.0;
const PAGE_HEIGHT: f32 = 612.0;
const MARGIN: f32 = 36.0;

const TITLE_SIZE: f32 = 16.0;
const META_SIZE: f32 = 9.0;
const SECTION_SIZE: f32 = 11.0;
const BODY_SIZE: f32 = 8.0;
const ROW_HEIGHT: f32 = 14.0;
const CELL_PADDING: f32 = 3.0;

/// Average Helvetica advance in em, close enough for sizing columns
const AVG_CHAR_EM: f32 = 0.5;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Column weights are clamped so one long description cannot starve the rest
const MIN_WEIGHT: usize = 4;
const MAX_WEIGHT: usize = 40;

fn usable_width() -> f32 {
    PAGE_WIDTH - 2.0 * MARGIN
}

/// Encode as WinAnsi bytes; anything outside Latin-1 becomes '?'
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Cut `text` to at most `max_chars`, marking the cut with "..."
fn truncate(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut cut: String = text.chars().take(max_chars - 3).collect();
    cut.push_str("...");
    cut
}

/// Column widths proportional to the longest value in each column
fn column_widths(table: &RecordTable) -> Vec<f32> {
    let weights: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let longest = table
                .raw_rows()
                .iter()
                .map(|row| row[i].as_text().chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0);
            longest.clamp(MIN_WEIGHT, MAX_WEIGHT)
        })
        .collect();
    let total: usize = weights.iter().sum();
    if total == 0 {
        return Vec::new();
    }
    weights
        .iter()
        .map(|w| usable_width() * *w as f32 / total as f32)
        .collect()
}

fn fits(width: f32, size: f32) -> usize {
    (((width - 2.0 * CELL_PADDING) / (size * AVG_CHAR_EM)).floor()).max(1.0) as usize
}

/// Content stream for one page plus the cursor position
struct PageCanvas {
    operations: Vec<Operation>,
    y: f32,
}

impl PageCanvas {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn remaining(&self) -> f32 {
        self.y - MARGIN
    }

    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str) {
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
            Operation::new(
                "Tm",
                vec![1.0f32.into(), 0.0f32.into(), 0.0f32.into(), 1.0f32.into(), x.into(), y.into()],
            ),
            Operation::new("Tj", vec![Object::String(latin1(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Write a line of text at the cursor and move down by `advance`
    fn line(&mut self, font: &str, size: f32, text: &str, advance: f32) {
        let baseline = self.y - size;
        self.text(font, size, MARGIN, baseline, text);
        self.y -= advance;
    }

    fn fill_rect(&mut self, grey: f32, x: f32, y: f32, width: f32, height: f32) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("g", vec![grey.into()]),
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("G", vec![0.6f32.into()]),
            Operation::new("w", vec![0.25f32.into()]),
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// One grid row at the cursor
    fn row(&mut self, cells: &[String], widths: &[f32], font: &str, shade: Option<f32>) {
        let bottom = self.y - ROW_HEIGHT;
        if let Some(grey) = shade {
            self.fill_rect(grey, MARGIN, bottom, widths.iter().sum(), ROW_HEIGHT);
        }
        let mut x = MARGIN;
        for (cell, width) in cells.iter().zip(widths) {
            self.stroke_rect(x, bottom, *width, ROW_HEIGHT);
            let shown = truncate(cell, fits(*width, BODY_SIZE));
            if !shown.is_empty() {
                self.text(font, BODY_SIZE, x + CELL_PADDING, bottom + 4.0, &shown);
            }
            x += width;
        }
        self.y = bottom;
    }
}

/// Lays sections out across as many pages as they need
struct ReportLayout {
    pages: Vec<PageCanvas>,
}

impl ReportLayout {
    fn new() -> Self {
        Self {
            pages: vec![PageCanvas::new()],
        }
    }

    fn current(&mut self) -> &mut PageCanvas {
        if self.pages.is_empty() {
            self.pages.push(PageCanvas::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) -> &mut PageCanvas {
        self.pages.push(PageCanvas::new());
        self.current()
    }

    fn heading(&mut self, options: &ExportOptions) {
        let page = self.current();
        page.line(BOLD, TITLE_SIZE, &options.title, TITLE_SIZE + 6.0);
        if let Some(meta) = options.metadata_line.as_deref().filter(|m| !m.trim().is_empty()) {
            page.line(REGULAR, META_SIZE, meta, META_SIZE + 8.0);
        }
        page.y -= 4.0;
    }

    fn section(&mut self, named: &NamedTable) {
        let table = &named.table;
        let widths = column_widths(table);
        let header: Vec<String> = table.columns().to_vec();

        // Keep the section title with its header and at least one row
        if self.current().remaining() < SECTION_SIZE + 6.0 + 2.0 * ROW_HEIGHT {
            self.new_page();
        }
        let title = format!("{} ({} rows)", named.name, table.len());
        self.current().line(BOLD, SECTION_SIZE, &title, SECTION_SIZE + 6.0);

        if widths.is_empty() {
            self.current().y -= ROW_HEIGHT;
            return;
        }
        self.current().row(&header, &widths, BOLD, Some(0.94));

        for (i, row) in table.raw_rows().iter().enumerate() {
            if self.current().remaining() < ROW_HEIGHT {
                self.new_page().row(&header, &widths, BOLD, Some(0.94));
            }
            let cells: Vec<String> = row.iter().map(|c| c.as_text().into_owned()).collect();
            let shade = (i % 2 == 1).then_some(0.97);
            self.current().row(&cells, &widths, REGULAR, shade);
        }
        self.current().y -= ROW_HEIGHT;
    }
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Render `tables` as a single PDF document
pub fn write_report(tables: &[NamedTable], options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let mut layout = ReportLayout::new();
    layout.heading(options);
    for named in tables {
        layout.section(named);
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for canvas in layout.pages {
        let content = Content {
            operations: canvas.operations,
        };
        let encoded = content
            .encode()
            .map_err(|e| ExportError::Pdf(format!("Content encoding failed: {}", e)))?;
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.0f32.into(), 0.0f32.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        });
        kids.push(page_id.into());
    }
    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(latin1(&options.title), StringFormat::Literal),
        "Producer" => Object::string_literal("report-export"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    debug!(pages = page_count, sections = tables.len(), "PDF report laid out");

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::Pdf(format!("Save failed: {}", e)))?;
    Ok(buffer)
}
