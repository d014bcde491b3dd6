//! Page layout recovery from lopdf content streams
//!
//! Walks each page's content operators, tracking the text and graphics
//! matrices, and records positioned text runs plus horizontal/vertical
//! ruling segments. Glyph widths are estimated (no font metrics), which is
//! enough to find column gaps but not to typeset.

use crate::types::{Orientation, PageLayout, RuleSegment, TextItem};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

/// Average glyph advance as a fraction of the font size
const AVG_GLYPH_WIDTH: f64 = 0.5;

/// TJ adjustments beyond this many ems start a new text run
const RUN_BREAK_EMS: f64 = 2.0;

/// Segments thinner than this (points) are treated as lines
const RULE_THICKNESS: f64 = 2.0;

/// Affine matrix `[a b c d e f]` in PDF row-vector convention
#[derive(Clone, Copy, Debug, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f64, ty: f64) -> Matrix {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, operand) in m.iter_mut().zip(operands) {
            *slot = number(operand)?;
        }
        Some(Matrix(m))
    }

    /// `self × other`
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    fn vertical_scale(&self) -> f64 {
        let [_, _, c, d, ..] = self.0;
        (c * c + d * d).sqrt()
    }
}

#[derive(Clone, Debug)]
struct GraphicsState {
    ctm: Matrix,
    font_size: f64,
    leading: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scaling: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
        }
    }
}

/// A text run being accumulated across TJ elements
struct PendingRun {
    text: String,
    start: (f64, f64),
    font_size: f64,
}

struct PageWalker {
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Vec<((f64, f64), (f64, f64))>,
    rects: Vec<(f64, f64, f64, f64)>,
    current_point: (f64, f64),
    subpath_start: (f64, f64),
    items: Vec<TextItem>,
    rules: Vec<RuleSegment>,
}

impl PageWalker {
    fn new() -> Self {
        Self {
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: Vec::new(),
            rects: Vec::new(),
            current_point: (0.0, 0.0),
            subpath_start: (0.0, 0.0),
            items: Vec::new(),
            rules: Vec::new(),
        }
    }

    fn walk(&mut self, operations: &[Operation]) {
        for op in operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(saved) = self.stack.pop() {
                        self.state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        self.state.ctm = m.then(&self.state.ctm);
                    }
                }

                // Text object and state
                "BT" => {
                    self.text_matrix = Matrix::IDENTITY;
                    self.line_matrix = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(size) = operands.get(1).and_then(number) {
                        self.state.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(number) {
                        self.state.leading = leading;
                    }
                }
                "Tc" => {
                    if let Some(v) = operands.first().and_then(number) {
                        self.state.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(v) = operands.first().and_then(number) {
                        self.state.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some(v) = operands.first().and_then(number) {
                        self.state.horizontal_scaling = v / 100.0;
                    }
                }
                "Td" | "TD" => {
                    let tx = operands.first().and_then(number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        self.state.leading = -ty;
                    }
                    self.next_line(tx, ty);
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                }
                "T*" => self.next_line(0.0, -self.state.leading),

                // Text showing
                "Tj" => {
                    if let Some(operand) = operands.first() {
                        self.show(std::slice::from_ref(operand));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(elements)) = operands.first() {
                        self.show(elements);
                    }
                }
                "'" => {
                    self.next_line(0.0, -self.state.leading);
                    if let Some(operand) = operands.first() {
                        self.show(std::slice::from_ref(operand));
                    }
                }
                "\"" => {
                    if let Some(v) = operands.first().and_then(number) {
                        self.state.word_spacing = v;
                    }
                    if let Some(v) = operands.get(1).and_then(number) {
                        self.state.char_spacing = v;
                    }
                    self.next_line(0.0, -self.state.leading);
                    if let Some(operand) = operands.get(2) {
                        self.show(std::slice::from_ref(operand));
                    }
                }

                // Path construction
                "m" => {
                    if let (Some(x), Some(y)) = (
                        operands.first().and_then(number),
                        operands.get(1).and_then(number),
                    ) {
                        let p = self.state.ctm.apply(x, y);
                        self.current_point = p;
                        self.subpath_start = p;
                    }
                }
                "l" => {
                    if let (Some(x), Some(y)) = (
                        operands.first().and_then(number),
                        operands.get(1).and_then(number),
                    ) {
                        let p = self.state.ctm.apply(x, y);
                        self.path.push((self.current_point, p));
                        self.current_point = p;
                    }
                }
                "h" => {
                    self.path.push((self.current_point, self.subpath_start));
                    self.current_point = self.subpath_start;
                }
                "re" => {
                    let values: Vec<f64> = operands.iter().filter_map(number).collect();
                    if let &[x, y, w, h] = values.as_slice() {
                        let (x0, y0) = self.state.ctm.apply(x, y);
                        let (x1, y1) = self.state.ctm.apply(x + w, y + h);
                        self.rects.push((x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)));
                        self.current_point = (x0, y0);
                        self.subpath_start = (x0, y0);
                    }
                }

                // Path painting
                "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => self.flush_path(true),
                "n" => self.flush_path(false),
                _ => {}
            }
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Device-space position of the current text origin
    fn text_origin(&self) -> (f64, f64) {
        self.text_matrix.then(&self.state.ctm).apply(0.0, 0.0)
    }

    fn effective_font_size(&self) -> f64 {
        self.state.font_size * self.text_matrix.then(&self.state.ctm).vertical_scale()
    }

    /// Advance the text matrix by `tx` unscaled text-space units
    fn advance(&mut self, tx: f64) {
        self.text_matrix = Matrix::translate(tx, 0.0).then(&self.text_matrix);
    }

    fn glyph_advance(&self, text: &str) -> f64 {
        let glyphs = text.chars().count() as f64;
        let spaces = text.chars().filter(|c| *c == ' ').count() as f64;
        (glyphs * (AVG_GLYPH_WIDTH * self.state.font_size + self.state.char_spacing)
            + spaces * self.state.word_spacing)
            * self.state.horizontal_scaling
    }

    fn show(&mut self, elements: &[Object]) {
        let mut run: Option<PendingRun> = None;

        for element in elements {
            match element {
                Object::String(bytes, _) => {
                    let text = decode_pdf_string(bytes);
                    let pending = run.get_or_insert_with(|| PendingRun {
                        text: String::new(),
                        start: self.text_origin(),
                        font_size: self.effective_font_size(),
                    });
                    pending.text.push_str(&text);
                    let advance = self.glyph_advance(&text);
                    self.advance(advance);
                }
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = number(element).unwrap_or(0.0);
                    let ems = -adjustment / 1000.0;
                    if ems > RUN_BREAK_EMS {
                        if let Some(done) = run.take() {
                            self.finish_run(done);
                        }
                    } else if adjustment < -100.0 {
                        // Kerning this wide usually stands in for a space
                        if let Some(pending) = run.as_mut() {
                            pending.text.push(' ');
                        }
                    }
                    let shift = ems * self.state.font_size * self.state.horizontal_scaling;
                    self.advance(shift);
                }
                _ => {}
            }
        }

        if let Some(done) = run.take() {
            self.finish_run(done);
        }
    }

    fn finish_run(&mut self, run: PendingRun) {
        let end = self.text_origin();
        if run.text.trim().is_empty() {
            return;
        }
        let width = (end.0 - run.start.0).abs();
        self.items.push(TextItem {
            text: run.text,
            x: run.start.0,
            y: run.start.1,
            width,
            font_size: run.font_size,
        });
    }

    fn flush_path(&mut self, painted: bool) {
        let segments = std::mem::take(&mut self.path);
        let rects = std::mem::take(&mut self.rects);
        if !painted {
            return;
        }

        for (from, to) in segments {
            if let Some(rule) = classify_segment(from, to) {
                self.rules.push(rule);
            }
        }

        for (x0, y0, x1, y1) in rects {
            let (w, h) = (x1 - x0, y1 - y0);
            if h <= RULE_THICKNESS && w > RULE_THICKNESS {
                self.rules.push(RuleSegment {
                    orientation: Orientation::Horizontal,
                    position: (y0 + y1) / 2.0,
                    start: x0,
                    end: x1,
                });
            } else if w <= RULE_THICKNESS && h > RULE_THICKNESS {
                self.rules.push(RuleSegment {
                    orientation: Orientation::Vertical,
                    position: (x0 + x1) / 2.0,
                    start: y0,
                    end: y1,
                });
            } else if w > RULE_THICKNESS && h > RULE_THICKNESS {
                for (from, to) in [
                    ((x0, y0), (x1, y0)),
                    ((x0, y1), (x1, y1)),
                    ((x0, y0), (x0, y1)),
                    ((x1, y0), (x1, y1)),
                ] {
                    if let Some(rule) = classify_segment(from, to) {
                        self.rules.push(rule);
                    }
                }
            }
        }
    }
}

fn classify_segment(from: (f64, f64), to: (f64, f64)) -> Option<RuleSegment> {
    let (dx, dy) = ((to.0 - from.0).abs(), (to.1 - from.1).abs());
    if dy <= 1.0 && dx > RULE_THICKNESS {
        Some(RuleSegment {
            orientation: Orientation::Horizontal,
            position: (from.1 + to.1) / 2.0,
            start: from.0.min(to.0),
            end: from.0.max(to.0),
        })
    } else if dx <= 1.0 && dy > RULE_THICKNESS {
        Some(RuleSegment {
            orientation: Orientation::Vertical,
            position: (from.0 + to.0) / 2.0,
            start: from.1.min(to.1),
            end: from.1.max(to.1),
        })
    } else {
        None
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Decode a PDF string operand: UTF-16BE with BOM, then UTF-8, then Latin-1
pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return s;
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    let media_box = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .and_then(|dict| dict.get(b"MediaBox"))
        .and_then(Object::as_array);
    if let Ok(values) = media_box {
        if values.len() >= 4 {
            if let (Some(x0), Some(y0), Some(x1), Some(y1)) = (
                number(&values[0]),
                number(&values[1]),
                number(&values[2]),
                number(&values[3]),
            ) {
                return ((x1 - x0).abs(), (y1 - y0).abs());
            }
        }
    }
    (612.0, 792.0)
}

/// Recover the layout of one page. Pages whose content cannot be decoded
/// come back empty rather than failing the whole document.
pub fn page_layout(doc: &Document, page_number: u32, page_id: ObjectId) -> PageLayout {
    let (width, height) = page_dimensions(doc, page_id);
    let mut walker = PageWalker::new();

    match doc
        .get_page_content(page_id)
        .and_then(|bytes| Content::decode(&bytes))
    {
        Ok(content) => walker.walk(&content.operations),
        Err(e) => debug!(page = page_number, error = %e, "Could not decode page content"),
    }

    PageLayout {
        page_number,
        width,
        height,
        items: walker.items,
        rules: walker.rules,
    }
}

/// Recover layouts for every page, up to `max_pages`
pub fn page_layouts(doc: &Document, max_pages: Option<usize>) -> Vec<PageLayout> {
    doc.get_pages()
        .into_iter()
        .take(max_pages.unwrap_or(usize::MAX))
        .map(|(number, id)| page_layout(doc, number, id))
        .collect()
}

/// Run the layout walker over raw operations; used by tests in this crate
#[cfg(test)]
pub(crate) fn layout_from_operations(operations: Vec<Operation>) -> PageLayout {
    let mut walker = PageWalker::new();
    walker.walk(&operations);
    PageLayout {
        page_number: 1,
        width: 612.0,
        height: 792.0,
        items: walker.items,
        rules: walker.rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn text(s: &str) -> Object {
        Object::string_literal(s)
    }

    #[test]
    fn test_td_positions_text_runs() {
        let layout = layout_from_operations(vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op("Td", vec![50.into(), 700.into()]),
            op("Tj", vec![text("Permit")]),
            op("Td", vec![100.into(), 0.into()]),
            op("Tj", vec![text("Issued")]),
            op("ET", vec![]),
        ]);

        assert_eq!(layout.items.len(), 2);
        assert_eq!(layout.items[0].text, "Permit");
        assert_eq!(layout.items[0].x, 50.0);
        assert_eq!(layout.items[0].y, 700.0);
        assert_eq!(layout.items[1].x, 150.0);
        assert_eq!(layout.items[0].font_size, 10.0);
        // 6 glyphs at half an em each
        assert_eq!(layout.items[0].width, 30.0);
    }

    #[test]
    fn test_cm_translates_text() {
        let layout = layout_from_operations(vec![
            op("q", vec![]),
            op("cm", vec![1.into(), 0.into(), 0.into(), 1.into(), 20.into(), 30.into()]),
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 5.into(), 5.into()]),
            op("Tj", vec![text("A")]),
            op("ET", vec![]),
            op("Q", vec![]),
        ]);
        assert_eq!(layout.items[0].x, 25.0);
        assert_eq!(layout.items[0].y, 35.0);
    }

    #[test]
    fn test_wide_tj_gap_splits_runs() {
        let layout = layout_from_operations(vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op("Td", vec![0.into(), 100.into()]),
            op(
                "TJ",
                vec![Object::Array(vec![text("Left"), (-5000).into(), text("Right")])],
            ),
            op("ET", vec![]),
        ]);
        assert_eq!(layout.items.len(), 2);
        assert_eq!(layout.items[1].text, "Right");
        // 4 glyphs (20pt) then a 5-em jump (50pt)
        assert_eq!(layout.items[1].x, 70.0);
    }

    #[test]
    fn test_lines_and_rects_become_rules() {
        let layout = layout_from_operations(vec![
            op("m", vec![10.into(), 100.into()]),
            op("l", vec![200.into(), 100.into()]),
            op("S", vec![]),
            op("re", vec![50.into(), 20.into(), 100.into(), 40.into()]),
            op("S", vec![]),
            op("re", vec![0.into(), 0.into(), 300.into(), 300.into()]),
            op("n", vec![]),
        ]);
        let horizontal = layout.rules_of(Orientation::Horizontal).count();
        let vertical = layout.rules_of(Orientation::Vertical).count();
        assert_eq!(horizontal, 3);
        assert_eq!(vertical, 2);
    }

    #[test]
    fn test_decode_pdf_string_variants() {
        assert_eq!(decode_pdf_string(b"Main St"), "Main St");
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x41]), "A");
        assert_eq!(decode_pdf_string(&[0xE9]), "\u{e9}");
    }
}
