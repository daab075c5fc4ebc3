//! Word extraction from page content streams.
//!
//! Walks the text operators of a decoded content stream, tracks the text and
//! graphics matrices, and turns each shown string into positioned glyph runs.
//! Runs that touch on the same baseline merge; the result is split on
//! whitespace into [`Word`]s with top-down boxes.

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use crate::error::{Error, Result};
use crate::model::{PageSize, Word};

use super::backend::get_number;

/// Default horizontal gap (points) below which glyph runs join into one word.
pub const DEFAULT_X_TOLERANCE: f32 = 3.0;

/// Fraction of the font size above the baseline taken as the glyph top.
const ASCENT: f32 = 0.8;
/// Fraction of the font size below the baseline taken as the glyph bottom.
const DESCENT: f32 = 0.2;
/// Glyph width used when a font carries no metrics, in 1/1000 em.
const FALLBACK_WIDTH: f32 = 500.0;
/// TJ adjustments larger than this (1/1000 em) read as a word break.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let v: Vec<f32> = operands.iter().filter_map(get_number).collect();
        match v.as_slice() {
            [a, b, c, d, e, f] => Some(Matrix {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self` applied first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed vertical unit vector.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Glyph advance widths for one font.
#[derive(Debug, Clone)]
struct FontMetrics {
    first_char: i64,
    widths: Vec<f32>,
    missing_width: f32,
    two_byte: bool,
}

impl FontMetrics {
    fn from_dict(doc: &LopdfDocument, dict: &Dictionary) -> Self {
        let deref = |obj: &Object| -> Option<Object> {
            match obj {
                Object::Reference(r) => doc.get_object(*r).ok().cloned(),
                other => Some(other.clone()),
            }
        };

        let two_byte = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| n == b"Type0")
            .unwrap_or(false);

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(deref)
            .and_then(|o| get_number(&o))
            .unwrap_or(0.0) as i64;

        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(deref)
            .and_then(|o| match o {
                Object::Array(arr) => Some(
                    arr.iter()
                        .map(|w| deref(w).and_then(|w| get_number(&w)).unwrap_or(0.0))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();

        let missing_width = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(deref)
            .and_then(|o| match o {
                Object::Dictionary(d) => d.get(b"MissingWidth").ok().and_then(get_number),
                _ => None,
            })
            .filter(|w| *w > 0.0)
            .unwrap_or(FALLBACK_WIDTH);

        Self {
            first_char,
            widths,
            missing_width,
            two_byte,
        }
    }

    fn fallback() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            missing_width: FALLBACK_WIDTH,
            two_byte: false,
        }
    }

    /// Advance of a shown string in text space, before horizontal scaling.
    fn advance(&self, bytes: &[u8], state: &TextState) -> f32 {
        let codes: Vec<(i64, bool)> = if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| {
                    let code = c.iter().fold(0i64, |acc, b| (acc << 8) | *b as i64);
                    (code, false)
                })
                .collect()
        } else {
            bytes.iter().map(|b| (*b as i64, *b == b' ')).collect()
        };

        codes
            .into_iter()
            .map(|(code, is_space)| {
                let glyph = self.glyph_width(code) / 1000.0 * state.font_size;
                let word_spacing = if is_space { state.word_spacing } else { 0.0 };
                glyph + state.char_spacing + word_spacing
            })
            .sum()
    }

    fn glyph_width(&self, code: i64) -> f32 {
        let index = code - self.first_char;
        if index >= 0 {
            if let Some(w) = self.widths.get(index as usize) {
                if *w > 0.0 {
                    return *w;
                }
            }
        }
        self.missing_width
    }
}

/// Text state parameters that survive across BT/ET.
#[derive(Debug, Clone)]
struct TextState {
    font_name: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_name: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// A decoded string placed on the page, in bottom-up page space.
#[derive(Debug, Clone)]
struct GlyphRun {
    text: String,
    x0: f32,
    x1: f32,
    baseline: f32,
    size: f32,
}

/// Extracts words from one page's content stream.
pub struct WordExtractor<'a> {
    doc: &'a LopdfDocument,
    fonts: &'a [(Vec<u8>, &'a Dictionary)],
    page_size: PageSize,
    x_tolerance: f32,
}

impl<'a> WordExtractor<'a> {
    /// Create an extractor for a page with the given fonts and size.
    pub fn new(
        doc: &'a LopdfDocument,
        fonts: &'a [(Vec<u8>, &'a Dictionary)],
        page_size: PageSize,
    ) -> Self {
        Self {
            doc,
            fonts,
            page_size,
            x_tolerance: DEFAULT_X_TOLERANCE,
        }
    }

    /// Set the horizontal merge tolerance.
    pub fn with_x_tolerance(mut self, tolerance: f32) -> Self {
        self.x_tolerance = tolerance;
        self
    }

    /// Decode the content stream and return the page's words.
    pub fn extract(&self, content: &[u8]) -> Result<Vec<Word>> {
        let runs = self.glyph_runs(content)?;
        let merged = merge_runs(runs, self.x_tolerance);
        let words: Vec<Word> = merged
            .iter()
            .flat_map(|run| split_run(run, self.page_size.height))
            .collect();
        log::debug!("Extracted {} words", words.len());
        Ok(words)
    }

    fn font(&self, name: &[u8]) -> Option<&'a Dictionary> {
        self.fonts
            .iter()
            .find(|(n, _)| n.as_slice() == name)
            .map(|(_, dict)| *dict)
    }

    fn glyph_runs(&self, content: &[u8]) -> Result<Vec<GlyphRun>> {
        let content =
            lopdf::content::Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut runs = Vec::new();
        let mut ctm = Matrix::IDENTITY;
        let mut ctm_stack: Vec<Matrix> = Vec::new();
        let mut text_matrix = Matrix::IDENTITY;
        let mut line_matrix = Matrix::IDENTITY;
        let mut state = TextState::default();
        let mut metrics = FontMetrics::fallback();
        let mut encoding = None;
        let mut in_text_block = false;

        for op in content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => {
                    if let Some(saved) = ctm_stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        ctm = m.then(&ctm);
                    }
                }
                "BT" => {
                    in_text_block = true;
                    text_matrix = Matrix::IDENTITY;
                    line_matrix = Matrix::IDENTITY;
                }
                "ET" => in_text_block = false,
                "Tf" => {
                    if let [Object::Name(name), size, ..] = operands {
                        state.font_name = name.clone();
                        state.font_size = get_number(size).unwrap_or(12.0);
                        let font = self.font(name);
                        metrics = font
                            .map(|f| FontMetrics::from_dict(self.doc, f))
                            .unwrap_or_else(FontMetrics::fallback);
                        encoding = font.and_then(|f| f.get_font_encoding(self.doc).ok());
                    }
                }
                "Tc" => state.char_spacing = first_number(operands).unwrap_or(0.0),
                "Tw" => state.word_spacing = first_number(operands).unwrap_or(0.0),
                "Tz" => state.horizontal_scale = first_number(operands).unwrap_or(100.0) / 100.0,
                "TL" => state.leading = first_number(operands).unwrap_or(0.0),
                "Ts" => state.rise = first_number(operands).unwrap_or(0.0),
                "Td" | "TD" => {
                    if let [tx, ty, ..] = operands {
                        let tx = get_number(tx).unwrap_or(0.0);
                        let ty = get_number(ty).unwrap_or(0.0);
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        line_matrix = Matrix::translation(tx, ty).then(&line_matrix);
                        text_matrix = line_matrix;
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        line_matrix = m;
                        text_matrix = m;
                    }
                }
                "T*" => {
                    line_matrix = Matrix::translation(0.0, -state.leading).then(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tj" | "TJ" | "'" | "\"" => {
                    if op.operator == "'" || op.operator == "\"" {
                        if op.operator == "\"" {
                            if let [aw, ac, ..] = operands {
                                state.word_spacing = get_number(aw).unwrap_or(0.0);
                                state.char_spacing = get_number(ac).unwrap_or(0.0);
                            }
                        }
                        line_matrix = Matrix::translation(0.0, -state.leading).then(&line_matrix);
                        text_matrix = line_matrix;
                    }
                    if !in_text_block {
                        continue;
                    }

                    let pieces: Vec<&Object> = match (op.operator.as_str(), operands) {
                        ("TJ", [Object::Array(arr), ..]) => arr.iter().collect(),
                        ("\"", [_, _, s, ..]) => vec![s],
                        (_, [s, ..]) => vec![s],
                        _ => Vec::new(),
                    };

                    let start = text_matrix;
                    let mut text = String::new();
                    let mut advance = 0.0f32;
                    for piece in pieces {
                        match piece {
                            Object::String(bytes, _) => {
                                let decoded = match encoding {
                                    Some(ref enc) => LopdfDocument::decode_text(enc, bytes)
                                        .unwrap_or_else(|_| decode_text_simple(bytes)),
                                    None => decode_text_simple(bytes),
                                };
                                text.push_str(&decoded);
                                advance += metrics.advance(bytes, &state) * state.horizontal_scale;
                            }
                            other => {
                                if let Some(n) = get_number(other) {
                                    let shift = n / 1000.0 * state.font_size;
                                    advance -= shift * state.horizontal_scale;
                                    if -n > TJ_SPACE_THRESHOLD
                                        && !text.is_empty()
                                        && !text.ends_with(char::is_whitespace)
                                    {
                                        text.push(' ');
                                    }
                                }
                            }
                        }
                    }

                    text_matrix = Matrix::translation(advance, 0.0).then(&text_matrix);

                    if text.trim().is_empty() {
                        continue;
                    }

                    let device = start.then(&ctm);
                    let (x0, baseline) = device.apply(0.0, state.rise);
                    let (x1, _) = device.apply(advance, state.rise);
                    let size = state.font_size * device.vertical_scale();

                    runs.push(GlyphRun {
                        text,
                        x0: x0.min(x1),
                        x1: x0.max(x1),
                        baseline,
                        size,
                    });
                }
                _ => {}
            }
        }

        Ok(runs)
    }
}

/// Join runs that continue one another on the same baseline.
fn merge_runs(runs: Vec<GlyphRun>, x_tolerance: f32) -> Vec<GlyphRun> {
    let mut merged: Vec<GlyphRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if let Some(prev) = merged.last_mut() {
            let same_baseline = (prev.baseline - run.baseline).abs() <= prev.size.max(1.0) * 0.1;
            let gap = run.x0 - prev.x1;
            if same_baseline && gap.abs() <= x_tolerance {
                prev.text.push_str(&run.text);
                prev.x1 = prev.x1.max(run.x1);
                prev.size = prev.size.max(run.size);
                continue;
            }
        }
        merged.push(run);
    }
    merged
}

/// Split a run on whitespace, spreading its width evenly over characters.
fn split_run(run: &GlyphRun, page_height: f32) -> Vec<Word> {
    let chars: Vec<char> = run.text.chars().collect();
    let count = chars.len().max(1) as f32;
    let char_width = (run.x1 - run.x0) / count;
    let top = page_height - (run.baseline + run.size * ASCENT);
    let bottom = page_height - (run.baseline - run.size * DESCENT);

    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;
    for (i, c) in chars.iter().enumerate() {
        if c.is_whitespace() {
            if !current.is_empty() {
                let x0 = run.x0 + char_width * start as f32;
                words.push(Word::new(std::mem::take(&mut current), x0, top, bottom));
            }
            start = i + 1;
        } else {
            current.push(*c);
        }
    }
    if !current.is_empty() {
        let x0 = run.x0 + char_width * start as f32;
        words.push(Word::new(current, x0, top, bottom));
    }
    words
}

fn first_number(operands: &[Object]) -> Option<f32> {
    operands.first().and_then(get_number)
}

/// Simple text decoding fallback when no encoding is available.
fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with byte order mark
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, x0: f32, x1: f32, baseline: f32) -> GlyphRun {
        GlyphRun {
            text: text.to_string(),
            x0,
            x1,
            baseline,
            size: 10.0,
        }
    }

    #[test]
    fn test_matrix_composition() {
        let scale = Matrix {
            a: 2.0,
            d: 2.0,
            ..Matrix::IDENTITY
        };
        let moved = Matrix::translation(10.0, 20.0).then(&scale);
        assert_eq!(moved.apply(0.0, 0.0), (20.0, 40.0));
        assert_eq!(moved.vertical_scale(), 2.0);
    }

    #[test]
    fn test_merge_runs_joins_adjacent_glyphs() {
        let runs = vec![
            run("2.1", 72.0, 86.0, 700.0),
            run(".3.", 87.0, 100.0, 700.0),
            run("Find", 110.0, 130.0, 700.0),
        ];
        let merged = merge_runs(runs, DEFAULT_X_TOLERANCE);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "2.1.3.");
        assert_eq!(merged[1].text, "Find");
    }

    #[test]
    fn test_merge_runs_keeps_separate_baselines() {
        let runs = vec![run("a", 72.0, 80.0, 700.0), run("b", 80.0, 88.0, 680.0)];
        assert_eq!(merge_runs(runs, DEFAULT_X_TOLERANCE).len(), 2);
    }

    #[test]
    fn test_split_run_into_words() {
        let r = run("Section 2.1 Problems", 100.0, 300.0, 692.0);
        let words = split_run(&r, 792.0);
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].text, "Section");
        assert_eq!(words[0].x0, 100.0);
        assert_eq!(words[1].text, "2.1");
        assert!(words[1].x0 > words[0].x0);
        assert!((words[0].top - 92.0).abs() < 0.01);
        assert!((words[0].bottom - 102.0).abs() < 0.01);
    }

    #[test]
    fn test_font_metrics_advance() {
        let metrics = FontMetrics {
            first_char: 65,
            widths: vec![600.0, 700.0],
            missing_width: 500.0,
            two_byte: false,
        };
        let state = TextState {
            font_size: 10.0,
            ..TextState::default()
        };
        // A=600, B=700, C falls back to 500
        let advance = metrics.advance(b"ABC", &state);
        assert!((advance - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(&[0x48, 0xE9]), "Hé");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }
}
