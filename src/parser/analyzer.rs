//! Two-pass section analysis.
//!
//! Pass 1 finds every "Section X.Y Problems" header. Pass 2 walks every line
//! from the header's page up to the next header and tracks the last line that
//! belongs to a numbered question of that section.

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{Line, SectionSpan};

use super::backend::PagedDocument;
use super::lines::group_words_into_lines;
use super::options::AnalyzeOptions;

/// Pattern matched against reconstructed lines to find section headers.
pub const SECTION_PATTERN: &str = r"Section\s+(\d+\.\d+)\s+Problems";

/// Lines of one page, reconstructed once and reused by both passes.
struct PageText {
    height: f32,
    lines: Vec<Line>,
}

/// A header occurrence found by pass 1.
#[derive(Debug, Clone)]
struct HeaderHit {
    page: usize,
    top: f32,
    title: String,
    section_id: String,
}

/// Where a section's scan must stop.
#[derive(Debug, Clone, Copy)]
struct Boundary {
    page: usize,
    /// Top of the next header, `None` for the end of the document
    top: Option<f32>,
}

/// Locates problem sections and the extent of their questions.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalyzeOptions,
}

impl Analyzer {
    /// Create an analyzer with the given options.
    pub fn new(options: AnalyzeOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> &AnalyzeOptions {
        &self.options
    }

    /// Reconstruct the text lines of one page.
    pub fn page_lines<D: PagedDocument + ?Sized>(&self, doc: &D, page: usize) -> Result<Vec<Line>> {
        let words = doc.words(page)?;
        Ok(group_words_into_lines(words, self.options.line_tolerance))
    }

    /// Scan the whole document and return one span per section header.
    ///
    /// Fails with [`Error::NoSectionsFound`] when no header matches.
    pub fn analyze<D: PagedDocument + ?Sized>(&self, doc: &D) -> Result<Vec<SectionSpan>> {
        let pages = self.read_pages(doc)?;
        let headers = find_headers(&pages)?;
        if headers.is_empty() {
            log::info!("No section headers in {} pages", pages.len());
            return Err(Error::NoSectionsFound);
        }
        log::info!(
            "Found {} section headers in {} pages",
            headers.len(),
            pages.len()
        );

        let last_page = pages.len().saturating_sub(1);
        let mut spans = Vec::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let next = headers.get(i + 1);
            let boundary = match next {
                Some(n) => Boundary {
                    page: n.page,
                    top: Some(n.top),
                },
                None => Boundary {
                    page: last_page,
                    top: None,
                },
            };

            let mut span = self.measure_section(&pages, header, boundary)?;
            if let Some(n) = next {
                self.clamp_to_next(&mut span, n);
            }

            log::debug!(
                "Section {}: {} questions, pages {}-{}, end offset {:.1}",
                span.section_id,
                span.question_count,
                span.start_page + 1,
                span.end_page + 1,
                span.end_y
            );
            spans.push(span);
        }

        Ok(spans)
    }

    fn read_pages<D: PagedDocument + ?Sized>(&self, doc: &D) -> Result<Vec<PageText>> {
        (0..doc.page_count())
            .map(|page| {
                let size = doc.page_size(page)?;
                let lines = self.page_lines(doc, page)?;
                log::debug!("Page {}: {} lines", page + 1, lines.len());
                Ok(PageText {
                    height: size.height,
                    lines,
                })
            })
            .collect()
    }

    /// Pass 2 for one header: count questions and find the last content line.
    fn measure_section(
        &self,
        pages: &[PageText],
        header: &HeaderHit,
        boundary: Boundary,
    ) -> Result<SectionSpan> {
        let question = Regex::new(&format!(r"\b{}\.\d+", regex::escape(&header.section_id)))?;
        let opts = &self.options;

        let mut question_count = 0;
        let mut last_page = header.page;
        let mut last_bottom = header.top;

        for (pg, page) in pages
            .iter()
            .enumerate()
            .take(boundary.page + 1)
            .skip(header.page)
        {
            for line in &page.lines {
                if pg == boundary.page {
                    if let Some(stop) = boundary.top {
                        if line.top >= stop {
                            break;
                        }
                    }
                }
                if line.top < opts.header_band || line.bottom > page.height - opts.footer_band {
                    continue;
                }

                if question.is_match(&line.text) {
                    question_count += 1;
                    last_page = pg;
                    last_bottom = line.bottom;
                } else if question_count > 0 && last_page == pg {
                    let within_limit = opts
                        .continuation_limit
                        .map_or(true, |limit| line.top - last_bottom <= limit);
                    if within_limit {
                        last_bottom = last_bottom.max(line.bottom);
                    }
                }
            }
        }

        Ok(SectionSpan {
            section_id: header.section_id.clone(),
            title: header.title.clone(),
            start_page: header.page,
            start_y: header.top,
            end_page: last_page,
            end_y: last_bottom + opts.end_padding,
            question_count,
        })
    }

    /// Keep a section from running into the next header on the same page.
    fn clamp_to_next(&self, span: &mut SectionSpan, next: &HeaderHit) {
        if span.end_page == next.page {
            let limit = next.top - self.options.boundary_gap;
            if span.end_y > limit {
                log::debug!(
                    "Clamping section {} end from {:.1} to {:.1}",
                    span.section_id,
                    span.end_y,
                    limit
                );
                span.end_y = limit;
            }
        }
    }
}

/// Pass 1: every header match, in document order.
fn find_headers(pages: &[PageText]) -> Result<Vec<HeaderHit>> {
    let pattern = Regex::new(SECTION_PATTERN)?;
    let mut headers = Vec::new();
    for (page, text) in pages.iter().enumerate() {
        for line in &text.lines {
            for caps in pattern.captures_iter(&line.text) {
                headers.push(HeaderHit {
                    page,
                    top: line.top,
                    title: line.text.trim().to_string(),
                    section_id: caps[1].to_string(),
                });
            }
        }
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PageSize, Word};
    use crate::parser::InMemoryDocument;

    fn line(text: &str, top: f32) -> Vec<Word> {
        let mut x = 72.0;
        text.split_whitespace()
            .map(|w| {
                let word = Word::new(w, x, top, top + 12.0);
                x += w.len() as f32 * 6.0 + 4.0;
                word
            })
            .collect()
    }

    fn page(lines: &[(&str, f32)]) -> Vec<Word> {
        lines.iter().flat_map(|(t, top)| line(t, *top)).collect()
    }

    fn sample() -> InMemoryDocument {
        InMemoryDocument::new()
            .with_page(
                PageSize::LETTER,
                page(&[
                    ("Section 2.1 Problems", 100.0),
                    ("2.1.1. Solve x + 1 = 2.", 150.0),
                    ("2.1.2. Solve x - 1 = 2.", 200.0),
                ]),
            )
            .with_page(
                PageSize::LETTER,
                page(&[
                    ("Section 2.2 Problems", 100.0),
                    ("These use the rules above.", 130.0),
                ]),
            )
            .with_page(
                PageSize::LETTER,
                page(&[
                    ("2.2.1. Differentiate f.", 80.0),
                    ("(a) at x = 0", 100.0),
                ]),
            )
    }

    #[test]
    fn test_two_section_scenario() {
        let spans = Analyzer::default().analyze(&sample()).unwrap();
        assert_eq!(spans.len(), 2);

        assert_eq!(spans[0].section_id, "2.1");
        assert_eq!(spans[0].question_count, 2);
        assert_eq!(spans[0].start_page, 0);
        assert_eq!(spans[0].end_page, 0);
        assert_eq!(spans[0].end_y, 232.0);
        assert_eq!(spans[0].summary().page_range(), "p.1");

        assert_eq!(spans[1].section_id, "2.2");
        assert_eq!(spans[1].question_count, 1);
        assert_eq!(spans[1].end_page, 2);
        // continuation line "(a) at x = 0" extends the last question
        assert_eq!(spans[1].end_y, 132.0);
        assert_eq!(spans[1].summary().page_range(), "p.2-3");
    }

    #[test]
    fn test_no_headers() {
        let doc = InMemoryDocument::new().with_page(PageSize::LETTER, page(&[("Intro", 100.0)]));
        let result = Analyzer::default().analyze(&doc);
        assert!(matches!(result, Err(Error::NoSectionsFound)));
    }

    #[test]
    fn test_section_without_questions() {
        let doc = InMemoryDocument::new().with_page(
            PageSize::LETTER,
            page(&[("Section 4.1 Problems", 300.0), ("Nothing numbered", 330.0)]),
        );
        let spans = Analyzer::default().analyze(&doc).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].question_count, 0);
        assert_eq!(spans[0].end_page, 0);
        assert_eq!(spans[0].end_y, 320.0);
    }

    #[test]
    fn test_end_clamped_before_next_header() {
        let doc = InMemoryDocument::new().with_page(
            PageSize::LETTER,
            page(&[
                ("Section 1.1 Problems", 100.0),
                ("1.1.1. First", 130.0),
                ("Section 1.2 Problems", 150.0),
                ("1.2.1. Second", 180.0),
            ]),
        );
        let spans = Analyzer::default().analyze(&doc).unwrap();
        assert_eq!(spans.len(), 2);
        assert!(spans[0].end_y < spans[1].start_y);
        assert_eq!(spans[0].end_y, 149.0);
    }

    #[test]
    fn test_margin_bands_are_ignored() {
        let doc = InMemoryDocument::new().with_page(
            PageSize::LETTER,
            page(&[
                ("Section 3.1 Problems", 60.0),
                ("3.1.1. Kept", 100.0),
                ("3.1.9 running footer", 760.0),
            ]),
        );
        let spans = Analyzer::default().analyze(&doc).unwrap();
        assert_eq!(spans[0].question_count, 1);
        assert_eq!(spans[0].end_y, 132.0);
    }

    #[test]
    fn test_question_pattern_needs_word_boundary() {
        let doc = InMemoryDocument::new().with_page(
            PageSize::LETTER,
            page(&[
                ("Section 2.1 Problems", 100.0),
                ("12.1.4 belongs elsewhere", 130.0),
                ("2.1.1. Counted", 160.0),
            ]),
        );
        let spans = Analyzer::default().analyze(&doc).unwrap();
        assert_eq!(spans[0].question_count, 1);
    }

    #[test]
    fn test_continuation_limit() {
        let pages = || {
            InMemoryDocument::new().with_page(
                PageSize::LETTER,
                page(&[
                    ("Section 5.1 Problems", 100.0),
                    ("5.1.1. Short", 130.0),
                    ("Further reading", 400.0),
                ]),
            )
        };

        let unbounded = Analyzer::default().analyze(&pages()).unwrap();
        assert_eq!(unbounded[0].end_y, 432.0);

        let capped = Analyzer::new(AnalyzeOptions::new().with_continuation_limit(24.0))
            .analyze(&pages())
            .unwrap();
        assert_eq!(capped[0].end_y, 162.0);
    }

    #[test]
    fn test_duplicate_headers_each_yield_a_span() {
        let doc = InMemoryDocument::new().with_page(
            PageSize::LETTER,
            page(&[
                ("Section 6.1 Problems", 100.0),
                ("Section 6.1 Problems", 120.0),
                ("6.1.1. Only one", 150.0),
            ]),
        );
        let spans = Analyzer::default().analyze(&doc).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].question_count, 0);
        assert!(spans[0].end_y < spans[1].start_y);
        assert_eq!(spans[1].question_count, 1);
    }

    #[test]
    fn test_lines_above_header_on_start_page_are_scanned() {
        let doc = InMemoryDocument::new().with_page(
            PageSize::LETTER,
            page(&[
                ("7.1.3 mentioned in the text", 90.0),
                ("Section 7.1 Problems", 200.0),
                ("7.1.1. Real question", 230.0),
            ]),
        );
        let spans = Analyzer::default().analyze(&doc).unwrap();
        assert_eq!(spans[0].question_count, 2);
        assert_eq!(spans[0].end_y, 262.0);
    }

    #[test]
    fn test_header_words_straddling_a_band() {
        let doc = InMemoryDocument::new().with_page(
            PageSize::LETTER,
            vec![
                Word::new("Section", 72.0, 100.5, 112.5),
                Word::new("2.1", 130.0, 100.0, 112.0),
                Word::new("Problems", 160.0, 100.0, 112.0),
                Word::new("2.1.1.", 72.0, 130.0, 142.0),
            ],
        );
        let spans = Analyzer::default().analyze(&doc).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].title, "Section 2.1 Problems");
        assert_eq!(spans[0].start_y, 100.0);
        assert_eq!(spans[0].question_count, 1);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let analyzer = Analyzer::default();
        let doc = sample();
        assert_eq!(analyzer.analyze(&doc).unwrap(), analyzer.analyze(&doc).unwrap());
    }
}
