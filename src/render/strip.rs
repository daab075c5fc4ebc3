//! Strip planning: turning section spans into an ordered run of crops and gaps.

use crate::error::{Error, Result};
use crate::model::{CropWindow, SectionSpan};
use crate::parser::PagedDocument;

use super::options::RenderOptions;

/// One vertical unit of the output.
#[derive(Debug, Clone, PartialEq)]
pub enum Strip {
    /// A band cropped out of a source page
    Content(CropWindow),
    /// Blank space
    Gap(f32),
}

impl Strip {
    /// Height in points.
    pub fn height(&self) -> f32 {
        match self {
            Strip::Content(window) => window.height(),
            Strip::Gap(height) => *height,
        }
    }

    /// Whether this strip draws nothing.
    pub fn is_gap(&self) -> bool {
        matches!(self, Strip::Gap(_))
    }

    /// The crop window, for content strips.
    pub fn window(&self) -> Option<&CropWindow> {
        match self {
            Strip::Content(window) => Some(window),
            Strip::Gap(_) => None,
        }
    }
}

/// Build the strip sequence for a list of spans.
///
/// Each page a span covers contributes one content strip: the first page is
/// cropped from just above the header, continuation pages skip the running
/// header and footer bands, and the last page ends at the span's end offset.
/// Empty or inverted crops are dropped. Every span is followed by answer
/// space, and consecutive spans are separated by the section gap.
pub fn plan_strips<D: PagedDocument + ?Sized>(
    doc: &D,
    spans: &[SectionSpan],
    options: &RenderOptions,
) -> Result<Vec<Strip>> {
    if spans.is_empty() {
        return Err(Error::NothingToRender);
    }

    let page_count = doc.page_count();
    let mut strips = Vec::new();

    for (i, span) in spans.iter().enumerate() {
        if span.start_page > span.end_page || span.end_page >= page_count {
            return Err(Error::Geometry(format!(
                "section {} covers pages {}-{} but the document has {} pages",
                span.section_id,
                span.start_page + 1,
                span.end_page + 1,
                page_count
            )));
        }

        for page in span.pages() {
            let size = doc.page_size(page)?;

            let crop_top = if page == span.start_page {
                (span.start_y - options.header_lookback).max(0.0)
            } else {
                options.running_header
            };
            let crop_bottom = if page == span.end_page {
                span.end_y.min(size.height)
            } else {
                size.height - options.running_footer
            };

            let window = CropWindow::from_top_down(page, size, crop_top, crop_bottom);
            if window.height() <= 0.0 {
                log::debug!(
                    "Skipping empty crop of page {} for section {}",
                    page + 1,
                    span.section_id
                );
                continue;
            }
            strips.push(Strip::Content(window));
        }

        strips.push(Strip::Gap(options.answer_space));
        if i + 1 < spans.len() {
            strips.push(Strip::Gap(options.section_gap));
        }
    }

    Ok(strips)
}
