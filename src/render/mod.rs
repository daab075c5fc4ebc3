//! Worksheet composition.
//!
//! Two strategies turn analyzed [`SectionSpan`]s into an output PDF:
//! [`Strategy::Geometric`] crops question regions out of the source pages and
//! repaginates them with answer space, [`Strategy::Typeset`] re-typesets the
//! extracted question text with a TeX engine.

mod compose;
mod options;
mod output;
mod paginate;
mod strip;
pub mod typeset;

pub use compose::compose;
pub use options::{RenderOptions, Strategy, TypesetOptions};
pub use output::{copy_atomically, write_atomically};
pub use paginate::{paginate, OutputPage, PlacedStrip};
pub use strip::{plan_strips, Strip};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::SectionSpan;
use crate::parser::{Analyzer, LopdfBackend, PagedDocument};

/// Outcome of a successful render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    /// Where the worksheet was written
    pub output: PathBuf,
    /// Strategy that produced it
    pub strategy: Strategy,
    /// Sections included
    pub section_count: usize,
    /// Output pages, when known (the typeset engine does its own pagination)
    pub page_count: Option<usize>,
    /// Cropped regions placed (geometric strategy only)
    pub region_count: usize,
}

/// Crop question regions and repaginate them into `output`.
pub fn render_geometric(
    source: LopdfBackend,
    spans: &[SectionSpan],
    title: &str,
    output: &Path,
    options: &RenderOptions,
) -> Result<RenderReport> {
    let first = spans.first().ok_or(Error::NothingToRender)?;
    let page_size = source.page_size(first.start_page)?;

    let strips = plan_strips(&source, spans, options)?;
    let pages = paginate(strips, page_size, options.margin)?;
    if pages.is_empty() {
        return Err(Error::NothingToRender);
    }
    let region_count = pages.iter().map(OutputPage::content_count).sum();

    let mut doc = compose(source, &pages, title, options)?;
    write_atomically(output, |mut w| {
        doc.save_to(&mut w)?;
        Ok(())
    })?;

    log::info!(
        "Wrote {} pages ({} regions) to {}",
        pages.len(),
        region_count,
        output.display()
    );
    Ok(RenderReport {
        output: output.to_path_buf(),
        strategy: Strategy::Geometric,
        section_count: spans.len(),
        page_count: Some(pages.len()),
        region_count,
    })
}

/// Re-typeset the question text of every span into `output`.
pub fn render_typeset<D: PagedDocument + ?Sized>(
    source: &D,
    analyzer: &Analyzer,
    spans: &[SectionSpan],
    title: &str,
    output: &Path,
    options: &RenderOptions,
) -> Result<RenderReport> {
    if spans.is_empty() {
        return Err(Error::NothingToRender);
    }

    let sections = typeset::collect_sections(source, analyzer, spans)?;
    let latex = typeset::latex_document(title, &sections, &options.typeset)?;
    typeset::compile(&latex, output, &options.typeset)?;

    log::info!("Typeset {} sections to {}", sections.len(), output.display());
    Ok(RenderReport {
        output: output.to_path_buf(),
        strategy: Strategy::Typeset,
        section_count: spans.len(),
        page_count: None,
        region_count: 0,
    })
}
