//! # probsheet
//!
//! Turn a textbook PDF into a practice worksheet.
//!
//! The crate finds "Section X.Y Problems" blocks in a PDF, works out where
//! each block's numbered questions end, and builds a new PDF holding only
//! those questions with blank answer space after every section.
//!
//! ## Quick Start
//!
//! ```no_run
//! use probsheet::Worksheet;
//!
//! fn main() -> probsheet::Result<()> {
//!     let mut sheet = Worksheet::new();
//!
//!     for summary in sheet.analyze("calculus.pdf")? {
//!         println!("{}", summary);
//!     }
//!
//!     sheet.render("calculus_worksheet.pdf", "Chapter 2 Practice")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Layout analysis** ([`parser`]): words are extracted from each page's
//!   content stream, grouped into lines, and scanned in two passes for
//!   section headers and question numbers.
//! - **Composition** ([`render`]): question regions are cropped out of the
//!   source pages and repaginated with answer space, or the question text is
//!   re-typeset with a TeX engine.

pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use detect::{check_source, pdf_version};
pub use error::{Error, Result};
pub use model::{to_pdf_y, CropWindow, Line, PageSize, SectionSpan, SectionSummary, Word};
pub use parser::{AnalyzeOptions, Analyzer, InMemoryDocument, LopdfBackend, PagedDocument};
pub use render::{RenderOptions, RenderReport, Strategy, TypesetOptions};

use std::path::{Path, PathBuf};

/// Title used when the caller does not supply one.
pub const DEFAULT_TITLE: &str = "Math Worksheet";

/// Analyze a PDF file and return its section spans.
///
/// # Example
///
/// ```no_run
/// let spans = probsheet::analyze_file("calculus.pdf").unwrap();
/// for span in &spans {
///     println!("{}: {} questions", span.section_id, span.question_count);
/// }
/// ```
pub fn analyze_file<P: AsRef<Path>>(path: P) -> Result<Vec<SectionSpan>> {
    analyze_file_with_options(path, AnalyzeOptions::default())
}

/// Analyze a PDF file with custom options.
pub fn analyze_file_with_options<P: AsRef<Path>>(
    path: P,
    options: AnalyzeOptions,
) -> Result<Vec<SectionSpan>> {
    let backend = LopdfBackend::load_file(path)?;
    Analyzer::new(options).analyze(&backend)
}

/// Stateful analyze-then-render workflow.
///
/// [`Worksheet::analyze`] records the source path and the detected spans;
/// [`Worksheet::render`] builds the output from them. A new analysis
/// replaces the previous result only once it has fully succeeded.
///
/// # Example
///
/// ```no_run
/// use probsheet::{AnalyzeOptions, RenderOptions, Strategy, Worksheet};
///
/// let mut sheet = Worksheet::new()
///     .with_analyze_options(AnalyzeOptions::new().with_end_padding(30.0))
///     .with_render_options(RenderOptions::new().with_strategy(Strategy::Typeset));
/// sheet.analyze("calculus.pdf")?;
/// sheet.render("out.pdf", "Practice")?;
/// # Ok::<(), probsheet::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    analyze_options: AnalyzeOptions,
    render_options: RenderOptions,
    source: Option<PathBuf>,
    spans: Vec<SectionSpan>,
}

impl Worksheet {
    /// Create a worksheet builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysis options.
    pub fn with_analyze_options(mut self, options: AnalyzeOptions) -> Self {
        self.analyze_options = options;
        self
    }

    /// Set the render options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// Scan a PDF and return one summary line per detected section.
    ///
    /// A document without any section header is not an error: the result is
    /// a single explanatory line and no spans are kept, so a following
    /// [`render`](Self::render) fails with [`Error::NothingToRender`].
    pub fn analyze<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<String>> {
        let path = path.as_ref();
        let backend = self.open(path)?;

        match Analyzer::new(self.analyze_options.clone()).analyze(&backend) {
            Ok(spans) => {
                self.source = Some(path.to_path_buf());
                self.spans = spans;
                Ok(self.summaries().iter().map(ToString::to_string).collect())
            }
            Err(Error::NoSectionsFound) => {
                self.source = Some(path.to_path_buf());
                self.spans.clear();
                Ok(vec![format!("{}.", Error::NoSectionsFound)])
            }
            Err(e) => Err(e),
        }
    }

    /// Spans from the last successful analysis.
    pub fn spans(&self) -> &[SectionSpan] {
        &self.spans
    }

    /// Summaries of the current spans.
    pub fn summaries(&self) -> Vec<SectionSummary> {
        self.spans.iter().map(SectionSpan::summary).collect()
    }

    /// Source document of the last analysis.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Build the worksheet PDF at `output`.
    ///
    /// The source is reopened for this call. The output file is replaced
    /// atomically; on failure no partial file is left at `output`.
    pub fn render<P: AsRef<Path>>(&self, output: P, title: &str) -> Result<RenderReport> {
        let output = output.as_ref();
        let source = match self.source.as_deref() {
            Some(source) if !self.spans.is_empty() => source,
            _ => return Err(Error::NothingToRender),
        };
        let title = if title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            title
        };

        let backend = self.open(source)?;
        match self.render_options.strategy {
            Strategy::Geometric => render::render_geometric(
                backend,
                &self.spans,
                title,
                output,
                &self.render_options,
            ),
            Strategy::Typeset => render::render_typeset(
                &backend,
                &Analyzer::new(self.analyze_options.clone()),
                &self.spans,
                title,
                output,
                &self.render_options,
            ),
        }
    }

    fn open(&self, path: &Path) -> Result<LopdfBackend> {
        Ok(LopdfBackend::load_file(path)?
            .with_default_page_size(self.render_options.fallback_page_size))
    }
}
