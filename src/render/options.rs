//! Rendering options and configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::PageSize;

/// How question regions are reproduced in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Crop regions out of the source pages and repaginate them
    #[default]
    Geometric,
    /// Re-typeset the extracted text with an external TeX engine
    Typeset,
}

/// Options for composing the worksheet.
///
/// Distances are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Output strategy
    pub strategy: Strategy,

    /// Blank space appended after each section's question region
    pub answer_space: f32,

    /// Additional blank space between consecutive sections
    pub section_gap: f32,

    /// Top, bottom and left margin of output pages
    pub margin: f32,

    /// How far above the header line the first crop starts
    pub header_lookback: f32,

    /// Offset below which continuation pages start (skips running headers)
    pub running_header: f32,

    /// Distance from the page bottom at which continuation pages end
    pub running_footer: f32,

    /// Page size used when the source page does not declare one
    pub fallback_page_size: PageSize,

    /// Settings for the typeset strategy
    pub typeset: TypesetOptions,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the answer space after each section.
    pub fn with_answer_space(mut self, space: f32) -> Self {
        self.answer_space = space.max(0.0);
        self
    }

    /// Set the gap between sections.
    pub fn with_section_gap(mut self, gap: f32) -> Self {
        self.section_gap = gap.max(0.0);
        self
    }

    /// Set the output page margin.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    /// Set the look-back above section headers.
    pub fn with_header_lookback(mut self, lookback: f32) -> Self {
        self.header_lookback = lookback.max(0.0);
        self
    }

    /// Set the running header and footer bands skipped on continuation pages.
    pub fn with_running_bands(mut self, header: f32, footer: f32) -> Self {
        self.running_header = header.max(0.0);
        self.running_footer = footer.max(0.0);
        self
    }

    /// Set the typeset strategy settings.
    pub fn with_typeset(mut self, typeset: TypesetOptions) -> Self {
        self.typeset = typeset;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Geometric,
            answer_space: 198.0,
            section_gap: 28.0,
            margin: 36.0,
            header_lookback: 10.0,
            running_header: 50.0,
            running_footer: 40.0,
            fallback_page_size: PageSize::LETTER,
            typeset: TypesetOptions::default(),
        }
    }
}

/// Settings for re-typesetting extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypesetOptions {
    /// Engine binary name or path
    pub engine: String,

    /// Extra arguments passed to the engine before the source file
    pub engine_args: Vec<String>,

    /// Bound on each engine run
    #[serde(with = "duration_secs")]
    pub timeout: Duration,

    /// Number of sequential engine runs
    pub runs: u32,

    /// Vertical space after each question, as a TeX length
    pub question_space: String,

    /// Fail on characters with no TeX rendering instead of substituting `?`
    pub strict_encoding: bool,
}

impl TypesetOptions {
    /// Create new typeset options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine binary.
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Add an argument passed to the engine before the source file.
    pub fn with_engine_arg(mut self, arg: impl Into<String>) -> Self {
        self.engine_args.push(arg.into());
        self
    }

    /// Set the per-run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of engine runs.
    pub fn with_runs(mut self, runs: u32) -> Self {
        self.runs = runs.max(1);
        self
    }

    /// Set the space left after each question.
    pub fn with_question_space(mut self, space: impl Into<String>) -> Self {
        self.question_space = space.into();
        self
    }

    /// Fail instead of substituting unsupported characters.
    pub fn strict(mut self) -> Self {
        self.strict_encoding = true;
        self
    }
}

impl Default for TypesetOptions {
    fn default() -> Self {
        Self {
            engine: "pdflatex".to_string(),
            engine_args: Vec::new(),
            timeout: Duration::from_secs(30),
            runs: 2,
            question_space: "2.75in".to_string(),
            strict_encoding: false,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
