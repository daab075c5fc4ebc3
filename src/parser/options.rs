//! Analysis options and configuration.

use serde::{Deserialize, Serialize};

/// Options controlling section and question detection.
///
/// Distances are in points, measured top-down from the page top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    /// Vertical band within which words merge into one line
    pub line_tolerance: f32,

    /// Lines starting above this offset are treated as running headers
    pub header_band: f32,

    /// Lines ending within this distance of the page bottom are treated as footers
    pub footer_band: f32,

    /// Extra space kept below the last question of a section
    pub end_padding: f32,

    /// Maximum gap between the last question content and a continuation line.
    /// `None` lets continuation lines extend a question without limit.
    pub continuation_limit: Option<f32>,

    /// Minimum distance kept between a section's end and the next header
    /// when both fall on the same page
    pub boundary_gap: f32,
}

impl AnalyzeOptions {
    /// Create new analyze options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the line clustering tolerance.
    pub fn with_line_tolerance(mut self, tolerance: f32) -> Self {
        self.line_tolerance = tolerance.max(0.1);
        self
    }

    /// Set the running header and footer exclusion bands.
    pub fn with_margin_bands(mut self, header: f32, footer: f32) -> Self {
        self.header_band = header.max(0.0);
        self.footer_band = footer.max(0.0);
        self
    }

    /// Set the padding added below the last question.
    pub fn with_end_padding(mut self, padding: f32) -> Self {
        self.end_padding = padding.max(0.0);
        self
    }

    /// Cap how far continuation lines may extend a question.
    pub fn with_continuation_limit(mut self, limit: f32) -> Self {
        self.continuation_limit = Some(limit.max(0.0));
        self
    }

    /// Let continuation lines extend a question without limit.
    pub fn unbounded_continuation(mut self) -> Self {
        self.continuation_limit = None;
        self
    }

    /// Set the gap kept before the next section header.
    pub fn with_boundary_gap(mut self, gap: f32) -> Self {
        self.boundary_gap = gap.max(0.01);
        self
    }
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            line_tolerance: 3.0,
            header_band: 50.0,
            footer_band: 40.0,
            end_padding: 20.0,
            continuation_limit: None,
            boundary_gap: 1.0,
        }
    }
}
