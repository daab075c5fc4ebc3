//! Detected problem sections.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// One detected "Section X.Y Problems" block and the extent of its questions.
///
/// Pages are zero-based. Offsets are top-down, measured on the page they
/// belong to (`start_y` on `start_page`, `end_y` on `end_page`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpan {
    /// Section number, e.g. "2.1"
    pub section_id: String,
    /// Full header line text
    pub title: String,
    /// Page holding the header
    pub start_page: usize,
    /// Top of the header line
    pub start_y: f32,
    /// Page holding the last question content
    pub end_page: usize,
    /// Bottom of the last question content, padding included
    pub end_y: f32,
    /// Number of question-number lines found
    pub question_count: usize,
}

impl SectionSpan {
    /// Pages covered by this section.
    pub fn pages(&self) -> RangeInclusive<usize> {
        self.start_page..=self.end_page
    }

    /// Whether any numbered question was found under the header.
    pub fn has_questions(&self) -> bool {
        self.question_count > 0
    }

    /// Human-facing summary of this span.
    pub fn summary(&self) -> SectionSummary {
        SectionSummary {
            title: self.title.clone(),
            section_id: self.section_id.clone(),
            question_count: self.question_count,
            first_page: self.start_page + 1,
            last_page: self.end_page + 1,
        }
    }
}

/// Progress-display view of a [`SectionSpan`], with one-based pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    /// Full header line text
    pub title: String,
    /// Section number
    pub section_id: String,
    /// Number of questions found
    pub question_count: usize,
    /// First page, one-based
    pub first_page: usize,
    /// Last page, one-based
    pub last_page: usize,
}

impl SectionSummary {
    /// Page range label such as `p.3` or `p.3-4`.
    pub fn page_range(&self) -> String {
        if self.first_page == self.last_page {
            format!("p.{}", self.first_page)
        } else {
            format!("p.{}-{}", self.first_page, self.last_page)
        }
    }
}

impl fmt::Display for SectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  ({} questions, {})",
            self.title,
            self.question_count,
            self.page_range()
        )
    }
}
