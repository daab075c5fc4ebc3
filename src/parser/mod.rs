//! Layout analysis: page text extraction, line reconstruction, and section
//! detection.

mod analyzer;
mod backend;
mod lines;
mod options;
mod words;

pub use analyzer::{Analyzer, SECTION_PATTERN};
pub use backend::{InMemoryDocument, LopdfBackend, PagedDocument};
pub use lines::group_words_into_lines;
pub use options::AnalyzeOptions;
pub use words::{WordExtractor, DEFAULT_X_TOLERANCE};

pub(crate) use backend::get_number;
