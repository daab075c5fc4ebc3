//! Model types shared by the analyzer and the compositor.
//!
//! Text geometry ([`Word`], [`Line`]) is expressed in top-down page
//! coordinates, the way extraction reports it. Crop windows carry the
//! bottom-up coordinates the PDF page model needs; the conversion between
//! the two lives in [`geometry::to_pdf_y`] and nowhere else.

pub mod geometry;
mod section;
mod text;

pub use geometry::{to_pdf_y, CropWindow, PageSize};
pub use section::{SectionSpan, SectionSummary};
pub use text::{Line, Word};
