//! Page geometry and the top-down / bottom-up coordinate conversion.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Convert a top-down offset (distance from the page top, as reported by
/// text extraction) into a bottom-up PDF y coordinate.
///
/// Every consumer that needs page-space coordinates goes through this
/// function.
#[inline]
pub fn to_pdf_y(page_height: f32, top_down_y: f32) -> f32 {
    page_height - top_down_y
}

/// Page dimensions in points (1 point = 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
}

impl PageSize {
    /// US Letter, 8.5 x 11 inches.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    /// Create a page size, rejecting non-finite or non-positive dimensions.
    pub fn new(width: f32, height: f32) -> Result<Self> {
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(Error::Geometry(format!(
                "invalid page dimensions {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::LETTER
    }
}

/// A vertical crop of one source page.
///
/// This is a value, not a modified page: it names the source page by index
/// and records the visible band in bottom-up coordinates. Several windows may
/// refer to the same page without aliasing anything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    /// Zero-based source page index
    pub page: usize,
    /// Source page dimensions
    pub page_size: PageSize,
    /// Lower edge of the visible band (bottom-up)
    pub lower: f32,
    /// Upper edge of the visible band (bottom-up)
    pub upper: f32,
}

impl CropWindow {
    /// Build a window from top-down offsets captured during analysis.
    pub fn from_top_down(
        page: usize,
        page_size: PageSize,
        crop_top: f32,
        crop_bottom: f32,
    ) -> Self {
        Self {
            page,
            page_size,
            lower: to_pdf_y(page_size.height, crop_bottom),
            upper: to_pdf_y(page_size.height, crop_top),
        }
    }

    /// Visible height in points. Zero or negative for degenerate crops.
    pub fn height(&self) -> f32 {
        self.upper - self.lower
    }

    /// Full-width rectangle `[x0, y0, x1, y1]` covering the window.
    pub fn rect(&self) -> [f32; 4] {
        [0.0, self.lower, self.page_size.width, self.upper]
    }
}
