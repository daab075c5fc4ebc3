//! Pagination of strips onto fixed-size output pages.

use crate::error::{Error, Result};
use crate::model::PageSize;

use super::strip::Strip;

/// A strip with its position on an output page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedStrip {
    /// The strip, with its crop window shortened if it had to be clamped
    pub strip: Strip,
    /// Height actually consumed on the page
    pub height: f32,
    /// Bottom edge on the output page, bottom-up
    pub dest_bottom: f32,
}

/// A sealed output page.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPage {
    size: PageSize,
    strips: Vec<PlacedStrip>,
}

impl OutputPage {
    /// Page dimensions.
    pub fn size(&self) -> PageSize {
        self.size
    }

    /// Placed strips, top to bottom.
    pub fn strips(&self) -> &[PlacedStrip] {
        &self.strips
    }

    /// Vertical space used by all strips.
    pub fn used_height(&self) -> f32 {
        self.strips.iter().map(|s| s.height).sum()
    }

    /// Number of strips that draw source content.
    pub fn content_count(&self) -> usize {
        self.strips.iter().filter(|s| !s.strip.is_gap()).count()
    }
}

/// Lay strips out top to bottom, starting a new page whenever the next strip
/// would overflow the usable height (page height minus top and bottom margin).
///
/// Strips taller than a whole page are clamped to the usable height; content
/// strips keep their top part. A final page is only produced when it holds at
/// least one strip.
pub fn paginate(strips: Vec<Strip>, size: PageSize, margin: f32) -> Result<Vec<OutputPage>> {
    let usable = size.height - 2.0 * margin;
    if usable <= 0.0 {
        return Err(Error::Geometry(format!(
            "margin {} leaves no room on a page {} points high",
            margin, size.height
        )));
    }

    let top = size.height - margin;
    let mut pages = Vec::new();
    let mut current: Vec<PlacedStrip> = Vec::new();
    let mut remaining = usable;

    for strip in strips {
        let (strip, height) = clamp_strip(strip, usable);

        if height > remaining {
            pages.push(OutputPage {
                size,
                strips: std::mem::take(&mut current),
            });
            remaining = usable;
        }

        let dest_bottom = top - (usable - remaining) - height;
        current.push(PlacedStrip {
            strip,
            height,
            dest_bottom,
        });
        remaining -= height;
    }

    if !current.is_empty() {
        pages.push(OutputPage {
            size,
            strips: current,
        });
    }

    log::debug!("Paginated into {} pages", pages.len());
    Ok(pages)
}

fn clamp_strip(strip: Strip, usable: f32) -> (Strip, f32) {
    let height = strip.height();
    if height <= usable {
        return (strip, height);
    }

    match strip {
        Strip::Content(mut window) => {
            log::warn!(
                "Region from page {} is {:.0}pt tall; keeping the top {:.0}pt",
                window.page + 1,
                height,
                usable
            );
            window.lower = window.upper - usable;
            (Strip::Content(window), usable)
        }
        Strip::Gap(_) => (Strip::Gap(usable), usable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CropWindow;

    fn content(page: usize, top: f32, bottom: f32) -> Strip {
        Strip::Content(CropWindow::from_top_down(page, PageSize::LETTER, top, bottom))
    }

    #[test]
    fn test_strips_stack_from_the_top_margin() {
        let strips = vec![content(0, 90.0, 232.0), Strip::Gap(198.0)];
        let pages = paginate(strips, PageSize::LETTER, 36.0).unwrap();

        assert_eq!(pages.len(), 1);
        let placed = pages[0].strips();
        assert_eq!(placed[0].dest_bottom, 756.0 - 142.0);
        assert_eq!(placed[1].dest_bottom, 756.0 - 142.0 - 198.0);
        assert_eq!(pages[0].content_count(), 1);
    }

    #[test]
    fn test_overflow_starts_new_page() {
        let strips = vec![
            content(0, 0.0, 400.0),
            Strip::Gap(198.0),
            content(1, 0.0, 300.0),
        ];
        let pages = paginate(strips, PageSize::LETTER, 36.0).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].used_height(), 598.0);
        assert_eq!(pages[1].strips()[0].dest_bottom, 756.0 - 300.0);
    }

    #[test]
    fn test_exact_fit_stays_on_page() {
        let strips = vec![Strip::Gap(360.0), Strip::Gap(360.0)];
        let pages = paginate(strips, PageSize::LETTER, 36.0).unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_oversized_strip_keeps_its_top() {
        let strips = vec![content(0, 10.0, 790.0)];
        let pages = paginate(strips, PageSize::LETTER, 36.0).unwrap();

        let placed = &pages[0].strips()[0];
        assert_eq!(placed.height, 720.0);
        let window = placed.strip.window().unwrap();
        assert_eq!(window.upper, 782.0);
        assert_eq!(window.height(), 720.0);
    }

    #[test]
    fn test_height_round_trip() {
        let strips = vec![
            content(0, 90.0, 232.0),
            Strip::Gap(198.0),
            Strip::Gap(28.0),
            content(1, 90.0, 752.0),
            content(2, 50.0, 132.0),
            Strip::Gap(198.0),
            Strip::Gap(900.0),
        ];
        let expected: f32 = strips.iter().map(|s| s.height().min(720.0)).sum();
        let pages = paginate(strips, PageSize::LETTER, 36.0).unwrap();
        let used: f32 = pages.iter().map(OutputPage::used_height).sum();
        assert!((expected - used).abs() < 0.001);
        assert!(pages.iter().all(|p| p.used_height() <= 720.0));
    }

    #[test]
    fn test_no_strips_no_pages() {
        assert!(paginate(Vec::new(), PageSize::LETTER, 36.0).unwrap().is_empty());
    }

    #[test]
    fn test_margin_too_large() {
        let result = paginate(vec![Strip::Gap(10.0)], PageSize::LETTER, 400.0);
        assert!(matches!(result, Err(Error::Geometry(_))));
    }
}
