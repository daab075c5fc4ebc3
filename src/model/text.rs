//! Positioned text: words as extracted, and lines rebuilt from them.

use serde::{Deserialize, Serialize};

/// A word (or run of glyphs) with its bounding box in top-down coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// The text content
    pub text: String,
    /// Left edge
    pub x0: f32,
    /// Distance from the page top to the top of the box
    pub top: f32,
    /// Distance from the page top to the bottom of the box
    pub bottom: f32,
}

impl Word {
    /// Create a new word.
    pub fn new(text: impl Into<String>, x0: f32, top: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            x0,
            top,
            bottom,
        }
    }
}

/// A reconstructed text line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Word texts joined by single spaces, left to right
    pub text: String,
    /// Topmost word top
    pub top: f32,
    /// Lowest word bottom
    pub bottom: f32,
}

impl Line {
    /// Start a line from its first word.
    pub(crate) fn start(word: Word) -> Self {
        Self {
            text: word.text,
            top: word.top,
            bottom: word.bottom,
        }
    }

    /// Append a word to the right of the line and grow the extent.
    pub(crate) fn push(&mut self, word: Word) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(&word.text);
        self.top = self.top.min(word.top);
        self.bottom = self.bottom.max(word.bottom);
    }

    /// Line height in points.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}
