//! PDF backend abstraction layer.
//!
//! The analyzer only needs page sizes and positioned words, so it works
//! against the [`PagedDocument`] trait. [`LopdfBackend`] provides that view
//! over a real PDF and also exposes the page objects the compositor copies;
//! [`InMemoryDocument`] carries word geometry produced elsewhere.

use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::detect::check_source;
use crate::error::{Error, Result};
use crate::model::{PageSize, Word};

use super::words::{WordExtractor, DEFAULT_X_TOLERANCE};

/// Page-tree attributes may be inherited through at most this many parents.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Abstract interface for a randomly-accessible paginated document.
pub trait PagedDocument {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Dimensions of a zero-based page.
    fn page_size(&self, page: usize) -> Result<PageSize>;

    /// Words on a zero-based page, with top-down bounding boxes.
    fn words(&self, page: usize) -> Result<Vec<Word>>;
}

/// Concrete [`PagedDocument`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    page_ids: Vec<ObjectId>,
    x_tolerance: f32,
    default_size: PageSize,
}

impl LopdfBackend {
    /// Load from a file path.
    ///
    /// The header is sniffed first so that a missing file or a non-PDF is
    /// reported as an input problem rather than a parse failure.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let version = check_source(path)?;
        log::debug!("Opening {} (PDF {})", path.display(), version);

        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            log::warn!("Document declares encryption; continuing with decrypted objects");
        }
        let page_ids = doc.get_pages().into_values().collect();
        Ok(Self {
            doc,
            page_ids,
            x_tolerance: DEFAULT_X_TOLERANCE,
            default_size: PageSize::LETTER,
        })
    }

    /// Set the horizontal gap below which glyph runs merge into one word.
    pub fn with_x_tolerance(mut self, tolerance: f32) -> Self {
        self.x_tolerance = tolerance.max(0.0);
        self
    }

    /// Set the size reported for pages without a MediaBox.
    pub fn with_default_page_size(mut self, size: PageSize) -> Self {
        self.default_size = size;
        self
    }

    /// Give up the backend and take the document.
    pub fn into_document(self) -> LopdfDocument {
        self.doc
    }

    /// Object id of a zero-based page.
    pub fn page_id(&self, page: usize) -> Result<ObjectId> {
        self.page_ids.get(page).copied().ok_or_else(|| {
            Error::Geometry(format!(
                "page {} is out of range (document has {} pages)",
                page + 1,
                self.page_ids.len()
            ))
        })
    }

    /// Raw (decompressed) content of a page, all content streams concatenated.
    pub fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // A page without content is blank, not broken.
            Err(_) => return Ok(Vec::new()),
        };

        let stream_refs: Vec<ObjectId> = match self.resolve(contents) {
            Object::Array(arr) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
            _ => contents.as_reference().into_iter().collect(),
        };

        let mut content = Vec::new();
        for r in stream_refs {
            if let Ok(Object::Stream(s)) = self.doc.get_object(r) {
                let data = s
                    .decompressed_content()
                    .unwrap_or_else(|_| s.content.clone());
                content.extend_from_slice(&data);
                content.push(b'\n');
            }
        }
        Ok(content)
    }

    /// The page's resource dictionary object, following page-tree inheritance.
    ///
    /// Returned as stored (a reference or an inline dictionary) so it can be
    /// reused verbatim by objects living in a copy of the same document.
    pub fn page_resources(&self, page_id: ObjectId) -> Option<Object> {
        self.inherited(page_id, b"Resources").cloned()
    }

    /// Look up a page attribute, walking up `/Parent` links when absent.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Follow indirect references to the object they name.
    pub(crate) fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        let mut current = obj;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            match current {
                Object::Reference(r) => match self.doc.get_object(*r) {
                    Ok(next) => current = next,
                    Err(_) => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Fonts available to a page, keyed by resource name.
    pub(crate) fn page_fonts(&self, page_id: ObjectId) -> Result<Vec<(Vec<u8>, &Dictionary)>> {
        let fonts = self
            .doc
            .get_page_fonts(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;
        Ok(fonts.into_iter().collect())
    }
}

impl PagedDocument for LopdfBackend {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_size(&self, page: usize) -> Result<PageSize> {
        let page_id = self.page_id(page)?;
        let media_box = match self.inherited(page_id, b"MediaBox") {
            Some(obj) => obj,
            None => return Ok(self.default_size),
        };

        let values: Vec<f32> = match self.resolve(media_box) {
            Object::Array(arr) => arr
                .iter()
                .filter_map(|o| get_number(self.resolve(o)))
                .collect(),
            _ => Vec::new(),
        };

        match values.as_slice() {
            [x0, y0, x1, y1] => PageSize::new((x1 - x0).abs(), (y1 - y0).abs()),
            _ => Err(Error::Geometry(format!(
                "page {} has a malformed MediaBox",
                page + 1
            ))),
        }
    }

    fn words(&self, page: usize) -> Result<Vec<Word>> {
        let page_id = self.page_id(page)?;
        let size = self.page_size(page)?;
        let content = self.page_content(page_id)?;
        let fonts = self.page_fonts(page_id)?;

        WordExtractor::new(&self.doc, &fonts, size)
            .with_x_tolerance(self.x_tolerance)
            .extract(&content)
    }
}

/// Word geometry supplied by an external extractor.
///
/// Useful when text positions come from another tool, and for exercising
/// the analyzer without building PDFs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocument {
    pages: Vec<(PageSize, Vec<Word>)>,
}

impl InMemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page.
    pub fn add_page(&mut self, size: PageSize, words: Vec<Word>) {
        self.pages.push((size, words));
    }

    /// Append a page, builder style.
    pub fn with_page(mut self, size: PageSize, words: Vec<Word>) -> Self {
        self.add_page(size, words);
        self
    }
}

impl PagedDocument for InMemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<PageSize> {
        let (size, _) = self.pages.get(page).ok_or_else(|| {
            Error::Geometry(format!(
                "page {} is out of range (document has {} pages)",
                page + 1,
                self.pages.len()
            ))
        })?;
        PageSize::new(size.width, size.height)
    }

    fn words(&self, page: usize) -> Result<Vec<Word>> {
        self.pages
            .get(page)
            .map(|(_, words)| words.clone())
            .ok_or_else(|| Error::Geometry(format!("page {} is out of range", page + 1)))
    }
}

/// Helper: extract a number from a PDF object.
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_number() {
        assert_eq!(get_number(&Object::Integer(42)), Some(42.0));
        assert_eq!(get_number(&Object::Real(3.5)), Some(3.5));
        assert_eq!(get_number(&Object::Null), None);
    }

    #[test]
    fn test_in_memory_document() {
        let doc = InMemoryDocument::new()
            .with_page(PageSize::LETTER, vec![Word::new("hello", 72.0, 100.0, 110.0)]);

        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_size(0).unwrap(), PageSize::LETTER);
        assert_eq!(doc.words(0).unwrap().len(), 1);
        assert!(matches!(doc.page_size(1), Err(Error::Geometry(_))));
    }

    #[test]
    fn test_in_memory_rejects_bad_geometry() {
        let doc = InMemoryDocument::new().with_page(
            PageSize {
                width: 612.0,
                height: 0.0,
            },
            vec![],
        );
        assert!(matches!(doc.page_size(0), Err(Error::Geometry(_))));
    }

    #[test]
    fn test_load_bytes_rejects_garbage() {
        assert!(LopdfBackend::load_bytes(b"not a pdf").is_err());
    }
}
