//! Output document assembly with lopdf.
//!
//! Every source page that contributes a strip is wrapped once as a Form
//! XObject. Output pages draw those forms translated into place and clipped
//! to the strip's crop window, so source content (fonts, images, vector
//! graphics) is reused without being re-encoded.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{
    dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream, StringFormat,
};

use crate::error::Result;
use crate::model::PageSize;
use crate::parser::{LopdfBackend, PagedDocument};

use super::options::RenderOptions;
use super::paginate::OutputPage;

/// Value written to the Info dictionary's Producer entry.
const PRODUCER: &str = concat!("probsheet ", env!("CARGO_PKG_VERSION"));

/// A source page captured for reuse.
struct SourcePage {
    index: usize,
    size: PageSize,
    content: Vec<u8>,
    resources: Option<Object>,
}

/// Build the output document from paginated strips.
///
/// Consumes the source so its objects (fonts, images) can be shared by the
/// output without copying; objects only the discarded source pages used are
/// pruned at the end.
pub fn compose(
    source: LopdfBackend,
    pages: &[OutputPage],
    title: &str,
    options: &RenderOptions,
) -> Result<LopdfDocument> {
    let referenced: BTreeSet<usize> = pages
        .iter()
        .flat_map(|p| p.strips())
        .filter_map(|s| s.strip.window())
        .map(|w| w.page)
        .collect();

    let mut captured = Vec::with_capacity(referenced.len());
    for index in referenced {
        let page_id = source.page_id(index)?;
        captured.push(SourcePage {
            index,
            size: source.page_size(index)?,
            content: source.page_content(page_id)?,
            resources: source.page_resources(page_id),
        });
    }

    let mut doc = source.into_document();

    let mut forms: BTreeMap<usize, (Vec<u8>, ObjectId)> = BTreeMap::new();
    for page in captured {
        let id = doc.add_object(form_xobject(&page)?);
        forms.insert(page.index, (format!("P{}", page.index + 1).into_bytes(), id));
    }

    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let page_id = add_output_page(&mut doc, pages_id, page, &forms, options.margin)?;
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Producer" => Object::string_literal(PRODUCER),
        "CreationDate" => Object::string_literal(pdf_date()),
    });

    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.trailer.remove(b"Prev");
    doc.trailer.remove(b"XRefStm");
    doc.trailer.remove(b"Encrypt");

    let pruned = doc.prune_objects();
    log::debug!(
        "Composed {} pages from {} source pages, pruned {} objects",
        count,
        forms.len(),
        pruned.len()
    );

    Ok(doc)
}

fn form_xobject(page: &SourcePage) -> Result<Stream> {
    let resources = page
        .resources
        .clone()
        .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![0.into(), 0.into(), page.size.width.into(), page.size.height.into()],
        "Resources" => resources,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, deflate(&page.content)?))
}

fn add_output_page(
    doc: &mut LopdfDocument,
    parent: ObjectId,
    page: &OutputPage,
    forms: &BTreeMap<usize, (Vec<u8>, ObjectId)>,
    margin: f32,
) -> Result<ObjectId> {
    let mut operations = Vec::new();
    let mut xobjects = Dictionary::new();

    for placed in page.strips() {
        let Some(window) = placed.strip.window() else {
            continue;
        };
        let Some((name, form_id)) = forms.get(&window.page) else {
            continue;
        };

        let ty = placed.dest_bottom - window.lower;
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), margin.into(), ty.into()],
        ));
        operations.push(Operation::new(
            "re",
            vec![
                0.into(),
                window.lower.into(),
                window.page_size.width.into(),
                placed.height.into(),
            ],
        ));
        operations.push(Operation::new("W", vec![]));
        operations.push(Operation::new("n", vec![]));
        operations.push(Operation::new("Do", vec![Object::Name(name.clone())]));
        operations.push(Operation::new("Q", vec![]));

        xobjects.set(name.clone(), *form_id);
    }

    let encoded = Content { operations }.encode()?;
    let content_id = doc.add_object(Stream::new(
        dictionary! { "Filter" => "FlateDecode" },
        deflate(&encoded)?,
    ));

    let size = page.size();
    let page_dict = dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "MediaBox" => vec![0.into(), 0.into(), size.width.into(), size.height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => xobjects },
    };
    Ok(doc.add_object(page_dict))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// PDF text string: literal for ASCII, UTF-16BE with byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn pdf_date() -> String {
    chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string()
}
