//! Shared fixtures: small PDFs built in-process with lopdf.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Font size used for every fixture line.
pub const FONT_SIZE: f32 = 12.0;

/// One page: lines of text with the top-down offset of each line's top.
pub type PageLines = Vec<(&'static str, f32)>;

/// Three pages: Section 2.1 with two questions on page 1, Section 2.2 on
/// page 2 whose only question sits on page 3 with a continuation line.
pub fn scenario() -> Vec<PageLines> {
    vec![
        vec![
            ("Section 2.1 Problems", 100.0),
            ("2.1.1. Solve x + 1 = 2.", 150.0),
            ("2.1.2. Solve 2x = 8.", 200.0),
        ],
        vec![
            ("Section 2.2 Problems", 100.0),
            ("Use the product rule below.", 130.0),
        ],
        vec![
            ("2.2.1. Differentiate f(x) = x sin x.", 80.0),
            ("(a) at x = 0", 100.0),
        ],
    ]
}

/// Build a letter-size PDF with one Helvetica text line per entry.
pub fn build_pdf(pages: &[PageLines]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (text, top) in lines {
            // baseline sits 0.8 em below the line top
            let baseline = 792.0 - top - FONT_SIZE * 0.8;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
            operations.push(Operation::new("Td", vec![72.into(), baseline.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Write a fixture PDF into `dir` and return its path.
pub fn write_pdf(dir: &Path, name: &str, pages: &[PageLines]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages)).unwrap();
    path
}

/// Approximate float comparison for extracted geometry.
pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.05
}
