//! Integration tests for section analysis on generated PDFs.

mod common;

use common::{approx, build_pdf, scenario, write_pdf};
use probsheet::parser::group_words_into_lines;
use probsheet::{
    analyze_file, AnalyzeOptions, Analyzer, Error, LopdfBackend, PagedDocument, Worksheet,
};

#[test]
fn test_words_extracted_with_top_down_boxes() {
    let backend = LopdfBackend::load_bytes(&build_pdf(&scenario())).unwrap();
    assert_eq!(backend.page_count(), 3);

    let size = backend.page_size(0).unwrap();
    assert_eq!(size.width, 612.0);
    assert_eq!(size.height, 792.0);

    let words = backend.words(0).unwrap();
    let section = words.iter().find(|w| w.text == "Section").unwrap();
    assert!(approx(section.top, 100.0));
    assert!(approx(section.bottom, 112.0));
    assert!(approx(section.x0, 72.0));

    let lines = group_words_into_lines(words, 3.0);
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Section 2.1 Problems",
            "2.1.1. Solve x + 1 = 2.",
            "2.1.2. Solve 2x = 8."
        ]
    );
}

#[test]
fn test_scenario_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "book.pdf", &scenario());

    let mut sheet = Worksheet::new();
    let summaries = sheet.analyze(&path).unwrap();

    assert_eq!(
        summaries,
        vec![
            "Section 2.1 Problems  (2 questions, p.1)",
            "Section 2.2 Problems  (1 questions, p.2-3)",
        ]
    );

    let spans = sheet.spans();
    assert_eq!(spans[0].question_count, 2);
    assert_eq!(spans[1].question_count, 1);
    assert_eq!(spans[1].start_page, 1);
    assert_eq!(spans[1].end_page, 2);
    // last line "(a) at x = 0" ends at 112, plus padding
    assert!(approx(spans[1].end_y, 132.0));
}

#[test]
fn test_no_sections_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(
        dir.path(),
        "notes.pdf",
        &[vec![("Chapter 1", 100.0), ("Some prose.", 130.0)]],
    );

    let mut sheet = Worksheet::new();
    let summaries = sheet.analyze(&path).unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].contains("Section X.Y Problems"));
    assert!(sheet.spans().is_empty());

    let out = dir.path().join("out.pdf");
    assert!(matches!(sheet.render(&out, "t"), Err(Error::NothingToRender)));
    assert!(!out.exists());

    assert!(matches!(analyze_file(&path), Err(Error::NoSectionsFound)));
}

#[test]
fn test_spans_ordered_and_clamped() {
    let pages = vec![
        vec![
            ("Section 1.1 Problems", 100.0),
            ("1.1.1. First", 130.0),
            ("1.1.2. Second", 160.0),
            ("Section 1.2 Problems", 185.0),
            ("1.2.1. Third", 215.0),
        ],
        vec![("Section 1.3 Problems", 100.0), ("1.3.1. Fourth", 130.0)],
    ];
    let backend = LopdfBackend::load_bytes(&build_pdf(&pages)).unwrap();
    let spans = Analyzer::default().analyze(&backend).unwrap();

    assert_eq!(spans.len(), 3);
    for pair in spans.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!((a.start_page, a.start_y) < (b.start_page, b.start_y));
        if a.end_page == b.start_page {
            assert!(a.end_y < b.start_y);
        }
    }
    for span in &spans {
        assert!(span.end_page >= span.start_page);
    }
    // 1.1.2 ends at 172; padding would reach 192 but the next header is at 185
    assert!(approx(spans[0].end_y, 184.0));
}

#[test]
fn test_analysis_is_idempotent() {
    let bytes = build_pdf(&scenario());
    let analyzer = Analyzer::new(AnalyzeOptions::default());

    let first = analyzer
        .analyze(&LopdfBackend::load_bytes(&bytes).unwrap())
        .unwrap();
    let second = analyzer
        .analyze(&LopdfBackend::load_bytes(&bytes).unwrap())
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_reanalysis_replaces_spans() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_pdf(dir.path(), "book.pdf", &scenario());
    let other = write_pdf(
        dir.path(),
        "other.pdf",
        &[vec![("Section 9.1 Problems", 100.0), ("9.1.1. Only", 130.0)]],
    );

    let mut sheet = Worksheet::new();
    sheet.analyze(&book).unwrap();
    assert_eq!(sheet.spans().len(), 2);

    sheet.analyze(&other).unwrap();
    assert_eq!(sheet.spans().len(), 1);
    assert_eq!(sheet.spans()[0].section_id, "9.1");
}

#[test]
fn test_failed_analysis_keeps_previous_spans() {
    let dir = tempfile::tempdir().unwrap();
    let book = write_pdf(dir.path(), "book.pdf", &scenario());
    let garbage = dir.path().join("garbage.pdf");
    std::fs::write(&garbage, b"this is not a pdf").unwrap();

    let mut sheet = Worksheet::new();
    sheet.analyze(&book).unwrap();

    let err = sheet.analyze(&garbage).unwrap_err();
    assert!(matches!(err, Error::UnknownFormat));
    assert_eq!(sheet.spans().len(), 2);
    assert_eq!(sheet.source(), Some(book.as_path()));
}

#[test]
fn test_missing_file() {
    let err = analyze_file("/nonexistent/dir/book.pdf").unwrap_err();
    assert!(matches!(err, Error::Input { .. }));
    assert_eq!(err.category(), "input");
}

#[test]
fn test_continuation_limit_option() {
    let pages = vec![vec![
        ("Section 5.1 Problems", 100.0),
        ("5.1.1. Short question", 130.0),
        ("Further reading", 400.0),
    ]];
    let bytes = build_pdf(&pages);

    let unbounded = Analyzer::default()
        .analyze(&LopdfBackend::load_bytes(&bytes).unwrap())
        .unwrap();
    assert!(approx(unbounded[0].end_y, 432.0));

    let capped = Analyzer::new(AnalyzeOptions::new().with_continuation_limit(30.0))
        .analyze(&LopdfBackend::load_bytes(&bytes).unwrap())
        .unwrap();
    assert!(approx(capped[0].end_y, 162.0));
}

#[test]
fn test_spans_serialize_to_json() {
    let backend = LopdfBackend::load_bytes(&build_pdf(&scenario())).unwrap();
    let spans = Analyzer::default().analyze(&backend).unwrap();

    let json = serde_json::to_string(&spans).unwrap();
    assert!(json.contains("\"section_id\":\"2.1\""));
    assert!(json.contains("\"question_count\":2"));
}
