//! Re-typesetting of question text with an external TeX engine.
//!
//! Instead of cropping page regions, this path pulls the text of every
//! question out of the source, converts it to LaTeX, and compiles a fresh
//! document with a fixed amount of space after each question.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::model::SectionSpan;
use crate::parser::{Analyzer, PagedDocument};

use super::options::TypesetOptions;
use super::output::copy_atomically;

/// Separator placed between pages in the extracted text.
pub const PAGE_BREAK: char = '\x0c';

/// Job name of the generated document inside the scratch directory.
const JOB_NAME: &str = "worksheet";

/// How often a running engine is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Number of engine diagnostic lines carried in a failure.
const MAX_DIAGNOSTICS: usize = 6;

/// Characters with a direct LaTeX rendering.
const SYMBOLS: &[(char, &str)] = &[
    ('≤', r"$\leq$"),
    ('≥', r"$\geq$"),
    ('≠', r"$\neq$"),
    ('≈', r"$\approx$"),
    ('±', r"$\pm$"),
    ('∓', r"$\mp$"),
    ('×', r"$\times$"),
    ('÷', r"$\div$"),
    ('·', r"$\cdot$"),
    ('√', r"$\surd$"),
    ('∞', r"$\infty$"),
    ('∑', r"$\sum$"),
    ('∏', r"$\prod$"),
    ('∫', r"$\int$"),
    ('∂', r"$\partial$"),
    ('∇', r"$\nabla$"),
    ('→', r"$\rightarrow$"),
    ('←', r"$\leftarrow$"),
    ('↔', r"$\leftrightarrow$"),
    ('⇒', r"$\Rightarrow$"),
    ('⇔', r"$\Leftrightarrow$"),
    ('∈', r"$\in$"),
    ('∉', r"$\notin$"),
    ('⊂', r"$\subset$"),
    ('⊆', r"$\subseteq$"),
    ('∪', r"$\cup$"),
    ('∩', r"$\cap$"),
    ('∅', r"$\emptyset$"),
    ('∀', r"$\forall$"),
    ('∃', r"$\exists$"),
    ('°', r"$^\circ$"),
    ('²', r"$^2$"),
    ('³', r"$^3$"),
    ('′', r"$'$"),
    ('−', "-"),
    ('–', "--"),
    ('—', "---"),
    ('‘', "`"),
    ('’', "'"),
    ('“', "``"),
    ('”', "''"),
    ('…', r"\ldots{}"),
    ('•', r"$\bullet$"),
    ('α', r"$\alpha$"),
    ('β', r"$\beta$"),
    ('γ', r"$\gamma$"),
    ('δ', r"$\delta$"),
    ('ε', r"$\epsilon$"),
    ('ζ', r"$\zeta$"),
    ('η', r"$\eta$"),
    ('θ', r"$\theta$"),
    ('λ', r"$\lambda$"),
    ('μ', r"$\mu$"),
    ('π', r"$\pi$"),
    ('ρ', r"$\rho$"),
    ('σ', r"$\sigma$"),
    ('τ', r"$\tau$"),
    ('φ', r"$\phi$"),
    ('χ', r"$\chi$"),
    ('ψ', r"$\psi$"),
    ('ω', r"$\omega$"),
    ('Γ', r"$\Gamma$"),
    ('Δ', r"$\Delta$"),
    ('Θ', r"$\Theta$"),
    ('Λ', r"$\Lambda$"),
    ('Π', r"$\Pi$"),
    ('Σ', r"$\Sigma$"),
    ('Φ', r"$\Phi$"),
    ('Ψ', r"$\Psi$"),
    ('Ω', r"$\Omega$"),
];

/// Text of one section, split into questions.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionText {
    /// Header line
    pub title: String,
    /// Section number
    pub section_id: String,
    /// Question texts in order, whitespace collapsed
    pub questions: Vec<String>,
}

/// Pull the question text of every span out of the document.
///
/// The document text is rebuilt page by page (lines joined by newlines,
/// pages separated by [`PAGE_BREAK`]). A section runs from its header line
/// to the next header, or to the first run of two or more page breaks,
/// whichever comes first. Running headers and footers are left out.
pub fn collect_sections<D: PagedDocument + ?Sized>(
    doc: &D,
    analyzer: &Analyzer,
    spans: &[SectionSpan],
) -> Result<Vec<SectionText>> {
    let bands = analyzer.options();
    let mut text = String::new();
    let mut header_at: Vec<Option<(usize, usize)>> = vec![None; spans.len()];

    for page in 0..doc.page_count() {
        if page > 0 {
            text.push(PAGE_BREAK);
        }
        let height = doc.page_size(page)?.height;
        let lines = analyzer.page_lines(doc, page)?;

        let mut first = true;
        for line in lines {
            let headers: Vec<usize> = spans
                .iter()
                .enumerate()
                .filter(|(i, s)| {
                    header_at[*i].is_none()
                        && s.start_page == page
                        && (s.start_y - line.top).abs() < 0.01
                })
                .map(|(i, _)| i)
                .collect();

            let in_band =
                line.top < bands.header_band || line.bottom > height - bands.footer_band;
            if headers.is_empty() && in_band {
                continue;
            }

            if !first {
                text.push('\n');
            }
            first = false;
            let start = text.len();
            text.push_str(&line.text);
            for i in headers {
                header_at[i] = Some((start, text.len()));
            }
        }
    }

    let double_break = Regex::new(r"\x0c\s*\x0c")?;
    let mut sections = Vec::with_capacity(spans.len());

    for (i, span) in spans.iter().enumerate() {
        let (_, body_start) = header_at[i].ok_or_else(|| {
            Error::Geometry(format!(
                "header of section {} not found on page {}",
                span.section_id,
                span.start_page + 1
            ))
        })?;

        let mut body_end = header_at
            .get(i + 1)
            .copied()
            .flatten()
            .map(|(start, _)| start.max(body_start))
            .unwrap_or(text.len());
        if let Some(m) = double_break.find(&text[body_start..body_end]) {
            body_end = body_start + m.start();
        }

        let questions = split_questions(&text[body_start..body_end], &span.section_id)?;
        log::debug!(
            "Section {}: {} questions extracted as text",
            span.section_id,
            questions.len()
        );
        sections.push(SectionText {
            title: span.title.clone(),
            section_id: span.section_id.clone(),
            questions,
        });
    }

    Ok(sections)
}

/// Split section text at question-number markers (`<id>.<n>`).
///
/// Text before the first marker is introductory and dropped.
pub fn split_questions(body: &str, section_id: &str) -> Result<Vec<String>> {
    let marker = Regex::new(&format!(r"\b{}\.\d+", regex::escape(section_id)))?;
    let starts: Vec<usize> = marker.find_iter(body).map(|m| m.start()).collect();

    let questions = starts
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = starts.get(i + 1).copied().unwrap_or(body.len());
            collapse_whitespace(&body[*start..end])
        })
        .filter(|q| !q.is_empty())
        .collect();
    Ok(questions)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert plain text to LaTeX source.
///
/// Specials are escaped and known symbols translated. Accented letters fall
/// back to their base letter. Anything else becomes `?`, or an
/// [`Error::Encoding`] when `strict` is set.
pub fn to_latex(text: &str, strict: bool) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut substituted = 0usize;

    for c in text.nfc() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' | '}' | '$' | '&' | '#' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str(r"\^{}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '<' => out.push_str(r"\textless{}"),
            '>' => out.push_str(r"\textgreater{}"),
            PAGE_BREAK => out.push(' '),
            c if c.is_ascii() => out.push(c),
            c if is_combining_mark(c) => {}
            c => {
                if let Some((_, latex)) = SYMBOLS.iter().find(|(symbol, _)| *symbol == c) {
                    out.push_str(latex);
                } else if let Some(base) = ascii_base(c) {
                    out.push_str(&base);
                } else if strict {
                    return Err(Error::Encoding(format!(
                        "character '{}' (U+{:04X}) has no LaTeX rendering",
                        c, c as u32
                    )));
                } else {
                    substituted += 1;
                    out.push('?');
                }
            }
        }
    }

    if substituted > 0 {
        log::warn!("Substituted {} unsupported characters with '?'", substituted);
    }
    Ok(out)
}

/// ASCII letters left after stripping accents, e.g. `é` to `e`.
fn ascii_base(c: char) -> Option<String> {
    let decomposed: Vec<char> = std::iter::once(c).nfkd().collect();
    if decomposed
        .iter()
        .all(|d| d.is_ascii_alphanumeric() || is_combining_mark(*d))
    {
        let base: String = decomposed.into_iter().filter(char::is_ascii).collect();
        if !base.is_empty() {
            return Some(base);
        }
    }
    None
}

/// Build the LaTeX document for a set of sections.
pub fn latex_document(
    title: &str,
    sections: &[SectionText],
    options: &TypesetOptions,
) -> Result<String> {
    let mut doc = String::new();
    doc.push_str("\\documentclass[11pt]{article}\n");
    doc.push_str("\\usepackage[margin=1in]{geometry}\n");
    doc.push_str("\\usepackage{amsmath,amssymb}\n");
    doc.push_str("\\setlength{\\parindent}{0pt}\n");
    doc.push_str("\\pagestyle{plain}\n");
    doc.push_str("\\begin{document}\n\n");
    doc.push_str(&format!(
        "\\begin{{center}}{{\\Large\\bfseries {}}}\\end{{center}}\n\n",
        to_latex(title, options.strict_encoding)?
    ));

    for section in sections {
        doc.push_str(&format!(
            "\\section*{{{}}}\n\n",
            to_latex(&section.title, options.strict_encoding)?
        ));
        for question in &section.questions {
            doc.push_str(&to_latex(question, options.strict_encoding)?);
            doc.push_str(&format!("\n\n\\vspace{{{}}}\n\n", options.question_space));
        }
    }

    doc.push_str("\\end{document}\n");
    Ok(doc)
}

/// Compile LaTeX source and move the resulting PDF to `output`.
///
/// The source is compiled in a scratch directory that is removed afterwards.
/// On failure the source is kept as `<output stem>_debug.tex` next to the
/// output path, and the output path itself is left untouched.
pub fn compile(source: &str, output: &Path, options: &TypesetOptions) -> Result<()> {
    let scratch = tempfile::Builder::new().prefix("probsheet-").tempdir()?;
    let tex_path = scratch.path().join(format!("{}.tex", JOB_NAME));
    fs::write(&tex_path, source)?;

    let result = run_engine_passes(scratch.path(), options)
        .and_then(|pdf| copy_atomically(&pdf, output));

    if let Err(ref e) = result {
        let debug_path = debug_tex_path(output);
        match fs::write(&debug_path, source) {
            Ok(()) => log::warn!("{}; LaTeX source kept at {}", e, debug_path.display()),
            Err(io_err) => log::warn!("Could not keep LaTeX source: {}", io_err),
        }
    }
    result
}

/// Path where the LaTeX source is kept after a failed compile.
pub fn debug_tex_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| JOB_NAME.to_string());
    output.with_file_name(format!("{}_debug.tex", stem))
}

fn run_engine_passes(dir: &Path, options: &TypesetOptions) -> Result<PathBuf> {
    for pass in 1..=options.runs.max(1) {
        log::info!("Running {} (pass {})", options.engine, pass);
        let status = run_engine(dir, options)?;
        if !status.success() {
            log::warn!("{} exited with {}", options.engine, status);
        }
    }

    let pdf = dir.join(format!("{}.pdf", JOB_NAME));
    if pdf.is_file() {
        return Ok(pdf);
    }

    Err(Error::ExternalToolFailure {
        summary: format!("{} produced no PDF", options.engine),
        diagnostics: read_diagnostics(&dir.join(format!("{}.log", JOB_NAME))),
    })
}

fn run_engine(dir: &Path, options: &TypesetOptions) -> Result<ExitStatus> {
    let mut child = Command::new(&options.engine)
        .args(&options.engine_args)
        .arg("-interaction=nonstopmode")
        .arg("-halt-on-error")
        .arg(format!("{}.tex", JOB_NAME))
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ExternalToolMissing(options.engine.clone()),
            _ => Error::Io(e),
        })?;

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if started.elapsed() >= options.timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout {
                engine: options.engine.clone(),
                timeout: options.timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Error lines from a TeX log (`! ...` and the `l.N` context after them).
fn read_diagnostics(log_path: &Path) -> Vec<String> {
    let Ok(bytes) = fs::read(log_path) else {
        return Vec::new();
    };
    String::from_utf8_lossy(&bytes)
        .lines()
        .filter(|l| l.starts_with('!') || l.starts_with("l."))
        .take(MAX_DIAGNOSTICS)
        .map(|l| l.trim_end().to_string())
        .collect()
}
