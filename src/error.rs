//! Error types for probsheet.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for probsheet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while analyzing or rendering a worksheet.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source file is missing or cannot be opened.
    #[error("Cannot read source document {}: {reason}", path.display())]
    Input {
        /// Path that was requested
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// A detection pattern could not be compiled.
    #[error("Invalid detection pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// No "Section X.Y Problems" header was found anywhere in the document.
    #[error("No pages with 'Section X.Y Problems' found")]
    NoSectionsFound,

    /// Render was requested without a successful, non-empty analysis.
    #[error("No questions to generate; analyze a document with problem sections first")]
    NothingToRender,

    /// Page dimensions or page references are unusable.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// The typesetting engine is not installed or not on PATH.
    #[error("Typesetting engine '{0}' was not found")]
    ExternalToolMissing(String),

    /// The typesetting engine ran but did not produce a document.
    #[error("Typesetting engine failed: {summary}")]
    ExternalToolFailure {
        /// Short description of the failure
        summary: String,
        /// First diagnostic lines reported by the engine
        diagnostics: Vec<String>,
    },

    /// Content contains characters the output pipeline cannot represent.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The typesetting engine exceeded its time bound.
    #[error("Typesetting engine '{engine}' timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Engine binary that was killed
        engine: String,
        /// The bound that was exceeded
        timeout: Duration,
    },
}

impl Error {
    /// Short category label for user-facing reports.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Io(_)
            | Error::Input { .. }
            | Error::UnknownFormat
            | Error::PdfParse(_)
            | Error::Encrypted => "input",
            Error::Pattern(_) => "pattern",
            Error::NoSectionsFound => "no sections",
            Error::NothingToRender => "nothing to render",
            Error::Geometry(_) => "geometry",
            Error::ExternalToolMissing(_) => "missing tool",
            Error::ExternalToolFailure { .. } => "tool failure",
            Error::Encoding(_) => "encoding",
            Error::Timeout { .. } => "timeout",
        }
    }

    /// Actionable hint for the user, when the cause is something they can fix.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::ExternalToolMissing(engine) => Some(format!(
                "install a TeX distribution that provides '{}' (TeX Live: apt install texlive-latex-extra, \
                 macOS: brew install --cask mactex-no-gui, Windows: MiKTeX) or use the geometric strategy",
                engine
            )),
            Error::ExternalToolFailure { diagnostics, .. } if !diagnostics.is_empty() => {
                Some(format!("engine reported: {}", diagnostics.join(" | ")))
            }
            Error::Timeout { .. } => {
                Some("raise the timeout or check the engine is not waiting for input".to_string())
            }
            Error::Encrypted => Some("decrypt the PDF first (e.g. qpdf --decrypt)".to_string()),
            Error::UnknownFormat | Error::Input { .. } => {
                Some("check the path points to a readable PDF file".to_string())
            }
            Error::NothingToRender | Error::NoSectionsFound => Some(
                "the document needs headers of the form 'Section 2.1 Problems'".to_string(),
            ),
            Error::Encoding(_) => {
                Some("disable strict encoding to substitute unsupported characters".to_string())
            }
            _ => None,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
