//! Error types for searchpdf.

use std::io;
use thiserror::Error;

use crate::pipeline::PageState;

/// Result type alias for searchpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while adding an OCR text layer.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// Opening, reading or saving a PDF document failed.
    #[error("Document error: {0}")]
    Document(String),

    /// Page view acquisition, image allocation or drawing failed.
    #[error("Render error: {0}")]
    Render(String),

    /// The OCR engine could not process the image.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// The requested language model is not installed.
    #[error("OCR error: language '{language}' is not installed (available: {})", installed.join(", "))]
    LanguageUnavailable {
        language: String,
        installed: Vec<String>,
    },

    /// Degenerate or non-finite overlay transform.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Form creation or content append failed.
    #[error("Composite error: {0}")]
    Composite(String),

    /// Invalid caller input (options, paths, language codes).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Page index is out of range.
    #[error("Page index {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// A page-scoped failure, naming the page and the last state it reached.
    #[error("page {index} failed after {state}: {source}")]
    Page {
        index: usize,
        state: PageState,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error with the page it happened on.
    pub fn on_page(self, index: usize, state: PageState) -> Self {
        Error::Page {
            index,
            state,
            source: Box::new(self),
        }
    }

    /// The originating error, looking through page wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Page { source, .. } => source.root(),
            other => other,
        }
    }

    /// Zero-based index of the page the failure is scoped to, if any.
    pub fn page_index(&self) -> Option<usize> {
        match self {
            Error::Page { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Whether the root cause came from the OCR engine.
    pub fn is_ocr(&self) -> bool {
        matches!(
            self.root(),
            Error::Ocr(_) | Error::LanguageUnavailable { .. }
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Document(err.to_string()),
        }
    }
}
