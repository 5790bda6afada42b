//! # searchpdf
//!
//! Make scanned PDF documents searchable.
//!
//! Every page is rendered to an image, recognized by an OCR engine, and the
//! recognized text is laid over the original page as an invisible layer. The
//! visible content of the document is left exactly as it was.
//!
//! ## Quick Start
//!
//! ```no_run
//! use searchpdf::{ocr_file, OcrOptions};
//!
//! fn main() -> searchpdf::Result<()> {
//!     let report = ocr_file("scan.pdf", "searchable.pdf", OcrOptions::default())?;
//!     println!("{} pages in '{}'", report.page_count(), report.language);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Exact placement**: the text layer is scaled and rotated onto each
//!   page's crop box, including pages with a `/Rotate` entry
//! - **Text only**: everything the OCR engine draws besides text is dropped
//! - **Pluggable engines**: [`PageRenderer`] and [`OcrEngine`] traits, with
//!   `pdftoppm` and `tesseract` implementations (and PDFium behind the
//!   `pdfium` feature)
//! - **All or nothing**: a failing page aborts the run before anything is
//!   written

pub mod config;
pub mod content;
pub mod detect;
pub mod document;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod language;
pub mod overlay;
pub mod pipeline;

// Re-export commonly used types
pub use config::OcrConfig;
pub use content::{retain_text, ContentObject, ContentStream, ObjectKind};
pub use detect::{detect_format_from_bytes, detect_format_from_path, has_pdf_extension, is_pdf_bytes};
pub use document::{PageInfo, PdfDocument};
pub use engine::{
    ImageFormat, OcrEngine, PageRenderer, PdftoppmRenderer, RenderedImage, TesseractEngine,
};
pub use error::{Error, Result};
pub use geometry::{Matrix, OverlayTransform, Rect, Rotation};
pub use overlay::{composite, OcrPage};
pub use pipeline::{
    LanguageCheck, OcrOptions, OcrPipeline, PageEvent, PageReport, PageState, RunReport,
};

#[cfg(feature = "pdfium")]
pub use engine::PdfiumRenderer;

use std::path::Path;

/// Add a text layer to `input` with `pdftoppm` and `tesseract`, saving the
/// result to `output`.
///
/// # Example
///
/// ```no_run
/// use searchpdf::{ocr_file, OcrOptions};
///
/// let options = OcrOptions::new().with_language("deu+eng");
/// ocr_file("scan.pdf", "searchable.pdf", options).unwrap();
/// ```
pub fn ocr_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: OcrOptions,
) -> Result<RunReport> {
    OcrPipeline::new(PdftoppmRenderer::new(), TesseractEngine::new())
        .with_options(options)
        .run(input, output)
}

/// Compute the placement of an OCR page box over a page of `doc`.
pub fn page_transform(doc: &PdfDocument, page_index: usize, ocr_box: &Rect) -> Result<OverlayTransform> {
    let info = doc.page_info(page_index)?;
    OverlayTransform::compute(&info.crop_box, info.rotation, ocr_box)
}
