//! The page loop: render, recognize, filter, place and stamp each page.

mod options;

pub use options::{LanguageCheck, OcrOptions, DEFAULT_ZOOM};

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::document::PdfDocument;
use crate::engine::{OcrEngine, PageRenderer};
use crate::error::{Error, Result};
use crate::geometry::{Matrix, OverlayTransform, Rotation};
use crate::language;
use crate::overlay::{composite, OcrPage};

/// Progress of a single page through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageState {
    Acquired,
    Rendered,
    Recognized,
    Filtered,
    Transformed,
    Composited,
    Released,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageState::Acquired => "acquired",
            PageState::Rendered => "rendered",
            PageState::Recognized => "recognized",
            PageState::Filtered => "filtered",
            PageState::Transformed => "transformed",
            PageState::Composited => "composited",
            PageState::Released => "released",
        };
        f.write_str(name)
    }
}

/// A page reached `state`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageEvent {
    /// Zero-based page index
    pub index: usize,
    /// Number of pages in the document
    pub total: usize,
    pub state: PageState,
}

/// What was done to one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub index: usize,
    pub rotation: Rotation,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Text objects in the stamped layer
    pub text_objects: usize,
    /// Placement of the layer on the page
    pub matrix: Matrix,
    /// Resource name of the layer form
    pub layer: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Language expression the OCR engine was run with
    pub language: String,
    pub pages: Vec<PageReport>,
}

impl RunReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total recognized text objects over all pages.
    pub fn text_objects(&self) -> usize {
        self.pages.iter().map(|p| p.text_objects).sum()
    }
}

/// Adds an invisible, searchable text layer to every page of a document.
///
/// Pages are processed strictly in order, one at a time. The first failure
/// aborts the run and nothing is written.
///
/// ```no_run
/// use searchpdf::{OcrOptions, OcrPipeline, PdftoppmRenderer, TesseractEngine};
///
/// let pipeline = OcrPipeline::new(PdftoppmRenderer::new(), TesseractEngine::new())
///     .with_options(OcrOptions::new().with_language("deu"));
/// let report = pipeline.run("scan.pdf", "searchable.pdf").unwrap();
/// println!("{} pages, language {}", report.page_count(), report.language);
/// ```
pub struct OcrPipeline<R, O> {
    renderer: R,
    engine: O,
    options: OcrOptions,
}

impl<R: PageRenderer, O: OcrEngine> OcrPipeline<R, O> {
    pub fn new(renderer: R, engine: O) -> Self {
        Self {
            renderer,
            engine,
            options: OcrOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OcrOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &OcrOptions {
        &self.options
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn engine(&self) -> &O {
        &self.engine
    }

    /// Process `input` and save the result to `output`.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<RunReport> {
        self.run_with_progress(input, output, |_| {})
    }

    /// Like [`run`](Self::run), reporting every page state change to `progress`.
    pub fn run_with_progress<P, Q, F>(&self, input: P, output: Q, progress: F) -> Result<RunReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        F: FnMut(&PageEvent),
    {
        self.options.validate()?;
        let input = input.as_ref();
        let output = output.as_ref();

        let mut doc = PdfDocument::open(input)?;
        log::info!("{}: {} pages", input.display(), doc.page_count());

        let report = self.process(&mut doc, progress)?;

        doc.touch_modified()?;
        if self.options.compress {
            doc.compress();
        }
        doc.save(output)?;
        log::info!(
            "saved {} ({} pages, {} text objects)",
            output.display(),
            report.page_count(),
            report.text_objects()
        );
        Ok(report)
    }

    /// Stamp text layers onto every page of `doc` in place.
    pub fn process<F>(&self, doc: &mut PdfDocument, mut progress: F) -> Result<RunReport>
    where
        F: FnMut(&PageEvent),
    {
        self.options.validate()?;
        let language = self.resolve_language(doc)?;

        let total = doc.page_count();
        let mut pages = Vec::with_capacity(total);
        for index in 0..total {
            let mut notify = |state: PageState| {
                log::debug!("page {}/{}: {}", index + 1, total, state);
                progress(&PageEvent {
                    index,
                    total,
                    state,
                });
            };
            pages.push(self.process_page(doc, index, &language, &mut notify)?);
        }

        Ok(RunReport { language, pages })
    }

    /// The language expression a run over `doc` would use.
    ///
    /// With [`LanguageCheck::Eager`] every code must be installed, as far as
    /// the engine can tell.
    pub fn resolve_language(&self, doc: &PdfDocument) -> Result<String> {
        let document_lang = doc.language();
        let language = language::resolve(
            self.options.language.as_deref(),
            document_lang.as_deref(),
            &self.options.default_language,
        )?;

        let installed = match self.engine.installed_languages() {
            Ok(installed) => installed,
            Err(e) => {
                log::warn!("cannot list installed OCR languages: {}", e);
                Vec::new()
            }
        };
        log::info!("available OCR languages: {}", installed.join(", "));

        if self.options.language_check == LanguageCheck::Eager && !installed.is_empty() {
            let missing = language::missing_languages(&language, &installed);
            if !missing.is_empty() {
                return Err(Error::LanguageUnavailable {
                    language: missing.join("+"),
                    installed,
                });
            }
        }

        log::info!("using OCR language: {}", language);
        Ok(language)
    }

    fn process_page(
        &self,
        doc: &mut PdfDocument,
        index: usize,
        language: &str,
        notify: &mut dyn FnMut(PageState),
    ) -> Result<PageReport> {
        let info = doc
            .page_info(index)
            .map_err(|e| e.on_page(index, PageState::Acquired))?;
        notify(PageState::Acquired);

        let image = self
            .renderer
            .render(doc, index, self.options.zoom)
            .map_err(|e| e.on_page(index, PageState::Acquired))?;
        notify(PageState::Rendered);

        let output = self
            .engine
            .recognize(&image, language)
            .map_err(|e| e.on_page(index, PageState::Rendered))?;
        let mut layer = OcrPage::from_bytes(&output).map_err(|e| e.on_page(index, PageState::Rendered))?;
        notify(PageState::Recognized);

        layer.strip_to_text();
        notify(PageState::Filtered);

        let transform = OverlayTransform::compute(&info.crop_box, info.rotation, &layer.page_box())
            .map_err(|e| e.on_page(index, PageState::Filtered))?;
        notify(PageState::Transformed);

        let name = composite(doc, index, &layer, &transform.matrix)
            .map_err(|e| e.on_page(index, PageState::Transformed))?;
        notify(PageState::Composited);

        let text_objects = layer.text_object_count();
        drop(layer);
        image
            .close()
            .map_err(|e| e.on_page(index, PageState::Composited))?;
        notify(PageState::Released);

        Ok(PageReport {
            index,
            rotation: transform.rotation,
            scale_x: transform.scale_x,
            scale_y: transform.scale_y,
            text_objects,
            matrix: transform.matrix,
            layer: name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_state_display() {
        assert_eq!(PageState::Acquired.to_string(), "acquired");
        assert_eq!(PageState::Composited.to_string(), "composited");
        assert_eq!(
            serde_json::to_string(&PageState::Released).unwrap(),
            "\"released\""
        );
    }

    #[test]
    fn test_run_report_totals() {
        let page = |index, text_objects| PageReport {
            index,
            rotation: Rotation::None,
            scale_x: 0.5,
            scale_y: 0.5,
            text_objects,
            matrix: Matrix::scaling(0.5, 0.5),
            layer: "OCRLayer0".to_string(),
        };
        let report = RunReport {
            language: "eng".to_string(),
            pages: vec![page(0, 3), page(1, 4)],
        };
        assert_eq!(report.page_count(), 2);
        assert_eq!(report.text_objects(), 7);
    }
}
