//! In-process page rendering with PDFium.

use std::path::Path;

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;

use super::{ImageFormat, PageRenderer, RenderedImage, SourceFile};
use crate::document::PdfDocument;
use crate::error::{Error, Result};

/// Renders pages with a dynamically loaded PDFium library.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
    format: ImageFormat,
}

impl PdfiumRenderer {
    /// Bind to PDFium in `./lib/` or, failing that, the system library.
    pub fn new() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./lib/"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Error::Render(format!("cannot load PDFium: {}", e)))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            format: ImageFormat::Png,
        })
    }

    /// Bind to the PDFium library at `path`.
    pub fn with_library<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bindings = Pdfium::bind_to_library(path.as_ref())
            .map_err(|e| Error::Render(format!("cannot load PDFium: {}", e)))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            format: ImageFormat::Png,
        })
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }
}

impl PageRenderer for PdfiumRenderer {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn render(&self, doc: &PdfDocument, page_index: usize, zoom: f32) -> Result<RenderedImage> {
        let index = u16::try_from(page_index)
            .map_err(|_| Error::PageOutOfRange(page_index, doc.page_count()))?;

        let source = SourceFile::for_document(doc)?;
        let document = self
            .pdfium
            .load_pdf_from_file(source.path(), None)
            .map_err(|e| Error::Render(format!("cannot open document: {}", e)))?;
        let page = document
            .pages()
            .get(index)
            .map_err(|e| Error::Render(format!("cannot acquire page {}: {}", page_index, e)))?;

        let bitmap = page
            .render_with_config(&PdfRenderConfig::new().scale_page_by_factor(zoom))
            .map_err(|e| Error::Render(format!("cannot draw page {}: {}", page_index, e)))?;

        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        let pixels = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())
            .ok_or_else(|| Error::Render("bitmap size does not match its pixel data".to_string()))?;

        RenderedImage::from_image(&DynamicImage::ImageRgba8(pixels), self.format)
    }
}
